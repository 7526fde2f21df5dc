// Primitives for reading Excel response files.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use log::debug;
use snafu::prelude::*;

use survey_tabulation::{RawValue, ResponseRecord};

use crate::report::io_common::assemble_record;
use crate::report::{EmptyExcelSnafu, FileSource, OpeningExcelSnafu, ReportResult};

fn raw_from_cell(cell: &DataType) -> RawValue {
    match cell {
        DataType::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                RawValue::Empty
            } else {
                RawValue::Text(trimmed.to_string())
            }
        }
        DataType::Float(f) => RawValue::Number(*f),
        DataType::Int(i) => RawValue::Number(*i as f64),
        DataType::Bool(b) => RawValue::Text(b.to_string()),
        _ => RawValue::Empty,
    }
}

pub fn read_excel_responses(path: String, cfs: &FileSource) -> ReportResult<Vec<ResponseRecord>> {
    let wrange = get_range(&path, cfs)?;

    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row
            .iter()
            .map(|cell| match raw_from_cell(cell) {
                RawValue::Text(s) => s,
                RawValue::Number(n) => format!("{}", n),
                RawValue::Empty => String::new(),
            })
            .collect(),
        None => return Ok(Vec::new()),
    };
    debug!("read_excel_responses: header: {:?}", header);

    let mut res: Vec<ResponseRecord> = Vec::new();
    for row in rows {
        let cells: Vec<RawValue> = row.iter().map(raw_from_cell).collect();
        res.push(assemble_record(&header, &cells));
    }
    debug!("read_excel_responses: {:?}: {:?} records", path, res.len());
    Ok(res)
}

fn get_range(path: &String, cfs: &FileSource) -> ReportResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        // No name: take the first worksheet of the workbook.
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [(_, wrange), ..] => Ok(wrange.clone()),
            [] => EmptyExcelSnafu { path: path.clone() }.fail(),
        }
    }
}
