// Primitives for reading CSV response files.

use log::debug;
use snafu::prelude::*;

use survey_tabulation::{RawValue, ResponseRecord};

use crate::report::io_common::{assemble_record, raw_from_text};
use crate::report::{CsvLineParseSnafu, CsvOpenSnafu, ReportResult};

pub fn read_csv_responses(path: String) -> ReportResult<Vec<ResponseRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.clone())
        .context(CsvOpenSnafu { path: path.clone() })?;
    let mut records = rdr.into_records();

    // The first row carries the variable keys.
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu {})?
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };
    debug!("read_csv_responses: header: {:?}", header);

    let mut res: Vec<ResponseRecord> = Vec::new();
    for line_r in records {
        let line = line_r.context(CsvLineParseSnafu {})?;
        let cells: Vec<RawValue> = line.iter().map(raw_from_text).collect();
        res.push(assemble_record(&header, &cells));
    }
    debug!("read_csv_responses: {:?}: {:?} records", path, res.len());
    Ok(res)
}
