// Primitives for reading JSON response files and reference summaries.

use std::fs;

use log::debug;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use survey_tabulation::{RawValue, ResponseRecord};

use crate::report::{OpeningJsonSnafu, ParsingJsonSnafu, ReportResult};

fn raw_from_json(value: &JSValue) -> RawValue {
    match value {
        JSValue::Null => RawValue::Empty,
        JSValue::String(s) => RawValue::Text(s.clone()),
        JSValue::Number(n) => match n.as_f64() {
            Some(f) => RawValue::Number(f),
            None => RawValue::Text(n.to_string()),
        },
        JSValue::Bool(b) => RawValue::Text(b.to_string()),
        other => RawValue::Text(other.to_string()),
    }
}

/// Reads a flat JSON array of respondent objects.
pub fn read_json_responses(path: String) -> ReportResult<Vec<ResponseRecord>> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let rows = match js.as_array() {
        Some(rows) => rows,
        None => whatever!("Expected a JSON array of records at the top level"),
    };
    let mut res: Vec<ResponseRecord> = Vec::new();
    for row in rows.iter() {
        let obj = match row.as_object() {
            Some(obj) => obj,
            None => whatever!("Expected a flat JSON object, got {:?}", row),
        };
        let record: ResponseRecord = obj
            .iter()
            .map(|(key, value)| (key.clone(), raw_from_json(value)))
            .collect();
        res.push(record);
    }
    debug!("read_json_responses: {:?} records", res.len());
    Ok(res)
}

/// Reads a reference summary for comparison against the computed one.
pub fn read_summary(path: String) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
