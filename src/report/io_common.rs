use survey_tabulation::{RawValue, ResponseRecord};

/// A raw cell from a text source. Cells that parse as numbers are numbers,
/// empty cells are missing.
pub fn raw_from_text(cell: &str) -> RawValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return RawValue::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) => RawValue::Number(n),
        Err(_) => RawValue::Text(trimmed.to_string()),
    }
}

/// Zips a header row with one row of cells into a flat record. Extra cells
/// without a header are dropped, missing trailing cells are missing values.
pub fn assemble_record(header: &[String], cells: &[RawValue]) -> ResponseRecord {
    header
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let value = cells.get(idx).cloned().unwrap_or(RawValue::Empty);
            (key.clone(), value)
        })
        .collect()
}
