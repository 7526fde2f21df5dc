// CSV export of aggregation results.

use std::io::Write;
use std::path::Path;

use log::info;
use snafu::prelude::*;

use survey_tabulation::{ComparisonTable, Distribution, QuestionStats, TimeSeries};

use crate::report::{CsvFlushSnafu, CsvOpenSnafu, CsvWriteSnafu, ReportResult};

/// The sibling path for the comparison table: `results.csv` becomes
/// `results_comparison.csv`.
pub fn comparison_path(path: &str) -> String {
    let p = Path::new(path);
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("results");
    let with_suffix = match p.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_comparison.{}", stem, ext),
        None => format!("{}_comparison", stem),
    };
    p.with_file_name(with_suffix).display().to_string()
}

fn fmt(value: f64) -> String {
    format!("{}", value)
}

/// One header row, then one row per answer.
pub fn write_distribution<W: Write>(
    writer: &mut csv::Writer<W>,
    dist: &Distribution,
) -> ReportResult<()> {
    writer
        .write_record(["response", "count", "percentage"])
        .context(CsvWriteSnafu {})?;
    for entry in dist.entries.iter() {
        writer
            .write_record([
                entry.response.as_str(),
                fmt(entry.count).as_str(),
                fmt(entry.percentage).as_str(),
            ])
            .context(CsvWriteSnafu {})?;
    }
    Ok(())
}

/// One header row naming the answers, then one row per round date.
pub fn write_time_series<W: Write>(
    writer: &mut csv::Writer<W>,
    ts: &TimeSeries,
) -> ReportResult<()> {
    let mut header: Vec<String> = vec!["date".to_string()];
    header.extend(ts.series.iter().map(|s| s.id.clone()));
    writer.write_record(&header).context(CsvWriteSnafu {})?;

    for (idx, label) in ts.round_labels.iter().enumerate() {
        let mut row: Vec<String> = vec![label.clone()];
        row.extend(ts.series.iter().map(|s| fmt(s.data[idx].y)));
        writer.write_record(&row).context(CsvWriteSnafu {})?;
    }
    Ok(())
}

/// One header row naming the compared subgroups, then one row per answer.
pub fn write_comparison<W: Write>(
    writer: &mut csv::Writer<W>,
    table: &ComparisonTable,
) -> ReportResult<()> {
    let mut header: Vec<String> = vec!["response".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header).context(CsvWriteSnafu {})?;

    for row in table.rows.iter() {
        let mut cells: Vec<String> = vec![row.response.clone()];
        cells.extend(row.cells.iter().map(|c| fmt(*c)));
        writer.write_record(&cells).context(CsvWriteSnafu {})?;
    }
    Ok(())
}

pub fn write_report_csv(path: &str, stats: &QuestionStats) -> ReportResult<()> {
    let mut writer = csv::Writer::from_path(path).context(CsvOpenSnafu {
        path: path.to_string(),
    })?;
    match stats {
        QuestionStats::Distribution(dist) => write_distribution(&mut writer, dist)?,
        QuestionStats::TimeSeries(ts) => write_time_series(&mut writer, ts)?,
    }
    writer.flush().context(CsvFlushSnafu {})?;
    info!("Exported the aggregation result to {:?}", path);
    Ok(())
}

pub fn write_comparison_csv(path: &str, table: &ComparisonTable) -> ReportResult<()> {
    let mut writer = csv::Writer::from_path(path).context(CsvOpenSnafu {
        path: path.to_string(),
    })?;
    write_comparison(&mut writer, table)?;
    writer.flush().context(CsvFlushSnafu {})?;
    info!("Exported the comparison table to {:?}", path);
    Ok(())
}
