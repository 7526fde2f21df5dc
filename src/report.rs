use log::{debug, info, warn};

use survey_tabulation::*;

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub use crate::report::config_reader::*;

pub mod export;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No usable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Error writing CSV output"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error flushing CSV output"))]
    CsvFlush { source: std::io::Error },
    #[snafu(display("Error writing output file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Cannot understand date {value} (expected YYYY-MM-DD)"))]
    ParsingDate { value: String },
    #[snafu(display("Invalid dataset"))]
    BuildingDataset { source: DatasetError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

pub mod config_reader {
    use crate::report::{
        OpeningJsonSnafu, ParsingDateSnafu, ParsingJsonSnafu, ReportResult,
    };

    use survey_tabulation::{DateRange, RoundDate, Survey, Variable};

    use chrono::{Datelike, NaiveDate};
    use log::debug;
    use serde::{Deserialize, Serialize};
    use snafu::prelude::*;

    use std::collections::BTreeMap;
    use std::fs;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputSettings {
        #[serde(rename = "dashboardName")]
        pub dashboard_name: String,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
        pub organization: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct VariableDecl {
        pub key: String,
        pub label: String,
        #[serde(rename = "type")]
        pub vtype: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SurveyDecl {
        pub id: String,
        pub month: String,
        pub year: i32,
        pub variables: Vec<VariableDecl>,
    }

    impl SurveyDecl {
        pub fn to_survey(&self) -> Survey {
            Survey {
                id: self.id.clone(),
                month: self.month.clone(),
                year: self.year,
                variables: self
                    .variables
                    .iter()
                    .map(|v| Variable {
                        key: v.key.clone(),
                        label: v.label.clone(),
                    })
                    .collect(),
            }
        }
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FileSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "surveyId")]
        pub survey_id: String,
        #[serde(rename = "excelWorksheetName")]
        pub excel_worksheet_name: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SelectionDecl {
        pub kind: String,
        pub key: Option<String>,
        pub label: String,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ComparisonDecl {
        pub demographic: String,
        pub values: Option<Vec<String>>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct DateRangeDecl {
        pub start: Option<String>,
        pub end: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ReportConfig {
        #[serde(rename = "outputSettings")]
        pub output_settings: OutputSettings,
        pub surveys: Vec<SurveyDecl>,
        #[serde(rename = "responseFileSources")]
        pub response_file_sources: Vec<FileSource>,
        pub selection: SelectionDecl,
        pub filters: Option<BTreeMap<String, Vec<String>>>,
        #[serde(rename = "dateRange")]
        pub date_range: Option<DateRangeDecl>,
        pub comparison: Option<ComparisonDecl>,
        #[serde(rename = "weightColumn")]
        pub weight_column: Option<String>,
        #[serde(rename = "extraNonAnswers")]
        pub extra_non_answers: Option<Vec<String>>,
    }

    pub fn read_config(path: &str) -> ReportResult<ReportConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
            path: path.to_string(),
        })?;
        let config: ReportConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        debug!("read_config: {:?}", config);
        Ok(config)
    }

    // Only the year and month matter: rounds are first-of-month positions.
    pub fn parse_round_date(value: &str) -> ReportResult<RoundDate> {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .context(ParsingDateSnafu {
                value: value.to_string(),
            })?;
        Ok(RoundDate {
            year: date.year(),
            month: date.month(),
        })
    }

    pub fn validate_range(decl: &Option<DateRangeDecl>) -> ReportResult<DateRange> {
        let decl = match decl {
            Some(d) => d,
            None => return Ok(DateRange::default()),
        };
        let start = match &decl.start {
            Some(s) => Some(parse_round_date(s)?),
            None => None,
        };
        let end = match &decl.end {
            Some(s) => Some(parse_round_date(s)?),
            None => None,
        };
        Ok(DateRange { start, end })
    }
}

fn validate_options(config: &ReportConfig) -> TallyOptions {
    let mut options = TallyOptions::default();
    if let Some(weight_key) = &config.weight_column {
        options.weight_key = weight_key.clone();
    }
    if let Some(extra) = &config.extra_non_answers {
        options.extra_non_answers = extra.clone();
    }
    options
}

fn validate_filters(config: &ReportConfig, dataset: &Dataset) -> FilterSet {
    let mut filters = FilterSet::new();
    let decl = match &config.filters {
        Some(decl) => decl,
        None => return filters,
    };
    let universe: Vec<String> = dataset.demographics().iter().map(|d| d.key.clone()).collect();
    for (key, values) in decl.iter() {
        if !universe.contains(key) {
            // An unknown key is an always-false constraint downstream.
            warn!(
                "validate_filters: filter key {:?} is not an observed demographic",
                key
            );
        }
        filters.insert(key.clone(), values.iter().cloned().collect());
    }
    filters
}

fn validate_selection(
    decl: &SelectionDecl,
    catalog: &QuestionCatalog,
) -> ReportResult<QuestionSelection> {
    match decl.kind.as_str() {
        "historic" => {
            let question = catalog
                .historic
                .iter()
                .find(|q| q.label == decl.label)
                .or_else(|| {
                    catalog
                        .historic
                        .iter()
                        .find(|q| Some(&q.key) == decl.key.as_ref())
                });
            match question {
                Some(q) => Ok(QuestionSelection {
                    kind: QuestionKind::Historic,
                    key: q.key.clone(),
                    label: q.label.clone(),
                }),
                None => {
                    whatever!("{:?} is not a historic question of this dashboard", decl.label)
                }
            }
        }
        "unique" => {
            let question = catalog
                .unique
                .iter()
                .flat_map(|round| round.questions.iter())
                .find(|q| q.label == decl.label || Some(&q.key) == decl.key.as_ref());
            match question {
                Some(q) => Ok(QuestionSelection {
                    kind: QuestionKind::Unique,
                    key: q.key.clone(),
                    label: q.label.clone(),
                }),
                None => {
                    whatever!("{:?} is not a unique question of this dashboard", decl.label)
                }
            }
        }
        x => whatever!("Cannot use selection kind {:?} (expected historic or unique)", x),
    }
}

fn read_response_data(root_path: &str, cfs: &FileSource) -> ReportResult<Vec<ResponseRecord>> {
    let p: PathBuf = [root_path.to_string(), cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read response file {:?}", p2);
    match cfs.provider.as_str() {
        "json" => io_json::read_json_responses(p2),
        "csv" => io_csv::read_csv_responses(p2),
        "xlsx" => io_xlsx::read_excel_responses(p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

/// The records the side-by-side comparison runs over: the most recent round
/// in range where the selected question occurs, unfiltered (the comparison
/// partitions by the demographic itself).
fn comparison_scope(
    dataset: &Dataset,
    catalog: &QuestionCatalog,
    selection: &QuestionSelection,
    range: &DateRange,
) -> (Vec<ResponseRecord>, String) {
    let rounds = filter_rounds(&dataset.rounds_chronological(), range);
    match selection.kind {
        QuestionKind::Historic => {
            let occurrences = catalog
                .historic
                .iter()
                .find(|q| q.label == selection.label)
                .map(|q| q.occurrences.clone())
                .unwrap_or_default();
            let last = rounds
                .iter()
                .rev()
                .find_map(|s| {
                    occurrences
                        .iter()
                        .find(|(survey_id, _)| *survey_id == s.id)
                        .map(|(survey_id, key)| (survey_id.clone(), key.clone()))
                });
            match last {
                Some((survey_id, key)) => (dataset.records(&survey_id).to_vec(), key),
                None => (Vec::new(), selection.key.clone()),
            }
        }
        QuestionKind::Unique => {
            let owner = rounds
                .iter()
                .find(|s| s.variables.iter().any(|v| v.key == selection.key));
            match owner {
                Some(s) => (dataset.records(&s.id).to_vec(), selection.key.clone()),
                None => (Vec::new(), selection.key.clone()),
            }
        }
    }
}

fn kind_str(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::Historic => "historic",
        QuestionKind::Unique => "unique",
    }
}

fn result_stats_to_json(stats: &QuestionStats) -> JSValue {
    match stats {
        QuestionStats::Distribution(dist) => {
            let entries: Vec<JSValue> = dist
                .entries
                .iter()
                .map(|e| {
                    json!({
                        "response": e.response,
                        "count": e.count,
                        "percentage": e.percentage,
                    })
                })
                .collect();
            json!({"kind": "unique", "distribution": entries})
        }
        QuestionStats::TimeSeries(ts) => {
            let series: Vec<JSValue> = ts
                .series
                .iter()
                .map(|s| {
                    let data: Vec<JSValue> = s
                        .data
                        .iter()
                        .map(|p| json!({"x": p.x, "y": p.y, "exactValue": p.exact_value}))
                        .collect();
                    json!({"id": s.id, "color": s.color, "data": data})
                })
                .collect();
            json!({
                "kind": "historic",
                "rounds": ts.round_labels,
                "roundSamples": ts.round_weights,
                "series": series,
            })
        }
    }
}

fn comparison_to_json(table: &ComparisonTable) -> JSValue {
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|row| json!({"response": row.response, "cells": row.cells}))
        .collect();
    json!({
        "demographic": table.demographic_key,
        "columns": table.columns,
        "rows": rows,
    })
}

fn build_summary_js(
    config: &ReportConfig,
    selection: &QuestionSelection,
    report: &SelectionReport,
    comparison: Option<&ComparisonTable>,
) -> JSValue {
    let mut js = json!({
        "config": {
            "dashboard": config.output_settings.dashboard_name,
            "selection": {
                "kind": kind_str(selection.kind),
                "key": selection.key,
                "label": selection.label,
            },
        },
        "marginOfError": report.margin_of_error,
        "effectiveSample": report.effective_sample,
        "highMargin": report.high_margin,
        "results": result_stats_to_json(&report.stats),
    });
    if let Some(table) = comparison {
        js["comparison"] = comparison_to_json(table);
    }
    js
}

pub fn run_report(args: &Args) -> ReportResult<()> {
    let config_p = Path::new(args.config.as_str());
    let config = read_config(args.config.as_str())?;
    let config2 = config.clone();

    let root_p = config_p.parent().context(MissingParentDirSnafu {
        path: args.config.clone(),
    })?;
    let root_path = root_p.as_os_str().to_str().unwrap_or(".").to_string();

    let options = validate_options(&config);
    let mut builder = DatasetBuilder::new(&options);
    for decl in config.surveys.iter() {
        builder
            .survey(&decl.to_survey())
            .context(BuildingDatasetSnafu {})?;
    }
    for cfs in config.response_file_sources.iter() {
        let records = read_response_data(&root_path, cfs)?;
        info!(
            "Read {:?} records for survey {:?} from {:?}",
            records.len(),
            cfs.survey_id,
            cfs.file_path
        );
        for record in records {
            builder
                .add_record(&cfs.survey_id, record)
                .context(BuildingDatasetSnafu {})?;
        }
    }
    let dataset = builder.build();

    for demographic in dataset.demographics().iter() {
        debug!(
            "Demographic {:?} ({:?}): {:?}",
            demographic.key, demographic.label, demographic.values
        );
    }

    let catalog = classify_questions(dataset.surveys());
    info!(
        "Question catalog: {:?} historic, {:?} unique",
        catalog.historic.len(),
        catalog.unique.iter().map(|r| r.questions.len()).sum::<usize>()
    );

    let selection = validate_selection(&config.selection, &catalog)?;
    let filters = validate_filters(&config2, &dataset);
    let range = validate_range(&config.date_range)?;

    let report = run_question_stats(&dataset, &selection, &filters, &range);
    match &report.stats {
        QuestionStats::TimeSeries(ts) => {
            for (idx, label) in ts.round_labels.iter().enumerate() {
                info!(
                    "round {}: {} answers, n={}",
                    label,
                    ts.series.iter().filter(|s| s.data[idx].y > 0.0).count(),
                    ts.round_weights[idx]
                );
            }
        }
        QuestionStats::Distribution(dist) => {
            info!(
                "distribution: {} answers, n={}",
                dist.entries.len(),
                dist.total_weight
            );
        }
    }
    if report.high_margin {
        warn!(
            "Margin of error {}pp is above the {}pp advisory threshold for the filtered sample",
            report.margin_of_error, HIGH_MARGIN_THRESHOLD
        );
    }

    let comparison = match &config.comparison {
        Some(decl) => {
            let (records, question_key) =
                comparison_scope(&dataset, &catalog, &selection, &range);
            let values = decl.values.clone().unwrap_or_default();
            Some(assemble_comparison(
                &records,
                &decl.demographic,
                &values,
                &question_key,
                dataset.options(),
            ))
        }
        None => None,
    };

    if let Some(export_path) = &args.export_csv {
        export::write_report_csv(export_path, &report.stats)?;
        if let Some(table) = &comparison {
            export::write_comparison_csv(&export::comparison_path(export_path), table)?;
        }
    }

    // Assemble the final json
    let result_js = build_summary_js(&config2, &selection, &report, comparison.as_ref());
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match &args.out {
        Some(out_path) if out_path != "stdout" => {
            fs::write(out_path, &pretty_js_stats).context(WritingOutputSnafu {
                path: out_path.clone(),
            })?;
        }
        _ => {
            println!("stats:{}", pretty_js_stats);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = io_json::read_summary(summary_p.clone())?;
        debug!("reference summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
