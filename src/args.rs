use clap::Parser;

/// This is a weighted survey tabulation and export program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file describing the dashboard: survey rounds, response
    /// file sources, the selected question, filters and date range. For more
    /// information about the file format, read the documentation.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing an expected summary in JSON format.
    /// If provided, pollboard will check that the tabulated output matches the
    /// reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the
    /// aggregation will be written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the aggregation result will also be
    /// written as CSV to the given location: one header row, then one row per
    /// date (time series) or per answer (distribution).
    #[clap(long, value_parser)]
    pub export_csv: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
