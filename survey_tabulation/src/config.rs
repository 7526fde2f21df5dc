// ********* Input data structures ***********

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::Display;

/// A raw cell value as delivered by the fetch collaborator.
///
/// Records are flat mappings from variable key to one of these. The core
/// never mutates them, it only reads and filters.
#[derive(PartialEq, Debug, Clone)]
pub enum RawValue {
    Text(String),
    Number(f64),
    /// A missing or null cell. Distinct from an empty string, although both
    /// are excluded from tabulation.
    Empty,
}

/// A flat respondent record: variable key -> raw value.
///
/// Demographic keys use the `PF<digits>` convention, question keys use
/// `P<digits>`. A weight field may be present under the key configured in
/// [TallyOptions].
pub type ResponseRecord = HashMap<String, RawValue>;

/// A variable declared by one survey round.
///
/// The label is the identity that makes a question "historic": several
/// rounds declaring the same label are the same question over time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Variable {
    pub key: String,
    pub label: String,
}

/// One survey round: reference data, immutable once fetched.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Survey {
    pub id: String,
    /// Month name in the survey locale (pt-BR), e.g. "Janeiro".
    pub month: String,
    pub year: i32,
    pub variables: Vec<Variable>,
}

/// A first-of-month calendar position for a survey round.
///
/// Unknown month names map to ordinal 0 and therefore sort before any real
/// month of the same year.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash)]
pub struct RoundDate {
    pub year: i32,
    pub month: u32,
}

/// An inclusive calendar window over survey rounds. A missing bound is
/// unbounded on that side.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<RoundDate>,
    pub end: Option<RoundDate>,
}

impl DateRange {
    pub fn contains(&self, date: RoundDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// Demographic key -> allowed values. An absent key or an empty set imposes
/// no constraint for that key.
///
/// Ordered containers keep the filtering and any derived output
/// deterministic across runs.
pub type FilterSet = BTreeMap<String, BTreeSet<String>>;

/// A demographic axis usable for filtering or comparison. Derived data,
/// recomputed whenever the survey/response universe changes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DemographicDescriptor {
    pub key: String,
    pub label: String,
    /// Distinct observed values, lexicographically sorted for stable
    /// filter ordering.
    pub values: Vec<String>,
}

/// Whether a question spans several rounds or belongs to exactly one.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuestionKind {
    Historic,
    Unique,
}

/// The question the consumer selected for aggregation.
///
/// This is a tagged structure on purpose: the selection travels as
/// `{kind, key, label}` and never as a delimited string to be re-parsed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionSelection {
    pub kind: QuestionKind,
    pub key: String,
    pub label: String,
}

/// Options that govern a tabulation run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyOptions {
    /// Record field holding the sampling weight.
    pub weight_key: String,
    /// Extra non-answer sentinels on top of the built-in ones, matched
    /// case-insensitively.
    pub extra_non_answers: Vec<String>,
}

impl Default for TallyOptions {
    fn default() -> TallyOptions {
        TallyOptions {
            weight_key: "peso".to_string(),
            extra_non_answers: Vec::new(),
        }
    }
}

// ******** Output data structures *********

/// One answer bucket of a weighted distribution.
#[derive(PartialEq, Debug, Clone)]
pub struct DistributionEntry {
    pub response: String,
    /// Weighted respondent count for this answer (unrounded).
    pub count: f64,
    /// Weighted share of the valid total, rounded to one decimal.
    pub percentage: f64,
}

/// The flat aggregation result for a unique question.
///
/// Entries appear in first-seen order over the record stream. An empty
/// distribution (zero valid total weight) is a well-defined result, not an
/// error.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Distribution {
    pub entries: Vec<DistributionEntry>,
    /// Sum of weights of the records that carried a valid answer.
    pub total_weight: f64,
}

/// One data point of an answer series, pinned to a round label.
#[derive(PartialEq, Debug, Clone)]
pub struct SeriesPoint {
    pub x: String,
    /// Percentage rounded to one decimal; 0 when the answer was absent from
    /// the round.
    pub y: f64,
    pub exact_value: f64,
}

/// One line of a historic chart: a single answer across every round.
#[derive(PartialEq, Debug, Clone)]
pub struct AnswerSeries {
    pub id: String,
    /// Stable palette color derived from the answer key, never from its
    /// position.
    pub color: String,
    pub data: Vec<SeriesPoint>,
}

/// The aggregation result for a historic question. Series are dense: every
/// series carries one point per round.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct TimeSeries {
    pub round_labels: Vec<String>,
    /// Valid weighted sample per round, aligned with `round_labels`.
    pub round_weights: Vec<f64>,
    pub series: Vec<AnswerSeries>,
}

/// One row of a side-by-side demographic comparison.
#[derive(PartialEq, Debug, Clone)]
pub struct ComparisonRow {
    pub response: String,
    /// One percentage per compared value, aligned with the table columns.
    pub cells: Vec<f64>,
}

/// A wide table comparing the same question across demographic subgroups.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ComparisonTable {
    pub demographic_key: String,
    pub columns: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

/// A question appearing in two or more rounds.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct HistoricQuestion {
    pub label: String,
    /// Canonical key: the key of the first occurrence, with rounds walked in
    /// chronological order.
    pub key: String,
    /// `(survey id, key)` pairs, in chronological round order.
    pub occurrences: Vec<(String, String)>,
}

/// The unique questions owned by a single round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundQuestions {
    pub survey_id: String,
    pub questions: Vec<Variable>,
}

/// The partition of the question universe into historic and unique groups.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct QuestionCatalog {
    pub historic: Vec<HistoricQuestion>,
    pub unique: Vec<RoundQuestions>,
}

/// Either shape of aggregation result, depending on the selected question.
#[derive(PartialEq, Debug, Clone)]
pub enum QuestionStats {
    TimeSeries(TimeSeries),
    Distribution(Distribution),
}

/// The complete outcome of one aggregation pass, recomputed from scratch on
/// every input change.
#[derive(PartialEq, Debug, Clone)]
pub struct SelectionReport {
    pub stats: QuestionStats,
    /// Worst-case 95%-confidence margin for the filtered sample, in
    /// percentage points. For a time series this is the worst round.
    pub margin_of_error: f64,
    /// Valid weighted sample backing the margin. For a time series this is
    /// the thinnest round.
    pub effective_sample: f64,
    /// Advisory flag: the margin crossed the warning threshold.
    pub high_margin: bool,
}

/// The selection/filter state owned by the consumer.
///
/// Selecting a question clears the filter set. Demographic filters would
/// remain semantically valid across questions; clearing them is the
/// established product behavior (fresh view per question) and is kept here
/// as a single explicit transition.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SelectionState {
    pub selection: Option<QuestionSelection>,
    pub filters: FilterSet,
}

impl SelectionState {
    pub fn select_question(&mut self, selection: QuestionSelection) {
        self.selection = Some(selection);
        self.filters.clear();
    }

    pub fn set_filter(&mut self, key: &str, values: &[String]) {
        self.filters
            .insert(key.to_string(), values.iter().cloned().collect());
    }

    pub fn clear_filter(&mut self, key: &str) {
        self.filters.remove(key);
    }
}

/// Errors raised while assembling a dataset. The aggregation pipeline itself
/// is total and never raises for data-shape anomalies.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DatasetError {
    DuplicateSurvey { id: String },
    UnknownSurvey { id: String },
}

impl Error for DatasetError {}

impl Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::DuplicateSurvey { id } => {
                write!(f, "survey declared twice: {}", id)
            }
            DatasetError::UnknownSurvey { id } => {
                write!(f, "records reference an undeclared survey: {}", id)
            }
        }
    }
}
