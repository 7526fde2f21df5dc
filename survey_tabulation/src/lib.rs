mod config;
pub mod builder;
pub mod manual;
pub mod quick_start;

use log::{debug, info};

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    ops::{Add, AddAssign},
};

pub use crate::builder::{Dataset, DatasetBuilder};
pub use crate::config::*;

// **** Private structures ****

/// A weighted respondent count. Weights are sampling weights, so fractional
/// values are the norm rather than the exception.
#[derive(PartialEq, PartialOrd, Debug, Clone, Copy)]
struct Weight(f64);

impl Weight {
    const ZERO: Weight = Weight(0.0);
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Weight) {
        self.0 += rhs.0;
    }
}

impl Add for Weight {
    type Output = Weight;
    fn add(self: Weight, rhs: Weight) -> Weight {
        Weight(self.0 + rhs.0)
    }
}

// Month-name ordinals for the supported locale (pt-BR). The accent-free
// spellings show up in hand-edited spreadsheets and are accepted too.
const MONTH_ORDINALS: [(&str, u32); 13] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("marco", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

// Values that never count as an answer, matched case-insensitively after
// trimming. They are excluded from numerators and denominators alike.
const NON_ANSWERS: [&str; 5] = [
    "#null!",
    "não sabe",
    "nao sabe",
    "não respondeu",
    "nao respondeu",
];

/// Margin of error (in percentage points) above which the filtered sample is
/// considered too thin. Advisory only: consumers surface a warning, nothing
/// is gated.
pub const HIGH_MARGIN_THRESHOLD: f64 = 10.0;

// Fixed palette for answer series. Colors are assigned by hashing the answer
// key so that repeated renders and reorderings never shuffle them.
const SERIES_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// The ordinal of a month name, 0 when the name is not recognized (which
/// sorts such rounds before any real month of the same year).
pub fn month_ordinal(name: &str) -> u32 {
    let lowered = name.trim().to_lowercase();
    MONTH_ORDINALS
        .iter()
        .find(|(month, _)| *month == lowered)
        .map(|(_, ordinal)| *ordinal)
        .unwrap_or(0)
}

/// The first-of-month date of a survey round.
pub fn round_date(survey: &Survey) -> RoundDate {
    RoundDate {
        year: survey.year,
        month: month_ordinal(&survey.month),
    }
}

/// Whether a variable key names a question (`P` followed by digits).
pub fn is_question_key(key: &str) -> bool {
    match key.strip_prefix('P') {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Whether a variable key names a demographic (`PF` followed by digits).
pub fn is_demographic_key(key: &str) -> bool {
    match key.strip_prefix("PF") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Canonicalizes a raw cell into a stable answer key.
///
/// Returns `None` for anything that must not count as an answer: empty
/// cells, empty strings and the non-answer sentinels. Idempotent on its own
/// output.
pub fn normalize_answer(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Empty => None,
        RawValue::Number(n) => Some(format_number(*n)),
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            let lowered = trimmed.to_lowercase();
            if NON_ANSWERS.iter().any(|sentinel| *sentinel == lowered) {
                return None;
            }
            Some(trimmed.to_string())
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn is_extra_non_answer(answer: &str, options: &TallyOptions) -> bool {
    let lowered = answer.to_lowercase();
    options
        .extra_non_answers
        .iter()
        .any(|sentinel| sentinel.to_lowercase() == lowered)
}

/// The sampling weight of one record.
///
/// An absent, non-numeric or non-positive weight clamps to 1: a zero weight
/// would silently erase a respondent from the denominators while the record
/// still matches filters. Accepts `,` as the decimal separator.
pub fn record_weight(record: &ResponseRecord, options: &TallyOptions) -> f64 {
    let raw = match record.get(&options.weight_key) {
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Text(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .unwrap_or(1.0),
        _ => 1.0,
    };
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        1.0
    }
}

/// Keeps the records matching every non-empty allow-list of the filter set.
///
/// A key with an empty allow-list imposes no constraint. A key absent from
/// the records is an always-false constraint: the result is empty rather
/// than an error.
pub fn apply_demographic_filters(
    records: &[ResponseRecord],
    filters: &FilterSet,
) -> Vec<ResponseRecord> {
    records
        .iter()
        .filter(|record| passes_filters(record, filters))
        .cloned()
        .collect()
}

fn passes_filters(record: &ResponseRecord, filters: &FilterSet) -> bool {
    filters.iter().all(|(key, allowed)| {
        if allowed.is_empty() {
            return true;
        }
        match record.get(key).and_then(normalize_answer) {
            Some(value) => allowed.contains(&value),
            None => false,
        }
    })
}

/// Keeps the rounds whose first-of-month date falls inside the window,
/// preserving the input order.
pub fn filter_rounds(surveys: &[Survey], range: &DateRange) -> Vec<Survey> {
    surveys
        .iter()
        .filter(|survey| range.contains(round_date(survey)))
        .cloned()
        .collect()
}

/// Partitions the question universe into historic and unique groups.
///
/// Rounds are walked in chronological order, so the canonical key of a
/// historic label (its first occurrence) is deterministic: the earliest
/// round wins, survey id breaks exact month/year ties.
pub fn classify_questions(surveys: &[Survey]) -> QuestionCatalog {
    let mut rounds = surveys.to_vec();
    rounds.sort_by_key(|s| (round_date(s), s.id.clone()));

    let mut label_order: Vec<String> = Vec::new();
    let mut occurrences: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for survey in rounds.iter() {
        for var in survey.variables.iter() {
            if !is_question_key(&var.key) {
                continue;
            }
            let occ = occurrences.entry(var.label.clone()).or_default();
            if occ.is_empty() {
                label_order.push(var.label.clone());
            }
            occ.push((survey.id.clone(), var.key.clone()));
        }
    }
    debug!(
        "classify_questions: {:?} labels over {:?} rounds",
        label_order.len(),
        rounds.len()
    );

    let mut historic: Vec<HistoricQuestion> = Vec::new();
    let mut unique_by_round: HashMap<String, Vec<Variable>> = HashMap::new();
    for label in label_order.iter() {
        let occ = &occurrences[label];
        if occ.len() >= 2 {
            historic.push(HistoricQuestion {
                label: label.clone(),
                key: occ[0].1.clone(),
                occurrences: occ.clone(),
            });
        } else {
            let (survey_id, key) = occ[0].clone();
            unique_by_round.entry(survey_id).or_default().push(Variable {
                key,
                label: label.clone(),
            });
        }
    }

    let unique: Vec<RoundQuestions> = rounds
        .iter()
        .filter_map(|survey| {
            unique_by_round.get(&survey.id).map(|questions| RoundQuestions {
                survey_id: survey.id.clone(),
                questions: questions.clone(),
            })
        })
        .collect();

    QuestionCatalog { historic, unique }
}

/// The weighted distribution of answers to one question.
///
/// Records whose answer normalizes to `None` are excluded from both the
/// numerator and the denominator. A zero valid total yields an empty
/// distribution, never a division error. Entries keep first-seen order.
pub fn tabulate(
    records: &[ResponseRecord],
    question_key: &str,
    options: &TallyOptions,
) -> Distribution {
    let mut answer_order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, Weight> = HashMap::new();
    let mut total = Weight::ZERO;

    for record in records.iter() {
        let answer = match record.get(question_key).and_then(normalize_answer) {
            Some(a) => a,
            None => continue,
        };
        if is_extra_non_answer(&answer, options) {
            continue;
        }
        let weight = Weight(record_weight(record, options));
        if !sums.contains_key(&answer) {
            answer_order.push(answer.clone());
        }
        let sum = sums.entry(answer).or_insert(Weight::ZERO);
        *sum += weight;
        total += weight;
    }

    if total.0 <= 0.0 {
        return Distribution::default();
    }

    let entries: Vec<DistributionEntry> = answer_order
        .iter()
        .map(|answer| {
            let count = sums[answer].0;
            DistributionEntry {
                response: answer.clone(),
                count,
                percentage: permille_round(count / total.0),
            }
        })
        .collect();

    Distribution {
        entries,
        total_weight: total.0,
    }
}

// The display rounding law: round-half-up on the per-mille value, then
// scale down to one decimal place.
fn permille_round(share: f64) -> f64 {
    (share * 1000.0).round() / 10.0
}

/// The palette color for an answer series. Derived from a hash of the
/// answer key so the assignment is stable across runs and render passes.
pub fn series_color(answer: &str) -> String {
    let digest = sha256::digest(answer);
    let idx = u32::from_str_radix(&digest[..8], 16).unwrap_or(0) as usize % SERIES_PALETTE.len();
    SERIES_PALETTE[idx].to_string()
}

/// The chart label of one round.
pub fn round_label(survey: &Survey) -> String {
    format!("{}/{}", survey.month, survey.year)
}

/// Runs the filter pipeline and the tabulator once per round of a historic
/// question and transposes the results into one series per answer.
///
/// Series are dense: an answer missing from a round contributes a zero
/// point, so every series spans every round.
pub fn assemble_time_series(
    dataset: &Dataset,
    question: &HistoricQuestion,
    filters: &FilterSet,
    range: &DateRange,
) -> TimeSeries {
    let mut keys_by_round: HashMap<String, String> = HashMap::new();
    for (survey_id, key) in question.occurrences.iter() {
        keys_by_round
            .entry(survey_id.clone())
            .or_insert_with(|| key.clone());
    }

    let rounds: Vec<Survey> = dataset
        .rounds_chronological()
        .into_iter()
        .filter(|s| range.contains(round_date(s)))
        .filter(|s| keys_by_round.contains_key(&s.id))
        .collect();
    debug!(
        "assemble_time_series: label {:?}: {:?} rounds in range",
        question.label,
        rounds.len()
    );

    let mut round_labels: Vec<String> = Vec::new();
    let mut round_weights: Vec<f64> = Vec::new();
    let mut distributions: Vec<Distribution> = Vec::new();
    for survey in rounds.iter() {
        let key = &keys_by_round[&survey.id];
        let filtered = apply_demographic_filters(dataset.records(&survey.id), filters);
        let dist = tabulate(&filtered, key, dataset.options());
        round_labels.push(round_label(survey));
        round_weights.push(dist.total_weight);
        distributions.push(dist);
    }

    // Answers in first-seen order across the chronological rounds.
    let mut answer_order: Vec<String> = Vec::new();
    for dist in distributions.iter() {
        for entry in dist.entries.iter() {
            if !answer_order.contains(&entry.response) {
                answer_order.push(entry.response.clone());
            }
        }
    }

    let series: Vec<AnswerSeries> = answer_order
        .iter()
        .map(|answer| {
            let data: Vec<SeriesPoint> = distributions
                .iter()
                .enumerate()
                .map(|(idx, dist)| {
                    let found = dist.entries.iter().find(|e| e.response == *answer);
                    let (y, exact) = match found {
                        Some(entry) => {
                            (entry.percentage, entry.count / dist.total_weight * 100.0)
                        }
                        None => (0.0, 0.0),
                    };
                    SeriesPoint {
                        x: round_labels[idx].clone(),
                        y,
                        exact_value: exact,
                    }
                })
                .collect();
            AnswerSeries {
                id: answer.clone(),
                color: series_color(answer),
                data,
            }
        })
        .collect();

    TimeSeries {
        round_labels,
        round_weights,
        series,
    }
}

/// Conservative 95%-confidence margin for a proportion estimate, in
/// percentage points, under the worst-case variance assumption (p = 0.5).
/// Two decimals; 0 when the sample is empty.
pub fn margin_of_error(effective_sample: f64) -> f64 {
    if effective_sample <= 0.0 {
        return 0.0;
    }
    let raw = 1.96 * (0.25 / effective_sample).sqrt() * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Tabulates one question per demographic subgroup and merges the results
/// into a wide table, one column per compared value.
///
/// When no values are selected, the first two observed values of the
/// demographic are compared. Rows are sorted by the first column's
/// percentage, descending; ties keep tabulation order (the sort is stable).
pub fn assemble_comparison(
    records: &[ResponseRecord],
    demographic_key: &str,
    values: &[String],
    question_key: &str,
    options: &TallyOptions,
) -> ComparisonTable {
    let columns: Vec<String> = if values.is_empty() {
        let observed: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.get(demographic_key).and_then(normalize_answer))
            .collect();
        observed.into_iter().take(2).collect()
    } else {
        values.to_vec()
    };

    let distributions: Vec<Distribution> = columns
        .iter()
        .map(|value| {
            let partition: Vec<ResponseRecord> = records
                .iter()
                .filter(|r| {
                    r.get(demographic_key).and_then(normalize_answer).as_deref()
                        == Some(value.as_str())
                })
                .cloned()
                .collect();
            tabulate(&partition, question_key, options)
        })
        .collect();

    let mut answer_order: Vec<String> = Vec::new();
    for dist in distributions.iter() {
        for entry in dist.entries.iter() {
            if !answer_order.contains(&entry.response) {
                answer_order.push(entry.response.clone());
            }
        }
    }

    let mut rows: Vec<ComparisonRow> = answer_order
        .iter()
        .map(|answer| {
            let cells: Vec<f64> = distributions
                .iter()
                .map(|dist| {
                    dist.entries
                        .iter()
                        .find(|e| e.response == *answer)
                        .map(|e| e.percentage)
                        .unwrap_or(0.0)
                })
                .collect();
            ComparisonRow {
                response: answer.clone(),
                cells,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let left = a.cells.first().copied().unwrap_or(0.0);
        let right = b.cells.first().copied().unwrap_or(0.0);
        right.partial_cmp(&left).unwrap_or(Ordering::Equal)
    });

    ComparisonTable {
        demographic_key: demographic_key.to_string(),
        columns,
        rows,
    }
}

/// Runs the aggregation path selected by the question kind over an
/// immutable dataset snapshot.
///
/// Total over any well-typed input: unknown keys or labels degrade to an
/// empty result with a zero margin, they never raise.
pub fn run_question_stats(
    dataset: &Dataset,
    selection: &QuestionSelection,
    filters: &FilterSet,
    range: &DateRange,
) -> SelectionReport {
    info!(
        "run_question_stats: {:?} {:?} ({:?} filter keys)",
        selection.kind,
        selection.label,
        filters.len()
    );

    let (stats, margin, effective) = match selection.kind {
        QuestionKind::Historic => {
            let catalog = classify_questions(dataset.surveys());
            let question = catalog
                .historic
                .iter()
                .find(|q| q.label == selection.label)
                .or_else(|| catalog.historic.iter().find(|q| q.key == selection.key));
            let ts = match question {
                Some(q) => assemble_time_series(dataset, q, filters, range),
                None => {
                    debug!(
                        "run_question_stats: no historic question for {:?}",
                        selection.label
                    );
                    TimeSeries::default()
                }
            };
            // The report carries the worst round: largest margin, thinnest
            // sample.
            let mut margin = 0.0_f64;
            let mut effective = f64::INFINITY;
            for weight in ts.round_weights.iter() {
                margin = margin.max(margin_of_error(*weight));
                effective = effective.min(*weight);
            }
            if ts.round_weights.is_empty() {
                effective = 0.0;
            }
            (QuestionStats::TimeSeries(ts), margin, effective)
        }
        QuestionKind::Unique => {
            let rounds = filter_rounds(&dataset.rounds_chronological(), range);
            let dist = rounds
                .iter()
                .find(|s| s.variables.iter().any(|v| v.key == selection.key))
                .map(|s| {
                    let filtered = apply_demographic_filters(dataset.records(&s.id), filters);
                    tabulate(&filtered, &selection.key, dataset.options())
                })
                .unwrap_or_default();
            let margin = margin_of_error(dist.total_weight);
            let effective = dist.total_weight;
            (QuestionStats::Distribution(dist), margin, effective)
        }
    };

    SelectionReport {
        stats,
        margin_of_error: margin,
        effective_sample: effective,
        high_margin: margin > HIGH_MARGIN_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(values: &[(&str, &str)]) -> ResponseRecord {
        values
            .iter()
            .map(|(key, value)| {
                let raw = if value.is_empty() {
                    RawValue::Empty
                } else {
                    RawValue::Text(value.to_string())
                };
                (key.to_string(), raw)
            })
            .collect()
    }

    fn survey(id: &str, month: &str, year: i32, vars: &[(&str, &str)]) -> Survey {
        Survey {
            id: id.to_string(),
            month: month.to_string(),
            year,
            variables: vars
                .iter()
                .map(|(k, l)| Variable {
                    key: k.to_string(),
                    label: l.to_string(),
                })
                .collect(),
        }
    }

    fn percentages(dist: &Distribution) -> BTreeMap<String, f64> {
        dist.entries
            .iter()
            .map(|e| (e.response.clone(), e.percentage))
            .collect()
    }

    #[test]
    fn weighted_null_answers_leave_the_denominator() {
        let records = vec![
            record(&[("P1", "Sim"), ("peso", "2")]),
            record(&[("P1", "Não"), ("peso", "1")]),
            record(&[("P1", "#null!"), ("peso", "5")]),
        ];
        let dist = tabulate(&records, "P1", &TallyOptions::default());
        let expected: BTreeMap<String, f64> =
            [("Sim".to_string(), 66.7), ("Não".to_string(), 33.3)]
                .into_iter()
                .collect();
        assert_eq!(percentages(&dist), expected);
        assert_eq!(dist.total_weight, 3.0);
    }

    #[test]
    fn percentages_sum_to_about_100_or_zero() {
        let records = vec![
            record(&[("P1", "A"), ("peso", "1")]),
            record(&[("P1", "B"), ("peso", "1")]),
            record(&[("P1", "C"), ("peso", "1")]),
        ];
        let dist = tabulate(&records, "P1", &TallyOptions::default());
        let sum: f64 = dist.entries.iter().map(|e| e.percentage).sum();
        assert!(sum > 99.9 && sum <= 100.1, "sum was {}", sum);

        let empty = tabulate(&records, "P9", &TallyOptions::default());
        let sum: f64 = empty.entries.iter().map(|e| e.percentage).sum();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn tabulate_is_record_order_invariant() {
        let mut records = vec![
            record(&[("P1", "Sim"), ("peso", "2,5")]),
            record(&[("P1", "Não"), ("peso", "1")]),
            record(&[("P1", "Sim"), ("peso", "1")]),
        ];
        let forward = tabulate(&records, "P1", &TallyOptions::default());
        records.reverse();
        let backward = tabulate(&records, "P1", &TallyOptions::default());
        assert_eq!(percentages(&forward), percentages(&backward));
        assert_eq!(forward.total_weight, backward.total_weight);
    }

    #[test]
    fn normalize_drops_sentinels_and_is_idempotent() {
        assert_eq!(normalize_answer(&RawValue::Text("#NULL!".to_string())), None);
        assert_eq!(
            normalize_answer(&RawValue::Text(" Não Sabe ".to_string())),
            None
        );
        assert_eq!(
            normalize_answer(&RawValue::Text("NÃO RESPONDEU".to_string())),
            None
        );
        assert_eq!(normalize_answer(&RawValue::Text("  ".to_string())), None);
        assert_eq!(normalize_answer(&RawValue::Empty), None);

        let once = normalize_answer(&RawValue::Text("  Aprova ".to_string())).unwrap();
        assert_eq!(once, "Aprova");
        let twice = normalize_answer(&RawValue::Text(once.clone())).unwrap();
        assert_eq!(once, twice);

        assert_eq!(
            normalize_answer(&RawValue::Number(2.0)),
            Some("2".to_string())
        );
        assert_eq!(
            normalize_answer(&RawValue::Number(2.5)),
            Some("2.5".to_string())
        );
    }

    #[test]
    fn weight_clamps_to_one() {
        let options = TallyOptions::default();
        assert_eq!(record_weight(&record(&[("P1", "Sim")]), &options), 1.0);
        assert_eq!(
            record_weight(&record(&[("peso", "abc")]), &options),
            1.0
        );
        let mut rec = ResponseRecord::new();
        rec.insert("peso".to_string(), RawValue::Number(-2.0));
        assert_eq!(record_weight(&rec, &options), 1.0);
        rec.insert("peso".to_string(), RawValue::Number(0.0));
        assert_eq!(record_weight(&rec, &options), 1.0);
        assert_eq!(
            record_weight(&record(&[("peso", "1,5")]), &options),
            1.5
        );
    }

    #[test]
    fn empty_filter_set_is_identity() {
        let records = vec![
            record(&[("PF1", "Feminino"), ("P1", "Sim")]),
            record(&[("PF1", "Masculino"), ("P1", "Não")]),
        ];
        let filtered = apply_demographic_filters(&records, &FilterSet::new());
        assert_eq!(filtered, records);
    }

    #[test]
    fn unknown_filter_key_yields_empty_set() {
        let records = vec![record(&[("PF1", "Feminino")])];
        let mut filters = FilterSet::new();
        filters.insert(
            "PF9".to_string(),
            ["Sul".to_string()].into_iter().collect(),
        );
        assert!(apply_demographic_filters(&records, &filters).is_empty());
    }

    #[test]
    fn empty_allow_list_imposes_no_constraint() {
        let records = vec![
            record(&[("PF1", "Feminino")]),
            record(&[("PF1", "Masculino")]),
        ];
        let mut filters = FilterSet::new();
        filters.insert("PF1".to_string(), Default::default());
        assert_eq!(apply_demographic_filters(&records, &filters).len(), 2);

        filters.insert(
            "PF1".to_string(),
            ["Feminino".to_string()].into_iter().collect(),
        );
        let filtered = apply_demographic_filters(&records, &filters);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0], records[0]);
    }

    #[test]
    fn margin_scenarios() {
        assert_eq!(margin_of_error(0.0), 0.0);
        assert_eq!(margin_of_error(-5.0), 0.0);
        assert_eq!(margin_of_error(400.0), 4.9);
        // Monotonically non-increasing in the sample size.
        let samples = [10.0, 50.0, 100.0, 400.0, 1600.0];
        for pair in samples.windows(2) {
            assert!(margin_of_error(pair[0]) >= margin_of_error(pair[1]));
        }
    }

    #[test]
    fn classifier_partitions_without_losing_occurrences() {
        let surveys = vec![
            survey(
                "s1",
                "Janeiro",
                2023,
                &[("P1", "Avaliação do governo"), ("P2", "Voto espontâneo"), ("PF1", "Sexo")],
            ),
            survey("s2", "Fevereiro", 2023, &[("P3", "Avaliação do governo")]),
            survey("s3", "Março", 2023, &[("P4", "Tema do mês")]),
        ];
        let catalog = classify_questions(&surveys);

        assert_eq!(catalog.historic.len(), 1);
        let historic = &catalog.historic[0];
        assert_eq!(historic.label, "Avaliação do governo");
        // Earliest round wins the canonical key.
        assert_eq!(historic.key, "P1");
        assert_eq!(historic.occurrences.len(), 2);

        let unique_count: usize = catalog.unique.iter().map(|r| r.questions.len()).sum();
        assert_eq!(unique_count, 2);
        // Demographics never enter the question universe.
        let total = historic.occurrences.len() + unique_count;
        assert_eq!(total, 4);
    }

    #[test]
    fn classifier_ignores_round_input_order() {
        let mut surveys = vec![
            survey("s1", "Janeiro", 2023, &[("P1", "Avaliação do governo")]),
            survey("s2", "Março", 2023, &[("P7", "Avaliação do governo")]),
        ];
        let forward = classify_questions(&surveys);
        surveys.reverse();
        let backward = classify_questions(&surveys);
        assert_eq!(forward, backward);
        assert_eq!(forward.historic[0].key, "P1");
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let surveys = vec![
            survey("s1", "Janeiro", 2023, &[]),
            survey("s2", "Fevereiro", 2023, &[]),
            survey("s3", "Março", 2023, &[]),
        ];
        let range = DateRange {
            start: Some(RoundDate {
                year: 2023,
                month: 2,
            }),
            end: Some(RoundDate {
                year: 2023,
                month: 3,
            }),
        };
        let kept = filter_rounds(&surveys, &range);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id, "s2");
        assert_eq!(kept[1].id, "s3");

        // Unbounded on both sides keeps everything.
        assert_eq!(filter_rounds(&surveys, &DateRange::default()).len(), 3);
    }

    fn two_round_dataset() -> Dataset {
        let mut builder = DatasetBuilder::new(&TallyOptions::default());
        builder
            .survey(&survey(
                "s1",
                "Janeiro",
                2023,
                &[("P1", "Avaliação do governo"), ("PF1", "Sexo")],
            ))
            .unwrap();
        builder
            .survey(&survey(
                "s2",
                "Março",
                2023,
                &[("P5", "Avaliação do governo"), ("PF1", "Sexo")],
            ))
            .unwrap();
        builder
            .add_record_simple("s1", &[("P1", "Sim"), ("PF1", "Feminino"), ("peso", "1")])
            .unwrap();
        builder
            .add_record_simple("s1", &[("P1", "Não"), ("PF1", "Masculino"), ("peso", "1")])
            .unwrap();
        builder
            .add_record_simple("s2", &[("P5", "Não"), ("PF1", "Feminino"), ("peso", "2")])
            .unwrap();
        builder.build()
    }

    #[test]
    fn series_are_dense_across_rounds() {
        let dataset = two_round_dataset();
        let catalog = classify_questions(dataset.surveys());
        let ts = assemble_time_series(
            &dataset,
            &catalog.historic[0],
            &FilterSet::new(),
            &DateRange::default(),
        );

        assert_eq!(ts.round_labels, vec!["Janeiro/2023", "Março/2023"]);
        assert_eq!(ts.series.len(), 2);

        let sim = ts.series.iter().find(|s| s.id == "Sim").unwrap();
        // "Sim" only appears in round 1, the series still spans both rounds.
        assert_eq!(sim.data.len(), 2);
        assert_eq!(sim.data[0].y, 50.0);
        assert_eq!(sim.data[1].y, 0.0);
        assert_eq!(sim.data[1].exact_value, 0.0);

        let nao = ts.series.iter().find(|s| s.id == "Não").unwrap();
        assert_eq!(nao.data[0].y, 50.0);
        assert_eq!(nao.data[1].y, 100.0);
    }

    #[test]
    fn series_colors_are_stable_per_answer() {
        assert_eq!(series_color("Sim"), series_color("Sim"));
        let dataset = two_round_dataset();
        let catalog = classify_questions(dataset.surveys());
        let first = assemble_time_series(
            &dataset,
            &catalog.historic[0],
            &FilterSet::new(),
            &DateRange::default(),
        );
        let second = assemble_time_series(
            &dataset,
            &catalog.historic[0],
            &FilterSet::new(),
            &DateRange::default(),
        );
        assert_eq!(first, second);
        for series in first.series.iter() {
            assert_eq!(series.color, series_color(&series.id));
        }
    }

    #[test]
    fn run_stats_for_a_historic_question() {
        let dataset = two_round_dataset();
        let selection = QuestionSelection {
            kind: QuestionKind::Historic,
            key: "P1".to_string(),
            label: "Avaliação do governo".to_string(),
        };
        let report = run_question_stats(
            &dataset,
            &selection,
            &FilterSet::new(),
            &DateRange::default(),
        );
        match &report.stats {
            QuestionStats::TimeSeries(ts) => {
                assert_eq!(ts.round_weights, vec![2.0, 2.0]);
            }
            other => panic!("expected a time series, got {:?}", other),
        }
        // Worst round: n = 2.
        assert_eq!(report.margin_of_error, margin_of_error(2.0));
        assert_eq!(report.effective_sample, 2.0);
        assert!(report.high_margin);
    }

    #[test]
    fn run_stats_for_an_unknown_selection_degrades_to_empty() {
        let dataset = two_round_dataset();
        let selection = QuestionSelection {
            kind: QuestionKind::Unique,
            key: "P99".to_string(),
            label: "Inexistente".to_string(),
        };
        let report = run_question_stats(
            &dataset,
            &selection,
            &FilterSet::new(),
            &DateRange::default(),
        );
        match &report.stats {
            QuestionStats::Distribution(dist) => {
                assert!(dist.entries.is_empty());
                assert_eq!(dist.total_weight, 0.0);
            }
            other => panic!("expected a distribution, got {:?}", other),
        }
        assert_eq!(report.margin_of_error, 0.0);
        assert!(!report.high_margin);
    }

    #[test]
    fn filters_narrow_the_time_series() {
        let dataset = two_round_dataset();
        let catalog = classify_questions(dataset.surveys());
        let mut filters = FilterSet::new();
        filters.insert(
            "PF1".to_string(),
            ["Feminino".to_string()].into_iter().collect(),
        );
        let ts = assemble_time_series(&dataset, &catalog.historic[0], &filters, &DateRange::default());
        assert_eq!(ts.round_weights, vec![1.0, 2.0]);
        let sim = ts.series.iter().find(|s| s.id == "Sim").unwrap();
        assert_eq!(sim.data[0].y, 100.0);
    }

    #[test]
    fn comparison_defaults_to_first_two_values_and_sorts_rows() {
        let records = vec![
            record(&[("PF1", "Masculino"), ("P1", "Aprova"), ("peso", "1")]),
            record(&[("PF1", "Feminino"), ("P1", "Desaprova"), ("peso", "3")]),
            record(&[("PF1", "Feminino"), ("P1", "Aprova"), ("peso", "1")]),
            record(&[("PF1", "Outro"), ("P1", "Aprova"), ("peso", "1")]),
        ];
        let table = assemble_comparison(&records, "PF1", &[], "P1", &TallyOptions::default());

        // Lexicographic order of the observed universe, first two values.
        assert_eq!(
            table.columns,
            vec!["Feminino".to_string(), "Masculino".to_string()]
        );
        assert_eq!(table.rows.len(), 2);
        // Sorted by the first column, descending.
        assert_eq!(table.rows[0].response, "Desaprova");
        assert_eq!(table.rows[0].cells, vec![75.0, 0.0]);
        assert_eq!(table.rows[1].response, "Aprova");
        assert_eq!(table.rows[1].cells, vec![25.0, 100.0]);
    }

    #[test]
    fn selecting_a_question_clears_filters() {
        let mut state = SelectionState::default();
        state.set_filter("PF1", &["Feminino".to_string()]);
        assert_eq!(state.filters.len(), 1);
        state.select_question(QuestionSelection {
            kind: QuestionKind::Unique,
            key: "P2".to_string(),
            label: "Voto espontâneo".to_string(),
        });
        assert!(state.filters.is_empty());
        assert!(state.selection.is_some());
    }

    #[test]
    fn zero_valid_weight_yields_an_empty_result() {
        let records = vec![
            record(&[("P1", "#null!"), ("peso", "4")]),
            record(&[("P1", ""), ("peso", "2")]),
        ];
        let dist = tabulate(&records, "P1", &TallyOptions::default());
        assert_eq!(dist, Distribution::default());
    }

    #[test]
    fn extra_non_answers_are_honored() {
        let options = TallyOptions {
            extra_non_answers: vec!["Recusa".to_string()],
            ..TallyOptions::default()
        };
        let records = vec![
            record(&[("P1", "Sim"), ("peso", "1")]),
            record(&[("P1", "recusa"), ("peso", "9")]),
        ];
        let dist = tabulate(&records, "P1", &options);
        assert_eq!(dist.entries.len(), 1);
        assert_eq!(dist.entries[0].percentage, 100.0);
    }

    #[test]
    fn question_and_demographic_keys_are_disjoint() {
        assert!(is_question_key("P1"));
        assert!(is_question_key("P12"));
        assert!(!is_question_key("PF1"));
        assert!(!is_question_key("P"));
        assert!(!is_question_key("peso"));
        assert!(is_demographic_key("PF1"));
        assert!(!is_demographic_key("P1"));
        assert!(!is_demographic_key("PF"));
    }

    #[test]
    fn unknown_months_sort_first() {
        assert_eq!(month_ordinal("Janeiro"), 1);
        assert_eq!(month_ordinal("março"), 3);
        assert_eq!(month_ordinal("MARCO"), 3);
        assert_eq!(month_ordinal("Thermidor"), 0);
        let odd = survey("s0", "Thermidor", 2023, &[]);
        let jan = survey("s1", "Janeiro", 2023, &[]);
        assert!(round_date(&odd) < round_date(&jan));
    }
}
