pub use crate::config::*;

use std::collections::{BTreeSet, HashMap};

use crate::{is_demographic_key, normalize_answer, round_date};

/// An immutable snapshot of the survey/response universe.
///
/// Every aggregation pass reads from a snapshot and produces a fresh result;
/// nothing in the pipeline mutates it.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    pub(crate) options: TallyOptions,
    pub(crate) surveys: Vec<Survey>,
    pub(crate) records: HashMap<String, Vec<ResponseRecord>>,
}

impl Dataset {
    pub fn options(&self) -> &TallyOptions {
        &self.options
    }

    pub fn surveys(&self) -> &[Survey] {
        &self.surveys
    }

    /// The records of one round. An unknown survey id yields an empty slice.
    pub fn records(&self, survey_id: &str) -> &[ResponseRecord] {
        self.records
            .get(survey_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All records of all rounds, in chronological round order.
    pub fn all_records(&self) -> Vec<ResponseRecord> {
        let mut res: Vec<ResponseRecord> = Vec::new();
        for survey in self.rounds_chronological() {
            res.extend(self.records(&survey.id).to_vec());
        }
        res
    }

    /// The rounds sorted by `(year, month ordinal, id)`. The id tie-break
    /// keeps two rounds of the same month in a stable order.
    pub fn rounds_chronological(&self) -> Vec<Survey> {
        let mut rounds = self.surveys.clone();
        rounds.sort_by_key(|s| (round_date(s), s.id.clone()));
        rounds
    }

    /// The demographic universe, recomputed from the current snapshot.
    ///
    /// Axes appear in first-declaration order across chronological rounds;
    /// values are the distinct observed record values, lexicographically
    /// sorted. Non-answer sentinels are excluded, consistently with the
    /// tabulator.
    pub fn demographics(&self) -> Vec<DemographicDescriptor> {
        let mut order: Vec<String> = Vec::new();
        let mut labels: HashMap<String, String> = HashMap::new();
        for survey in self.rounds_chronological() {
            for var in survey.variables.iter() {
                if is_demographic_key(&var.key) && !labels.contains_key(&var.key) {
                    order.push(var.key.clone());
                    labels.insert(var.key.clone(), var.label.clone());
                }
            }
        }

        let mut observed: HashMap<String, BTreeSet<String>> = HashMap::new();
        for records in self.records.values() {
            for record in records.iter() {
                for key in order.iter() {
                    if let Some(value) = record.get(key).and_then(normalize_answer) {
                        observed.entry(key.clone()).or_default().insert(value);
                    }
                }
            }
        }

        order
            .iter()
            .map(|key| DemographicDescriptor {
                key: key.clone(),
                label: labels.get(key).cloned().unwrap_or_default(),
                values: observed
                    .get(key)
                    .map(|vs| vs.iter().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// A builder for assembling a [Dataset] from fetched surveys and records.
///
/// ```
/// pub use survey_tabulation::builder::DatasetBuilder;
/// pub use survey_tabulation::{Survey, TallyOptions, Variable};
/// # use survey_tabulation::DatasetError;
///
/// let mut builder = DatasetBuilder::new(&TallyOptions::default());
/// builder.survey(&Survey {
///     id: "s1".to_string(),
///     month: "Janeiro".to_string(),
///     year: 2023,
///     variables: vec![Variable {
///         key: "P1".to_string(),
///         label: "Government approval".to_string(),
///     }],
/// })?;
/// builder.add_record_simple("s1", &[("P1", "Aprova"), ("peso", "2")])?;
///
/// # Ok::<(), DatasetError>(())
/// ```
pub struct DatasetBuilder {
    options: TallyOptions,
    surveys: Vec<Survey>,
    records: HashMap<String, Vec<ResponseRecord>>,
}

impl DatasetBuilder {
    pub fn new(options: &TallyOptions) -> DatasetBuilder {
        DatasetBuilder {
            options: options.clone(),
            surveys: Vec::new(),
            records: HashMap::new(),
        }
    }

    /// Declares one survey round. Rounds may be declared in any order.
    pub fn survey(&mut self, survey: &Survey) -> Result<(), DatasetError> {
        if self.surveys.iter().any(|s| s.id == survey.id) {
            return Err(DatasetError::DuplicateSurvey {
                id: survey.id.clone(),
            });
        }
        self.surveys.push(survey.clone());
        self.records.insert(survey.id.clone(), Vec::new());
        Ok(())
    }

    /// Adds a fetched record to its round.
    pub fn add_record(
        &mut self,
        survey_id: &str,
        record: ResponseRecord,
    ) -> Result<(), DatasetError> {
        match self.records.get_mut(survey_id) {
            Some(records) => {
                records.push(record);
                Ok(())
            }
            None => Err(DatasetError::UnknownSurvey {
                id: survey_id.to_string(),
            }),
        }
    }

    /// Adds a record from plain text cells. Empty strings become empty
    /// cells. It is the simplest use case for most cases.
    pub fn add_record_simple(
        &mut self,
        survey_id: &str,
        values: &[(&str, &str)],
    ) -> Result<(), DatasetError> {
        let record: ResponseRecord = values
            .iter()
            .map(|(key, value)| {
                let raw = if value.is_empty() {
                    RawValue::Empty
                } else {
                    RawValue::Text(value.to_string())
                };
                (key.to_string(), raw)
            })
            .collect();
        self.add_record(survey_id, record)
    }

    pub fn build(self) -> Dataset {
        Dataset {
            options: self.options,
            surveys: self.surveys,
            records: self.records,
        }
    }
}
