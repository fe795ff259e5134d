use super::dataset::{Dataset, canonical_series_name};
use crate::domain::{CompatError, Severity};
use crate::numerics::{Tolerance, ValueParseError, reconcile_precision};
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchKind {
    MissingSeries,
    LengthMismatch {
        reference_len: usize,
        simulated_len: usize,
    },
    TruncatedSeries {
        series_len: usize,
        time_len: usize,
    },
    ValueMismatch {
        step: usize,
        time: String,
        reference: String,
        simulated: String,
    },
    UnparseableValue {
        step: usize,
        time: String,
        value: String,
    },
}

impl MismatchKind {
    fn describe(&self, series: &str) -> String {
        match self {
            Self::MissingSeries => format!("missing series {} in simulated output", series),
            Self::LengthMismatch {
                reference_len,
                simulated_len,
            } => format!(
                "len mismatch for {} ({} vs {})",
                series, reference_len, simulated_len
            ),
            Self::TruncatedSeries {
                series_len,
                time_len,
            } => format!(
                "series {} has {} values but time has {}",
                series, series_len, time_len
            ),
            Self::ValueMismatch {
                time,
                reference,
                simulated,
                ..
            } => format!(
                "time {} mismatch in {} ({} != {})",
                time, series, reference, simulated
            ),
            Self::UnparseableValue { time, value, .. } => format!(
                "time {} unparseable value in {} ('{}')",
                time, series, value
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchEvent {
    pub severity: Severity,
    pub series: String,
    #[serde(flatten)]
    pub kind: MismatchKind,
    pub message: String,
}

impl MismatchEvent {
    pub fn error(series: impl Into<String>, kind: MismatchKind) -> Self {
        let series = series.into();
        let message = kind.describe(&series);
        Self {
            severity: Severity::Error,
            series,
            kind,
            message,
        }
    }
}

impl Display for MismatchEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ComparisonOutcome {
    pub steps: usize,
    pub compared_values: usize,
    pub failing_values: usize,
    pub events: Vec<MismatchEvent>,
}

impl ComparisonOutcome {
    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| event.severity == Severity::Error)
            .count()
    }

    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("reference data has no 'time' series")]
    MissingTimeSeries,
}

impl From<CompareError> for CompatError {
    fn from(error: CompareError) -> Self {
        CompatError::input_validation("INPUT.REFERENCE_TIME", error.to_string())
    }
}

struct SeriesCursor<'a> {
    name: String,
    reference: &'a [String],
    simulated: Option<&'a [String]>,
    halted: bool,
}

/// Walks the reference time axis and checks every reference series against
/// its simulated counterpart at each step.
///
/// A missing or wrongly sized series is reported once and then skipped for
/// the remaining steps; every other series keeps being compared.
pub fn compare_datasets(
    reference: &Dataset,
    simulated: &Dataset,
    tolerance: &Tolerance,
) -> Result<ComparisonOutcome, CompareError> {
    let time = reference.time().ok_or(CompareError::MissingTimeSeries)?;
    let mut cursors = reference
        .iter()
        .map(|(reference_name, values)| {
            let name = canonical_series_name(reference_name);
            let simulated = simulated.series(&name);
            SeriesCursor {
                name,
                reference: values,
                simulated,
                halted: false,
            }
        })
        .collect::<Vec<_>>();

    let mut outcome = ComparisonOutcome {
        steps: time.len(),
        ..ComparisonOutcome::default()
    };

    for (step, time_label) in time.iter().enumerate() {
        for cursor in &mut cursors {
            if cursor.halted {
                continue;
            }

            let Some(simulated_values) = cursor.simulated else {
                outcome
                    .events
                    .push(MismatchEvent::error(&cursor.name, MismatchKind::MissingSeries));
                cursor.halted = true;
                continue;
            };

            if cursor.reference.len() != simulated_values.len() {
                outcome.events.push(MismatchEvent::error(
                    &cursor.name,
                    MismatchKind::LengthMismatch {
                        reference_len: cursor.reference.len(),
                        simulated_len: simulated_values.len(),
                    },
                ));
                cursor.halted = true;
                continue;
            }

            let (Some(reference_value), Some(simulated_value)) =
                (cursor.reference.get(step), simulated_values.get(step))
            else {
                outcome.events.push(MismatchEvent::error(
                    &cursor.name,
                    MismatchKind::TruncatedSeries {
                        series_len: cursor.reference.len(),
                        time_len: time.len(),
                    },
                ));
                cursor.halted = true;
                continue;
            };

            outcome.compared_values += 1;
            match values_match(reference_value, simulated_value, tolerance) {
                Ok(true) => {}
                Ok(false) => {
                    outcome.failing_values += 1;
                    outcome.events.push(MismatchEvent::error(
                        &cursor.name,
                        MismatchKind::ValueMismatch {
                            step,
                            time: time_label.clone(),
                            reference: reference_value.clone(),
                            simulated: simulated_value.clone(),
                        },
                    ));
                }
                Err(error) => {
                    outcome.failing_values += 1;
                    outcome.events.push(MismatchEvent::error(
                        &cursor.name,
                        MismatchKind::UnparseableValue {
                            step,
                            time: time_label.clone(),
                            value: error.text,
                        },
                    ));
                }
            }
        }
    }

    Ok(outcome)
}

/// Exact equality first, then precision reconciliation, then tolerance.
pub fn values_match(
    reference: &str,
    simulated: &str,
    tolerance: &Tolerance,
) -> Result<bool, ValueParseError> {
    let (reference, simulated) = reconcile_precision(reference, simulated)?;
    Ok(tolerance.is_close(reference, simulated))
}
