//! In-memory checks over a batch of submitted readings.
//!
//! Runs before anything is written so a submit either persists every row or none.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{machine, reading};
use crate::models::MeterKind;
use crate::services::meter_usage::MeterValues;

/// One row of a monthly readings submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReadingSubmission {
    pub machine_id: Uuid,
    #[validate(range(min = 0, max = 1000000000000000))]
    pub mono: Option<i64>,
    #[validate(range(min = 0, max = 1000000000000000))]
    pub colour: Option<i64>,
    #[validate(range(min = 0, max = 1000000000000000))]
    pub scan: Option<i64>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

impl ReadingSubmission {
    pub fn meters(&self) -> MeterValues {
        MeterValues {
            mono: self.mono,
            colour: self.colour,
            scan: self.scan,
        }
    }

    /// The note, trimmed, if it has any content.
    pub fn trimmed_note(&self) -> Option<&str> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }
}

/// A rule broken by one submitted row. `row` is 1-based within the batch and
/// kept out of the message so callers can number rows their own way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, Error)]
#[serde(tag = "code")]
pub enum ReadingViolation {
    #[error("machine {machine_id} not found")]
    MachineNotFound { row: usize, machine_id: Uuid },

    #[error("a meter reading or a note is required")]
    NoteOrReadingRequired { row: usize, machine_id: Uuid },

    #[error("{field} reading {current} is unchanged from previous month")]
    ReadingUnchanged {
        row: usize,
        machine_id: Uuid,
        field: MeterKind,
        current: i64,
        previous: i64,
    },

    #[error("{field} reading {current} is lower than previous month ({previous})")]
    ReadingDecreased {
        row: usize,
        machine_id: Uuid,
        field: MeterKind,
        current: i64,
        previous: i64,
    },

    #[error("machine has no {field} meter")]
    MeterNotApplicable {
        row: usize,
        machine_id: Uuid,
        field: MeterKind,
    },
}

/// Outcome of validating a batch; valid iff `errors` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ReadingViolation>,
}

impl ValidationReport {
    pub fn into_result(self) -> Result<(), Vec<ReadingViolation>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Checks every row against its machine's configuration and the prior month.
///
/// `machines` and `previous` are keyed by machine id; a missing entry in
/// `previous` means the machine has no reading for the prior month.
pub fn validate_readings(
    submissions: &[ReadingSubmission],
    machines: &HashMap<Uuid, machine::Model>,
    previous: &HashMap<Uuid, reading::Model>,
) -> ValidationReport {
    let mut errors = Vec::new();

    for (index, submission) in submissions.iter().enumerate() {
        let row = index + 1;
        let machine_id = submission.machine_id;

        let Some(machine) = machines.get(&machine_id) else {
            errors.push(ReadingViolation::MachineNotFound { row, machine_id });
            continue;
        };

        let meters = submission.meters();
        if meters.is_empty() {
            if submission.trimmed_note().is_none() {
                errors.push(ReadingViolation::NoteOrReadingRequired { row, machine_id });
            }
            continue;
        }

        let prior = previous.get(&machine_id);
        for field in MeterKind::ALL {
            let Some(current) = meters.get(field) else {
                continue;
            };

            if !machine.meter_enabled(field) {
                errors.push(ReadingViolation::MeterNotApplicable {
                    row,
                    machine_id,
                    field,
                });
                continue;
            }

            let Some(previous) = prior.and_then(|reading| reading.meter(field)) else {
                continue;
            };

            if current == previous {
                errors.push(ReadingViolation::ReadingUnchanged {
                    row,
                    machine_id,
                    field,
                    current,
                    previous,
                });
            } else if current < previous {
                errors.push(ReadingViolation::ReadingDecreased {
                    row,
                    machine_id,
                    field,
                    current,
                    previous,
                });
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
