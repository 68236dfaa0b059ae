//! Domain value types shared by entities, services and handlers.

pub mod branch;
pub mod meter;
pub mod part;
pub mod period;

pub use branch::{Branch, BranchFilter};
pub use meter::{BillingMeter, MeterKind, MAX_METER_VALUE};
pub use part::{ComplianceStatus, PartType};
pub use period::BillingPeriod;

use thiserror::Error;

/// Raised when a string cannot be parsed into one of the domain enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
