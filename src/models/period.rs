use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::ParseValueError;

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

/// A calendar month that readings and submission locks are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: i32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: i32) -> Result<Self, ParseValueError> {
        if !(1..=12).contains(&month) {
            return Err(ParseValueError::new("month", &month.to_string()));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ParseValueError::new("year", &year.to_string()));
        }
        Ok(Self { year, month })
    }

    /// The month before this one; January rolls back into December of the prior year.
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
