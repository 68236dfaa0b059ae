use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ParseValueError;

/// Highest meter value accepted from capture or import. Keeps derived
/// totals and differences well inside `i64`.
pub const MAX_METER_VALUE: i64 = 1_000_000_000_000_000;

/// A countable usage channel on a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeterKind {
    Mono,
    Colour,
    Scan,
}

impl MeterKind {
    pub const ALL: [MeterKind; 3] = [MeterKind::Mono, MeterKind::Colour, MeterKind::Scan];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeterKind::Mono => "mono",
            MeterKind::Colour => "colour",
            MeterKind::Scan => "scan",
        }
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meter a consumable part is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum BillingMeter {
    #[sea_orm(string_value = "mono")]
    Mono,

    #[sea_orm(string_value = "colour")]
    Colour,

    #[sea_orm(string_value = "total")]
    Total,
}

impl BillingMeter {
    /// Picks this meter's value out of a set of monthly meter values.
    ///
    /// `Total` is the sum of mono and colour and is only present when at
    /// least one of them is.
    pub fn value_from(&self, mono: Option<i64>, colour: Option<i64>) -> Option<i64> {
        match self {
            BillingMeter::Mono => mono,
            BillingMeter::Colour => colour,
            BillingMeter::Total => match (mono, colour) {
                (None, None) => None,
                (m, c) => m.unwrap_or(0).checked_add(c.unwrap_or(0)),
            },
        }
    }
}

impl fmt::Display for BillingMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingMeter::Mono => write!(f, "mono"),
            BillingMeter::Colour => write!(f, "colour"),
            BillingMeter::Total => write!(f, "total"),
        }
    }
}

impl FromStr for BillingMeter {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mono" => Ok(BillingMeter::Mono),
            "colour" | "color" => Ok(BillingMeter::Colour),
            "total" => Ok(BillingMeter::Total),
            _ => Err(ParseValueError::new("meter type", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_meter_sums_mono_and_colour() {
        assert_eq!(BillingMeter::Total.value_from(Some(100), Some(25)), Some(125));
        assert_eq!(BillingMeter::Total.value_from(Some(100), None), Some(100));
        assert_eq!(BillingMeter::Total.value_from(None, None), None);
    }

    #[test]
    fn total_meter_that_would_overflow_is_absent() {
        assert_eq!(BillingMeter::Total.value_from(Some(i64::MAX), Some(1)), None);
        assert_eq!(
            BillingMeter::Total.value_from(Some(MAX_METER_VALUE), Some(MAX_METER_VALUE)),
            Some(2 * MAX_METER_VALUE)
        );
    }

    #[test]
    fn single_meters_pick_their_own_value() {
        assert_eq!(BillingMeter::Mono.value_from(Some(7), Some(9)), Some(7));
        assert_eq!(BillingMeter::Colour.value_from(Some(7), None), None);
    }
}
