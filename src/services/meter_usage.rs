//! Month-over-month usage derived from meter pairs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::reading;
use crate::models::MeterKind;

/// Usage for one meter given this month's and the previous value.
///
/// * no current value: no usage
/// * current value without a previous one: `0`, the reading becomes the baseline
/// * otherwise the plain difference, which may be zero or negative; rejecting
///   non-increasing values is the validator's job
pub fn usage(current: Option<i64>, previous: Option<i64>) -> Option<i64> {
    match (current, previous) {
        (None, _) => None,
        (Some(_), None) => Some(0),
        (Some(current), Some(previous)) => Some(current - previous),
    }
}

/// The three meter values of a machine for one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MeterValues {
    pub mono: Option<i64>,
    pub colour: Option<i64>,
    pub scan: Option<i64>,
}

impl MeterValues {
    pub fn get(&self, kind: MeterKind) -> Option<i64> {
        match kind {
            MeterKind::Mono => self.mono,
            MeterKind::Colour => self.colour,
            MeterKind::Scan => self.scan,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mono.is_none() && self.colour.is_none() && self.scan.is_none()
    }
}

impl From<&reading::Model> for MeterValues {
    fn from(model: &reading::Model) -> Self {
        Self {
            mono: model.mono,
            colour: model.colour,
            scan: model.scan,
        }
    }
}

/// Usage derived for each meter of a reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct MeterUsage {
    pub mono: Option<i64>,
    pub colour: Option<i64>,
    pub scan: Option<i64>,
}

/// Per-meter usage of `current` against the previous month's reading.
///
/// Without any previous-month reading every usage is `None`: there is nothing
/// to measure against yet. When the previous reading exists but lacked a
/// particular meter, that meter's value becomes its baseline (`0`).
pub fn monthly_usage(current: &MeterValues, previous: Option<&MeterValues>) -> MeterUsage {
    let Some(previous) = previous else {
        return MeterUsage::default();
    };

    MeterUsage {
        mono: usage(current.mono, previous.mono),
        colour: usage(current.colour, previous.colour),
        scan: usage(current.scan, previous.scan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, None)]
    #[case(None, Some(500), None)]
    #[case(Some(500), None, Some(0))]
    #[case(Some(1050), Some(1000), Some(50))]
    #[case(Some(1000), Some(1000), Some(0))]
    #[case(Some(900), Some(1000), Some(-100))]
    fn usage_cases(
        #[case] current: Option<i64>,
        #[case] previous: Option<i64>,
        #[case] expected: Option<i64>,
    ) {
        assert_eq!(usage(current, previous), expected);
    }

    #[test]
    fn first_ever_reading_has_no_usage() {
        let current = MeterValues {
            mono: Some(1200),
            colour: None,
            scan: Some(40),
        };
        assert_eq!(monthly_usage(&current, None), MeterUsage::default());
    }

    #[test]
    fn meters_are_computed_independently() {
        let previous = MeterValues {
            mono: Some(1000),
            colour: None,
            scan: Some(10),
        };
        let current = MeterValues {
            mono: Some(1050),
            colour: Some(300),
            scan: None,
        };

        let usage = monthly_usage(&current, Some(&previous));
        assert_eq!(usage.mono, Some(50));
        assert_eq!(usage.colour, Some(0));
        assert_eq!(usage.scan, None);
    }
}
