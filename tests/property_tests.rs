//! Property-based tests for the usage, validation and yield billing rules.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use fleetmeter_api::entities::{machine, reading};
use fleetmeter_api::models::{BillingPeriod, Branch, PartType};
use fleetmeter_api::services::consumable_yield::{
    calc_general, calc_toner, calculate, replacement_usage,
};
use fleetmeter_api::services::meter_usage::usage;
use fleetmeter_api::services::reading_validation::{validate_readings, ReadingSubmission};

fn meter_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000_000
}

fn yield_strategy() -> impl Strategy<Value = i64> {
    1i64..200_000
}

fn cost_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..500_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percent_strategy() -> impl Strategy<Value = Decimal> {
    (-5_000i64..15_000).prop_map(|basis| Decimal::new(basis, 2))
}

fn mono_machine() -> machine::Model {
    machine::Model {
        id: Uuid::new_v4(),
        serial_number: "SN-PROP".into(),
        customer_id: None,
        model_id: None,
        mono_enabled: true,
        colour_enabled: false,
        scan_enabled: false,
        is_active: true,
        is_decommissioned: false,
        branch: Branch::Jhb,
        created_at: Utc::now(),
        updated_at: None,
    }
}

fn prior_reading(machine: &machine::Model, mono: i64) -> reading::Model {
    reading::Model {
        id: Uuid::new_v4(),
        machine_id: machine.id,
        year: 2024,
        month: 2,
        mono: Some(mono),
        colour: None,
        scan: None,
        mono_usage: None,
        colour_usage: None,
        scan_usage: None,
        note: None,
        captured_by: Uuid::new_v4(),
        branch: machine.branch,
        created_at: Utc::now(),
        updated_at: None,
    }
}

// Property: monthly usage edge cases
proptest! {
    #[test]
    fn no_current_value_means_no_usage(previous in proptest::option::of(meter_strategy())) {
        prop_assert_eq!(usage(None, previous), None);
    }

    #[test]
    fn first_value_is_a_zero_baseline(current in meter_strategy()) {
        prop_assert_eq!(usage(Some(current), None), Some(0));
    }

    #[test]
    fn usage_is_the_plain_difference(current in meter_strategy(), previous in meter_strategy()) {
        prop_assert_eq!(usage(Some(current), Some(previous)), Some(current - previous));
    }
}

// Property: monotonic readings
proptest! {
    #[test]
    fn only_strict_increases_pass_validation(previous in meter_strategy(), current in meter_strategy()) {
        let machine = mono_machine();
        let submission = ReadingSubmission {
            machine_id: machine.id,
            mono: Some(current),
            colour: None,
            scan: None,
            note: None,
        };
        let previous_map = HashMap::from([(machine.id, prior_reading(&machine, previous))]);
        let machines = HashMap::from([(machine.id, machine)]);

        let report = validate_readings(&[submission], &machines, &previous_map);

        prop_assert_eq!(report.valid, current > previous);
        prop_assert_eq!(report.errors.is_empty(), current > previous);
    }
}

// Property: yield billing
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn replacement_usage_is_never_negative(current in meter_strategy(), prior in meter_strategy()) {
        prop_assert!(replacement_usage(current, prior) >= 0);
    }

    #[test]
    fn adjusted_shortfall_is_bounded(
        usage in meter_strategy(),
        expected_yield in yield_strategy(),
        cost in cost_strategy(),
        percent in proptest::option::of(percent_strategy()),
    ) {
        let calc = calc_toner(usage, expected_yield, cost, percent);
        prop_assert!(calc.adjusted_shortfall_clicks >= 0);
        prop_assert!(calc.adjusted_shortfall_clicks <= calc.shortfall_clicks);
        prop_assert!(calc.display_charge_rand >= Decimal::ZERO);
        prop_assert_eq!(calc.yield_met, usage >= expected_yield);
        prop_assert_eq!(calc.yield_met, calc.shortfall_clicks == 0);
    }

    #[test]
    fn more_toner_left_never_costs_more(
        usage in meter_strategy(),
        expected_yield in yield_strategy(),
        cost in cost_strategy(),
        low in percent_strategy(),
        high in percent_strategy(),
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let at_low = calc_toner(usage, expected_yield, cost, Some(low));
        let at_high = calc_toner(usage, expected_yield, cost, Some(high));
        prop_assert!(at_high.display_charge_rand <= at_low.display_charge_rand);
    }

    #[test]
    fn general_parts_bill_the_raw_shortfall(
        usage in meter_strategy(),
        expected_yield in yield_strategy(),
        cost in cost_strategy(),
    ) {
        let calc = calc_general(usage, expected_yield, cost);
        prop_assert_eq!(calc.adjusted_shortfall_clicks, calc.shortfall_clicks);
        prop_assert_eq!(calc.deduction, Decimal::ZERO);
        prop_assert_eq!(calc.remaining_toner_percent, None);
    }

    #[test]
    fn calculation_is_deterministic(
        usage in meter_strategy(),
        expected_yield in yield_strategy(),
        cost in cost_strategy(),
        percent in proptest::option::of(percent_strategy()),
        toner in any::<bool>(),
    ) {
        let part_type = if toner { PartType::Toner } else { PartType::General };
        prop_assert_eq!(
            calculate(part_type, usage, expected_yield, cost, percent),
            calculate(part_type, usage, expected_yield, cost, percent)
        );
    }
}

// Property: billing periods
proptest! {
    #[test]
    fn previous_period_is_one_month_back(year in 2000i32..2100, month in 1i32..=12) {
        let period = BillingPeriod::new(year, month).unwrap();
        let previous = period.previous();
        prop_assert_eq!((previous.year * 12 + previous.month) + 1, year * 12 + month);
    }
}
