//! Yield compliance and shortfall billing for a single part replacement.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::PartType;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Billing outcome of one replacement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct YieldCalculation {
    pub usage: i64,
    pub expected_yield: i64,
    pub yield_met: bool,
    pub shortfall_clicks: i64,
    /// Clicks forgiven because toner was returned unused. Zero for general parts.
    pub deduction: Decimal,
    pub adjusted_shortfall_clicks: i64,
    pub cost_per_click: Decimal,
    pub display_charge_rand: Decimal,
    pub remaining_toner_percent: Option<Decimal>,
}

/// Clicks consumed since the previous replacement of the same part. Never negative.
pub fn replacement_usage(current_reading: i64, prior_reading: i64) -> i64 {
    (current_reading - prior_reading).max(0)
}

fn cost_per_click(expected_yield: i64, cost_rand: Decimal) -> Decimal {
    if expected_yield > 0 {
        cost_rand / Decimal::from(expected_yield)
    } else {
        Decimal::ZERO
    }
}

fn shortfall(usage: i64, expected_yield: i64) -> (bool, i64) {
    let yield_met = usage >= expected_yield;
    let shortfall_clicks = if yield_met { 0 } else { expected_yield - usage };
    (yield_met, shortfall_clicks)
}

/// Exact product; rounding to cents is left to whoever displays it.
fn charge(adjusted_shortfall_clicks: i64, cost_per_click: Decimal) -> Decimal {
    Decimal::from(adjusted_shortfall_clicks) * cost_per_click
}

/// Drums, fusers and other parts without a remaining-life signal: billed on raw shortfall.
pub fn calc_general(usage: i64, expected_yield: i64, cost_rand: Decimal) -> YieldCalculation {
    let (yield_met, shortfall_clicks) = shortfall(usage, expected_yield);
    let cost_per_click = cost_per_click(expected_yield, cost_rand);

    YieldCalculation {
        usage,
        expected_yield,
        yield_met,
        shortfall_clicks,
        deduction: Decimal::ZERO,
        adjusted_shortfall_clicks: shortfall_clicks,
        cost_per_click,
        display_charge_rand: charge(shortfall_clicks, cost_per_click),
        remaining_toner_percent: None,
    }
}

/// Toner: the shortfall is reduced in proportion to the toner left in the
/// returned cartridge. `remaining_toner_percent` is clamped to `0..=100` and a
/// missing value counts as an empty cartridge.
pub fn calc_toner(
    usage: i64,
    expected_yield: i64,
    cost_rand: Decimal,
    remaining_toner_percent: Option<Decimal>,
) -> YieldCalculation {
    let (yield_met, shortfall_clicks) = shortfall(usage, expected_yield);
    let cost_per_click = cost_per_click(expected_yield, cost_rand);

    let remaining = remaining_toner_percent
        .unwrap_or(Decimal::ZERO)
        .clamp(Decimal::ZERO, HUNDRED);
    let shortfall = Decimal::from(shortfall_clicks);
    let deduction = shortfall * remaining / HUNDRED;
    let adjusted_shortfall_clicks = (shortfall - deduction)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ZERO)
        .to_i64()
        .unwrap_or(0);

    YieldCalculation {
        usage,
        expected_yield,
        yield_met,
        shortfall_clicks,
        deduction,
        adjusted_shortfall_clicks,
        cost_per_click,
        display_charge_rand: charge(adjusted_shortfall_clicks, cost_per_click),
        remaining_toner_percent: remaining_toner_percent.map(|_| remaining),
    }
}

/// Dispatches on the part type.
pub fn calculate(
    part_type: PartType,
    usage: i64,
    expected_yield: i64,
    cost_rand: Decimal,
    remaining_toner_percent: Option<Decimal>,
) -> YieldCalculation {
    match part_type {
        PartType::General => calc_general(usage, expected_yield, cost_rand),
        PartType::Toner => calc_toner(usage, expected_yield, cost_rand, remaining_toner_percent),
    }
}

/// `round(usage / expected_yield * 100)`, or 0 for a non-positive yield.
pub fn percent_used(usage: i64, expected_yield: i64) -> i64 {
    if expected_yield <= 0 {
        return 0;
    }
    (Decimal::from(usage) * HUNDRED / Decimal::from(expected_yield))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}
