use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One `(threshold, value)` pair of a fee table.
///
/// For a progressive schedule `threshold` is the lower bound of a tier and
/// `value` its marginal rate. For an interpolated schedule `threshold` is an
/// anchor point and `value` the base fee at that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBracket {
    pub threshold: Money,
    pub value: Decimal,
}

impl RateBracket {
    pub const fn new(threshold: Money, value: Decimal) -> Self {
        Self { threshold, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Cumulative marginal-rate tiers.
    Progressive,
    /// Piecewise-linear anchor table.
    Interpolated,
}

/// A fee table together with the rule used to read it.
///
/// Thresholds must be strictly increasing; this is the caller's contract and
/// is not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub kind: ScheduleKind,
    pub brackets: Vec<RateBracket>,
}

impl FeeSchedule {
    pub fn progressive(brackets: &[RateBracket]) -> Self {
        Self {
            kind: ScheduleKind::Progressive,
            brackets: brackets.to_vec(),
        }
    }

    pub fn interpolated(brackets: &[RateBracket]) -> Self {
        Self {
            kind: ScheduleKind::Interpolated,
            brackets: brackets.to_vec(),
        }
    }

    pub fn evaluate(&self, value: Money) -> Money {
        match self.kind {
            ScheduleKind::Progressive => progressive_fee(value, &self.brackets),
            ScheduleKind::Interpolated => interpolated_fee(value, &self.brackets),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Fee under a cumulative progressive schedule.
///
/// Each tier `[t_i, t_{i+1})` is charged at its own rate; the last tier is
/// open-ended. Portions of `value` below the first threshold are free.
pub fn progressive_fee(value: Money, tiers: &[RateBracket]) -> Money {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut fee = Decimal::ZERO;
    for (i, tier) in tiers.iter().enumerate() {
        if value <= tier.threshold {
            break;
        }
        let upper = tiers
            .get(i + 1)
            .map(|next| next.threshold.min(value))
            .unwrap_or(value);
        let width = (upper - tier.threshold).max(Decimal::ZERO);
        fee += width * tier.value;
    }
    fee
}

/// Fee read off a piecewise-linear anchor table.
///
/// Below the first anchor the fee is proportional to that anchor's ratio;
/// above the last it extrapolates along the slope of the last two anchors.
pub fn interpolated_fee(value: Money, anchors: &[RateBracket]) -> Money {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let Some(first) = anchors.first() else {
        return Decimal::ZERO;
    };

    if value < first.threshold || anchors.len() == 1 {
        return first.value * ratio(value, first.threshold);
    }

    for pair in anchors.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if value >= lower.threshold && value <= upper.threshold {
            return lower.value + (value - lower.threshold) * slope(lower, upper);
        }
    }

    // Beyond the last anchor.
    let last = anchors[anchors.len() - 1];
    let second_last = anchors[anchors.len() - 2];
    last.value + (value - last.threshold) * slope(second_last, last)
}

fn slope(lower: RateBracket, upper: RateBracket) -> Rate {
    (upper.value - lower.value)
        .checked_div(upper.threshold - lower.threshold)
        .unwrap_or(Decimal::ZERO)
}

fn ratio(numerator: Money, denominator: Money) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}
