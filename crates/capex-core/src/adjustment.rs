use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::sections::line_item::{sum_totals, CostLineItem};
use crate::settings::AdjustmentSettings;
use crate::types::{CostComponents, Rate};

/// Steps smaller than this are not applied.
const MIN_EFFECTIVE_STEP: Decimal = dec!(0.000001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
}

impl AdjustmentDirection {
    /// Direction that closes `gap = (total - target) / target`; `None` when
    /// there is nothing to close.
    pub fn from_gap(gap: Rate) -> Option<Self> {
        if gap > Decimal::ZERO {
            Some(AdjustmentDirection::Decrease)
        } else if gap < Decimal::ZERO {
            Some(AdjustmentDirection::Increase)
        } else {
            None
        }
    }

    fn signed(&self, step: Rate) -> Rate {
        match self {
            AdjustmentDirection::Increase => step,
            AdjustmentDirection::Decrease => -step,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub items: Vec<CostLineItem>,
    /// Cumulative adjustment per item after this step.
    pub trackers: Vec<Rate>,
    /// Whether any item moved.
    pub applied: bool,
}

/// Scale every item by one step in `direction`.
///
/// Each item's cumulative adjustment (`trackers[i]`, zero if missing) is kept
/// within `[-cap, cap]`; the step is shortened to fit and skipped once it
/// falls below 1e-6 or would make the multiplier non-positive.
pub fn apply_global_step(
    items: &[CostLineItem],
    trackers: &[Rate],
    direction: AdjustmentDirection,
    settings: &AdjustmentSettings,
) -> StepOutcome {
    let base_rate = direction.signed(settings.step);
    let mut applied = false;
    let mut next_trackers = Vec::with_capacity(items.len());

    let next_items = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let cumulative = trackers.get(i).copied().unwrap_or(Decimal::ZERO);
            let rate = (cumulative + base_rate).clamp(-settings.cap, settings.cap) - cumulative;
            let multiplier = Decimal::ONE + rate;

            if rate.abs() < MIN_EFFECTIVE_STEP || multiplier <= Decimal::ZERO {
                next_trackers.push(cumulative);
                return item.clone();
            }
            applied = true;
            next_trackers.push(cumulative + rate);
            item.scaled(multiplier)
        })
        .collect();

    StepOutcome {
        items: next_items,
        trackers: next_trackers,
        applied,
    }
}

/// Lift every item to at least `min_share` of the grand total, then rescale
/// uniformly so the grand total is unchanged.
///
/// Zero or negative items are re-seeded as pure construction cost at the
/// floor. Returns the input unchanged when the grand total is not positive or
/// every item already clears the floor.
pub fn enforce_minimum_share(items: &[CostLineItem], min_share: Rate) -> Vec<CostLineItem> {
    let grand_total = sum_totals(items);
    if grand_total <= Decimal::ZERO {
        return items.to_vec();
    }
    let floor = grand_total * min_share;

    let mut lifted = false;
    let raised: Vec<CostLineItem> = items
        .iter()
        .map(|item| {
            if item.total <= Decimal::ZERO {
                lifted = true;
                let mut seeded = CostLineItem::leaf(
                    item.id.clone(),
                    item.name.clone(),
                    CostComponents::new(floor, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
                );
                seeded.remark = item.remark.clone();
                seeded
            } else if item.total < floor {
                lifted = true;
                match floor.checked_div(item.total) {
                    Some(factor) => item.scaled(factor),
                    None => item.clone(),
                }
            } else {
                item.clone()
            }
        })
        .collect();

    if !lifted {
        return raised;
    }

    let new_total = sum_totals(&raised);
    match grand_total.checked_div(new_total) {
        Some(factor) if factor > Decimal::ZERO => raised.iter().map(|i| i.scaled(factor)).collect(),
        _ => raised,
    }
}
