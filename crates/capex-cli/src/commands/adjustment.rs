use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use capex_core::adjustment::{
    apply_global_step, enforce_minimum_share, AdjustmentDirection, StepOutcome,
};
use capex_core::sections::{build_direct_items, DirectItemSeed};
use capex_core::settings::{AdjustmentSettings, DefaultSplit};
use capex_core::types::{CostComponents, Rate, MAX_MONEY};

use crate::input;

/// One adjustment round over a list of direct items.
#[derive(Deserialize)]
struct AdjustInput {
    items: Vec<DirectItemSeed>,
    /// Cumulative adjustment carried from earlier rounds, per item.
    #[serde(default)]
    trackers: Vec<Rate>,
    #[serde(default)]
    direction: Option<AdjustmentDirection>,
    /// `(total - target) / target`; used when no direction is given.
    #[serde(default)]
    gap: Option<Rate>,
    #[serde(default)]
    settings: AdjustmentSettings,
}

/// Arguments for a single global adjustment step
#[derive(Args)]
pub struct AdjustArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_adjust(args: AdjustArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let adjust_input: AdjustInput = input::stdin::read_input(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for adjust")?;
    if adjust_input.items.is_empty() {
        return Err("at least one item is required".into());
    }
    adjust_input.settings.validate()?;
    for (i, item) in adjust_input.items.iter().enumerate() {
        let c = item.components();
        for value in [c.construction, c.equipment, c.installation, c.other] {
            if value < Decimal::ZERO || value > MAX_MONEY {
                return Err(format!("items[{i}]: costs must be in [0, {MAX_MONEY}]").into());
            }
        }
    }

    let direction = match (adjust_input.direction, adjust_input.gap) {
        (Some(d), _) => d,
        (None, Some(gap)) => AdjustmentDirection::from_gap(gap)
            .ok_or("gap is zero; nothing to adjust")?,
        (None, None) => return Err("either direction or gap is required".into()),
    };

    let (items, _) = build_direct_items(
        Some(&adjust_input.items),
        CostComponents::default(),
        None,
        &DefaultSplit::default(),
    )?;
    let stepped = apply_global_step(
        &items,
        &adjust_input.trackers,
        direction,
        &adjust_input.settings,
    );
    let result = StepOutcome {
        items: enforce_minimum_share(&stepped.items, adjust_input.settings.min_share),
        ..stepped
    };
    Ok(serde_json::to_value(result)?)
}
