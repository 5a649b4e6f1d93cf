use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use capex_core::fees::{solve_circular_fee, StandardTable};
use capex_core::settings::EngineSettings;
use capex_core::MAX_MONEY;

use crate::input;

/// Arguments for evaluating one standard fee table
#[derive(Args)]
pub struct FeeArgs {
    /// Table name, e.g. management, supervision, bidding-works
    #[arg(long)]
    pub table: Option<String>,

    /// Base amount the fee is charged on
    #[arg(long)]
    pub value: Option<Decimal>,

    /// List the available tables with their brackets
    #[arg(long)]
    pub list: bool,
}

pub fn run_fee(args: FeeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.list {
        let tables: Vec<Value> = StandardTable::ALL
            .iter()
            .map(|t| {
                let schedule = t.schedule();
                json!({
                    "table": t.name(),
                    "kind": schedule.kind,
                    "brackets": schedule.brackets,
                })
            })
            .collect();
        return Ok(Value::Array(tables));
    }

    let table: StandardTable = args
        .table
        .as_deref()
        .ok_or("--table is required (or pass --list)")?
        .parse()?;
    let value = args.value.ok_or("--value is required")?;
    if value < Decimal::ZERO || value > MAX_MONEY {
        return Err(format!("--value must be in [0, {MAX_MONEY}]").into());
    }

    let schedule = table.schedule();
    Ok(json!({
        "table": table.name(),
        "kind": schedule.kind,
        "value": value,
        "fee": schedule.evaluate(value),
    }))
}

/// Arguments for the self-referential management fee
#[derive(Args)]
pub struct ManagementFeeArgs {
    /// Total funding the fee is contained in
    #[arg(long)]
    pub total_funding: Decimal,

    /// Land cost excluded from the fee base
    #[arg(long, default_value = "0")]
    pub land_cost: Decimal,

    /// Engine settings file (JSON or YAML) for the iteration limits
    #[arg(long)]
    pub settings: Option<String>,
}

pub fn run_management_fee(args: ManagementFeeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    for (flag, value) in [("--total-funding", args.total_funding), ("--land-cost", args.land_cost)] {
        if value < Decimal::ZERO || value > MAX_MONEY {
            return Err(format!("{flag} must be in [0, {MAX_MONEY}]").into());
        }
    }
    let settings = match args.settings {
        Some(ref path) => input::file::read_settings(path)?,
        None => EngineSettings::default(),
    };

    let result = solve_circular_fee(
        args.total_funding,
        args.land_cost,
        &StandardTable::Management.schedule(),
        settings.circular_fee,
    );
    Ok(serde_json::to_value(result)?)
}
