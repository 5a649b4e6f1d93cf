use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use capex_core::estimate::{self, EstimateInput, EstimateOptions};
use capex_core::sections::ProjectType;
use capex_core::settings::EngineSettings;

use crate::input;

/// Cost, reserve and loan flags shared by `estimate` and `quick`.
#[derive(Args)]
pub struct CostArgs {
    /// Construction (building works) cost
    #[arg(long)]
    pub construction_cost: Option<Decimal>,

    /// Equipment purchase cost
    #[arg(long)]
    pub equipment_cost: Option<Decimal>,

    /// Installation cost
    #[arg(long)]
    pub installation_cost: Option<Decimal>,

    /// Other direct cost
    #[arg(long)]
    pub other_cost: Option<Decimal>,

    /// Land acquisition cost
    #[arg(long)]
    pub land_cost: Option<Decimal>,

    /// Basic reserve rate (default 0.08)
    #[arg(long)]
    pub basic_reserve_rate: Option<Decimal>,

    /// Price escalation reserve rate
    #[arg(long)]
    pub price_reserve_rate: Option<Decimal>,

    /// Construction period in years
    #[arg(long)]
    pub years: Option<u32>,

    /// Annual loan interest rate
    #[arg(long)]
    pub loan_rate: Option<Decimal>,

    /// Fixed loan principal (otherwise derived from the loan ratio)
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Agricultural project (waives municipal facility fees)
    #[arg(long)]
    pub agriculture: bool,
}

impl CostArgs {
    fn into_input(self) -> Result<EstimateInput, Box<dyn std::error::Error>> {
        let construction_years = self
            .years
            .ok_or("--years is required (or provide --input)")?;
        let loan_rate = self
            .loan_rate
            .ok_or("--loan-rate is required (or provide --input)")?;

        Ok(EstimateInput {
            construction_cost: self.construction_cost.unwrap_or_default(),
            equipment_cost: self.equipment_cost.unwrap_or_default(),
            installation_cost: self.installation_cost.unwrap_or_default(),
            other_cost: self.other_cost.unwrap_or_default(),
            land_cost: self.land_cost.unwrap_or_default(),
            basic_reserve_rate: self.basic_reserve_rate.unwrap_or(dec!(0.08)),
            price_reserve_rate: self.price_reserve_rate.unwrap_or_default(),
            construction_years,
            loan_rate,
            custom_loan_amount: self.loan_amount,
            direct_items: None,
            total_funding: None,
            target_investment: None,
            project_type: if self.agriculture {
                ProjectType::Agriculture
            } else {
                ProjectType::General
            },
            options: EstimateOptions::default(),
            settings: EngineSettings::default(),
        })
    }
}

/// Arguments for the full sectioned estimate
#[derive(Args)]
pub struct EstimateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Engine settings file (JSON or YAML)
    #[arg(long)]
    pub settings: Option<String>,

    #[command(flatten)]
    pub costs: CostArgs,

    /// Target total investment to adjust the direct items towards
    #[arg(long)]
    pub target_investment: Option<Decimal>,

    /// Known total funding (seeds the management fee base)
    #[arg(long)]
    pub total_funding: Option<Decimal>,

    /// Omit the A-G section tree from the output
    #[arg(long)]
    pub no_breakdown: bool,

    /// Omit the year-by-year loan schedule
    #[arg(long)]
    pub no_schedule: bool,

    /// Fail instead of warning when a solver hits its iteration cap
    #[arg(long)]
    pub strict: bool,
}

pub fn run_estimate(args: EstimateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut estimate_input: EstimateInput =
        match input::stdin::read_input(args.input.as_deref())? {
            Some(parsed) => parsed,
            None => {
                let mut built = args.costs.into_input()?;
                built.target_investment = args.target_investment;
                built.total_funding = args.total_funding;
                built.options = EstimateOptions {
                    include_breakdown: !args.no_breakdown,
                    include_schedule: !args.no_schedule,
                    strict_convergence: args.strict,
                    ..EstimateOptions::default()
                };
                built
            }
        };
    if let Some(ref path) = args.settings {
        estimate_input.settings = input::file::read_settings(path)?;
    }

    let result = estimate::estimate_investment(&estimate_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the flat quick estimate
#[derive(Args)]
pub struct QuickArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Engine settings file (JSON or YAML)
    #[arg(long)]
    pub settings: Option<String>,

    #[command(flatten)]
    pub costs: CostArgs,
}

pub fn run_quick(args: QuickArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut estimate_input: EstimateInput =
        match input::stdin::read_input(args.input.as_deref())? {
            Some(parsed) => parsed,
            None => args.costs.into_input()?,
        };
    if let Some(ref path) = args.settings {
        estimate_input.settings = input::file::read_settings(path)?;
    }

    let result = estimate::estimate_flat(&estimate_input)?;
    Ok(serde_json::to_value(result)?)
}
