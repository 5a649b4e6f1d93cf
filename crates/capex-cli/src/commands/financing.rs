use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use capex_core::financing::{self, LoanScheduleInput};

use crate::input;

/// Arguments for the construction-period loan schedule
#[derive(Args)]
pub struct LoanScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal drawn over the construction period
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Annual interest rate
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Construction period in years
    #[arg(long)]
    pub years: Option<u32>,

    /// Round the principal down to the drawdown grid first
    #[arg(long)]
    pub round: bool,
}

pub fn run_loan_schedule(args: LoanScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: LoanScheduleInput =
        match input::stdin::read_input(args.input.as_deref())? {
            Some(parsed) => parsed,
            None => LoanScheduleInput {
                loan_amount: args
                    .loan_amount
                    .ok_or("--loan-amount is required (or provide --input)")?,
                annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
                construction_years: args
                    .years
                    .ok_or("--years is required (or provide --input)")?,
                round_amount: args.round,
            },
        };

    let result = financing::loan_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}
