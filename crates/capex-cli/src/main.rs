mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use env_logger::Env;
use std::process;

use commands::adjustment::AdjustArgs;
use commands::estimate::{EstimateArgs, QuickArgs};
use commands::fees::{FeeArgs, ManagementFeeArgs};
use commands::financing::LoanScheduleArgs;

/// Construction capital investment estimation
#[derive(Parser)]
#[command(
    name = "capex",
    version,
    about = "Construction capital investment estimation",
    long_about = "A CLI for estimating the total capital investment of construction \
                  projects with decimal precision. Builds the sectioned cost table, \
                  statutory fee schedules, construction-period interest and the \
                  loan drawdown schedule, optionally adjusted towards a target total."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Full sectioned estimate (A-G) with converged funding and interest
    Estimate(EstimateArgs),
    /// Flat estimate from raw costs and reserve rates
    Quick(QuickArgs),
    /// Evaluate a standard fee table at one amount
    Fee(FeeArgs),
    /// Solve the management fee contained in its own funding base
    ManagementFee(ManagementFeeArgs),
    /// Front-loaded loan drawdown and interest by construction year
    LoanSchedule(LoanScheduleArgs),
    /// Apply one proportional adjustment step to direct items
    Adjust(AdjustArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Estimate(args) => commands::estimate::run_estimate(args),
        Commands::Quick(args) => commands::estimate::run_quick(args),
        Commands::Fee(args) => commands::fees::run_fee(args),
        Commands::ManagementFee(args) => commands::fees::run_management_fee(args),
        Commands::LoanSchedule(args) => commands::financing::run_loan_schedule(args),
        Commands::Adjust(args) => commands::adjustment::run_adjust(args),
        Commands::Version => {
            println!("capex {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
