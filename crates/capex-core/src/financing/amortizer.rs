use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CapexError;
use crate::types::*;
use crate::CapexResult;

/// Loans at or above this many underlying units round to the coarse step.
const COARSE_ROUNDING_THRESHOLD: Decimal = dec!(100000000);
const COARSE_ROUNDING_STEP: Decimal = dec!(10000000);
const FINE_ROUNDING_STEP: Decimal = dec!(1000000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One construction year of the drawdown schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanYearRecord {
    pub year: u32,
    /// Principal drawn in all previous years.
    pub opening_principal: Money,
    pub drawdown: Money,
    pub interest: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub loan_total: Money,
    pub annual_rate: Rate,
    pub construction_years: u32,
    pub years: Vec<LoanYearRecord>,
    pub total_interest: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanScheduleInput {
    pub loan_amount: Money,
    pub annual_rate: Rate,
    pub construction_years: u32,
    /// Round `loan_amount` to the drawdown increment before scheduling.
    #[serde(default)]
    pub round_amount: bool,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Floor a base-unit loan amount to the lending increment.
///
/// In underlying units: 10,000,000 steps from 100,000,000 up, 1,000,000 steps
/// below. Non-positive amounts round to zero.
pub fn round_loan_amount(amount: Money) -> Money {
    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // Threshold and steps in base units.
    let step = if amount >= from_underlying_units(COARSE_ROUNDING_THRESHOLD) {
        from_underlying_units(COARSE_ROUNDING_STEP)
    } else {
        from_underlying_units(FINE_ROUNDING_STEP)
    };
    (amount / step).floor() * step
}

/// Equal rounded draws for every year but the last, which takes the exact
/// remainder.
pub fn distribute_front_loaded(loan_total: Money, years: u32) -> Vec<Money> {
    match years {
        0 => Vec::new(),
        1 => vec![loan_total],
        n => {
            let per_year = round_loan_amount(loan_total / Decimal::from(n));
            let mut draws = vec![per_year; (n - 1) as usize];
            draws.push(loan_total - per_year * Decimal::from(n - 1));
            draws
        }
    }
}

/// Simple interest for one year: the opening principal for the whole year
/// and the new draw for half of it.
pub fn accrue_interest(opening_principal: Money, drawdown: Money, annual_rate: Rate) -> Money {
    (opening_principal + drawdown / dec!(2)) * annual_rate
}

pub fn build_loan_schedule(loan_total: Money, annual_rate: Rate, construction_years: u32) -> LoanSchedule {
    let mut opening = Decimal::ZERO;
    let mut total_interest = Decimal::ZERO;

    let years: Vec<LoanYearRecord> = distribute_front_loaded(loan_total, construction_years)
        .into_iter()
        .enumerate()
        .map(|(i, drawdown)| {
            let interest = accrue_interest(opening, drawdown, annual_rate);
            let record = LoanYearRecord {
                year: i as u32 + 1,
                opening_principal: opening,
                drawdown,
                interest,
            };
            opening += drawdown;
            total_interest += interest;
            record
        })
        .collect();

    LoanSchedule {
        loan_total,
        annual_rate,
        construction_years,
        years,
        total_interest,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Validated drawdown schedule wrapped in the output envelope.
pub fn loan_schedule(input: &LoanScheduleInput) -> CapexResult<ComputationOutput<LoanSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.loan_amount < Decimal::ZERO {
        return Err(CapexError::InvalidInput {
            field: "loan_amount".into(),
            reason: "Loan amount cannot be negative".into(),
        });
    }
    if input.loan_amount > MAX_MONEY {
        return Err(CapexError::InvalidInput {
            field: "loan_amount".into(),
            reason: format!("Loan amount cannot exceed {MAX_MONEY}"),
        });
    }
    if input.annual_rate < Decimal::ZERO || input.annual_rate > MAX_RATE {
        return Err(CapexError::InvalidInput {
            field: "annual_rate".into(),
            reason: format!("Interest rate must be in [0, {MAX_RATE}]"),
        });
    }
    if input.construction_years > MAX_CONSTRUCTION_YEARS {
        return Err(CapexError::InvalidInput {
            field: "construction_years".into(),
            reason: format!("Construction period cannot exceed {MAX_CONSTRUCTION_YEARS} years"),
        });
    }
    if input.construction_years == 0 {
        warnings.push("Zero construction years: no drawdowns scheduled".into());
    }

    let loan_total = if input.round_amount {
        round_loan_amount(input.loan_amount)
    } else {
        input.loan_amount
    };
    let schedule = build_loan_schedule(loan_total, input.annual_rate, input.construction_years);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Front-loaded construction drawdown, mid-year simple interest",
        &serde_json::json!({
            "loan_amount": input.loan_amount.to_string(),
            "annual_rate": input.annual_rate.to_string(),
            "construction_years": input.construction_years,
            "round_amount": input.round_amount,
        }),
        warnings,
        elapsed,
        schedule,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_fine_step() {
        // 13,333,300 units -> 13,000,000
        assert_eq!(round_loan_amount(dec!(1333.33)), dec!(1300));
    }

    #[test]
    fn test_round_coarse_step() {
        // 123,456,000 units -> 120,000,000
        assert_eq!(round_loan_amount(dec!(12345.6)), dec!(12000));
        assert_eq!(round_loan_amount(dec!(10000)), dec!(10000));
    }

    #[test]
    fn test_round_largest_amounts() {
        // 1,000-unit steps in the base unit above the threshold
        assert_eq!(round_loan_amount(dec!(1000000000000012345)), dec!(1000000000000012000));
        let top = round_loan_amount(Decimal::MAX);
        assert!(top > Decimal::ZERO && top <= Decimal::MAX);
    }

    #[test]
    fn test_round_non_positive() {
        assert_eq!(round_loan_amount(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(round_loan_amount(dec!(-50)), Decimal::ZERO);
    }

    #[test]
    fn test_distribute_reference_case() {
        assert_eq!(
            distribute_front_loaded(dec!(4000), 3),
            vec![dec!(1300), dec!(1300), dec!(1400)]
        );
    }

    #[test]
    fn test_distribute_degenerate_years() {
        assert!(distribute_front_loaded(dec!(4000), 0).is_empty());
        assert_eq!(distribute_front_loaded(dec!(4000), 1), vec![dec!(4000)]);
    }

    #[test]
    fn test_distribute_sums_to_total() {
        let draws = distribute_front_loaded(dec!(2750.5), 4);
        assert_eq!(draws.iter().copied().sum::<Decimal>(), dec!(2750.5));
    }

    #[test]
    fn test_schedule_reference_case() {
        let s = build_loan_schedule(dec!(4000), dec!(0.049), 3);
        let interest: Vec<Decimal> = s.years.iter().map(|y| y.interest).collect();
        assert_eq!(interest, vec![dec!(31.85), dec!(95.55), dec!(161.70)]);
        assert_eq!(s.total_interest, dec!(289.10));
        assert_eq!(s.years[2].opening_principal, dec!(2600));
    }

    #[test]
    fn test_entry_point_rounds_on_request() {
        let out = loan_schedule(&LoanScheduleInput {
            loan_amount: dec!(4012.7),
            annual_rate: dec!(0.049),
            construction_years: 3,
            round_amount: true,
        })
        .unwrap();
        assert_eq!(out.result.loan_total, dec!(4000));
    }

    #[test]
    fn test_entry_point_rejects_negative_rate() {
        let err = loan_schedule(&LoanScheduleInput {
            loan_amount: dec!(100),
            annual_rate: dec!(-0.01),
            construction_years: 2,
            round_amount: false,
        });
        assert!(matches!(err, Err(CapexError::InvalidInput { .. })));
    }
}
