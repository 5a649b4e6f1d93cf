use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::iteration::{solve_fixed_point, IterationLimits};
use crate::types::{Money, Rate};

/// Tolerance 1e-4 on both loan and interest, at most 100 rounds.
pub const CONVERGENCE_LIMITS: IterationLimits = IterationLimits::new(dec!(0.0001), 100);

/// How the construction loan is sized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum LoanBasis {
    /// Caller-fixed amount; no iteration needed.
    Fixed(Money),
    /// Share of the total investment, which itself includes the interest.
    Ratio(Rate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergedInvestment {
    pub building_investment: Money,
    pub construction_interest: Money,
    pub total_investment: Money,
    pub loan_amount: Money,
    pub iterations: u32,
    pub converged: bool,
    /// Largest move of loan or interest in the final round; zero for a fixed
    /// loan.
    pub last_delta: Decimal,
    /// `|total - building| / building`, zero for a non-positive building
    /// investment.
    pub gap_rate: Rate,
}

/// `rate * (years + 1) / 2`: interest per unit of loan over the build.
pub fn interest_factor(annual_rate: Rate, construction_years: u32) -> Decimal {
    annual_rate * (Decimal::from(construction_years) + Decimal::ONE) / dec!(2)
}

/// Whether `loan = (building + loan * factor) * ratio` has a finite solution
/// the iteration reaches: `ratio * factor < 1`.
pub fn contracts(ratio: Rate, factor: Decimal) -> bool {
    ratio
        .checked_mul(factor)
        .map(|q| q < Decimal::ONE)
        .unwrap_or(false)
}

pub fn gap_rate(total: Money, building: Money) -> Rate {
    if building <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (total - building).abs() / building
}

/// Resolve total investment against the interest on a loan sized from it.
pub fn converge_investment(
    building_investment: Money,
    basis: LoanBasis,
    annual_rate: Rate,
    construction_years: u32,
    limits: IterationLimits,
) -> ConvergedInvestment {
    let factor = interest_factor(annual_rate, construction_years);

    let (loan, interest, iterations, converged, last_delta) = match basis {
        LoanBasis::Fixed(loan) => (loan, loan * factor, 0, true, Decimal::ZERO),
        LoanBasis::Ratio(ratio) if !contracts(ratio, factor) => {
            log::warn!(
                "loan ratio {ratio} with interest factor {factor} has no finite total; loan not sized"
            );
            (Decimal::ZERO, Decimal::ZERO, 0, false, Decimal::MAX)
        }
        LoanBasis::Ratio(ratio) => {
            // state = (loan, interest)
            let solved = solve_fixed_point(
                (Decimal::ZERO, Decimal::ZERO),
                limits,
                |(loan, _)| {
                    let interest = *loan * factor;
                    ((building_investment + interest) * ratio, interest)
                },
                |(l1, i1), (l0, i0)| (*l1 - *l0).abs().max((*i1 - *i0).abs()),
            );
            if solved.converged {
                log::debug!(
                    "loan converged after {} iterations (delta {})",
                    solved.iterations,
                    solved.last_delta
                );
            } else {
                log::warn!(
                    "loan/interest did not converge after {} iterations (delta {})",
                    solved.iterations,
                    solved.last_delta
                );
            }
            let (loan, interest) = solved.value;
            (loan, interest, solved.iterations, solved.converged, solved.last_delta)
        }
    };

    let total = building_investment + interest;
    ConvergedInvestment {
        building_investment,
        construction_interest: interest,
        total_investment: total,
        loan_amount: loan,
        iterations,
        converged,
        last_delta,
        gap_rate: gap_rate(total, building_investment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Decimal = dec!(0.001);

    #[test]
    fn test_fixed_loan_single_pass() {
        let out = converge_investment(dec!(10000), LoanBasis::Fixed(dec!(4000)), dec!(0.049), 3, CONVERGENCE_LIMITS);
        // 4000 * 0.049 * 2
        assert_eq!(out.construction_interest, dec!(392));
        assert_eq!(out.total_investment, dec!(10392));
        assert_eq!(out.iterations, 0);
        assert!(out.converged);
    }

    #[test]
    fn test_zero_fixed_loan() {
        let out = converge_investment(dec!(10000), LoanBasis::Fixed(Decimal::ZERO), dec!(0.049), 3, CONVERGENCE_LIMITS);
        assert_eq!(out.total_investment, dec!(10000));
        assert_eq!(out.gap_rate, Decimal::ZERO);
    }

    #[test]
    fn test_ratio_loan_closed_form() {
        let out = converge_investment(dec!(10000), LoanBasis::Ratio(dec!(0.7)), dec!(0.049), 3, CONVERGENCE_LIMITS);
        // T = B / (1 - 0.7 * 0.098)
        let expected = dec!(10000) / (Decimal::ONE - dec!(0.0686));
        assert!(out.converged);
        assert!((out.total_investment - expected).abs() < TOL);
        assert!((out.loan_amount - expected * dec!(0.7)).abs() < TOL);
        assert!(out.iterations > 1 && out.iterations < 100);
    }

    #[test]
    fn test_ratio_loan_zero_building() {
        let out = converge_investment(Decimal::ZERO, LoanBasis::Ratio(dec!(0.7)), dec!(0.049), 3, CONVERGENCE_LIMITS);
        assert_eq!(out.total_investment, Decimal::ZERO);
        assert_eq!(out.gap_rate, Decimal::ZERO);
        assert_eq!(out.iterations, 1);
    }

    #[test]
    fn test_gap_rate() {
        assert_eq!(gap_rate(dec!(110), dec!(100)), dec!(0.1));
        assert_eq!(gap_rate(dec!(110), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_interest_factor_at_largest_year_count() {
        let factor = interest_factor(dec!(0.05), u32::MAX);
        assert_eq!(factor, dec!(0.05) * dec!(4294967296) / dec!(2));
    }

    #[test]
    fn test_non_contracting_ratio_is_reported() {
        // 0.9 * (0.5 * 11 / 2) > 1
        let out = converge_investment(
            dec!(10000),
            LoanBasis::Ratio(dec!(0.9)),
            dec!(0.5),
            10,
            CONVERGENCE_LIMITS,
        );
        assert!(!out.converged);
        assert_eq!(out.iterations, 0);
        assert_eq!(out.total_investment, dec!(10000));
        assert!(contracts(dec!(0.7), dec!(0.098)));
        assert!(!contracts(dec!(0.9), dec!(2.75)));
    }
}
