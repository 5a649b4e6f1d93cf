use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::schedule::FeeSchedule;
use crate::iteration::{solve_scalar, IterationLimits};
use crate::types::Money;

/// Tolerance 0.01, at most 10 rounds.
pub const CIRCULAR_FEE_LIMITS: IterationLimits = IterationLimits::new(dec!(0.01), 10);

/// A fee that is part of its own base, resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularFee {
    pub fee: Money,
    /// `total_funding - land_cost - fee` at the final iterate.
    pub base: Money,
    pub iterations: u32,
    pub converged: bool,
    pub last_delta: Decimal,
}

/// Resolve `fee = schedule(total_funding - land_cost - fee)` starting from a
/// zero fee.
///
/// The cap is a hard stop: the last iterate is returned with
/// `converged = false`.
pub fn solve_circular_fee(
    total_funding: Money,
    land_cost: Money,
    schedule: &FeeSchedule,
    limits: IterationLimits,
) -> CircularFee {
    let base_of = |fee: Decimal| total_funding - land_cost - fee;

    let solved = solve_scalar(Decimal::ZERO, limits, |fee| {
        schedule.evaluate(base_of(*fee))
    });

    if !solved.converged {
        log::warn!(
            "circular fee did not settle after {} iterations (delta {})",
            solved.iterations,
            solved.last_delta
        );
    }

    CircularFee {
        fee: solved.value,
        base: base_of(solved.value),
        iterations: solved.iterations,
        converged: solved.converged,
        last_delta: solved.last_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::tables::StandardTable;

    #[test]
    fn test_management_fee_on_10000() {
        let schedule = StandardTable::Management.schedule();
        let out = solve_circular_fee(dec!(10000), Decimal::ZERO, &schedule, CIRCULAR_FEE_LIMITS);
        assert!(out.converged);
        assert!(out.iterations <= 4);
        assert!((out.fee - dec!(138.34)).abs() < dec!(0.01));
        assert!((out.base - dec!(9861.66)).abs() < dec!(0.01));
    }

    #[test]
    fn test_land_is_excluded_from_base() {
        let schedule = StandardTable::Management.schedule();
        let with_land = solve_circular_fee(dec!(11000), dec!(1000), &schedule, CIRCULAR_FEE_LIMITS);
        let without = solve_circular_fee(dec!(10000), Decimal::ZERO, &schedule, CIRCULAR_FEE_LIMITS);
        assert_eq!(with_land.fee, without.fee);
    }

    #[test]
    fn test_non_positive_base_gives_zero_fee() {
        let schedule = StandardTable::Management.schedule();
        let out = solve_circular_fee(dec!(500), dec!(800), &schedule, CIRCULAR_FEE_LIMITS);
        assert_eq!(out.fee, Decimal::ZERO);
        assert!(out.converged);
        assert_eq!(out.iterations, 1);
    }

    #[test]
    fn test_cap_reports_non_convergence() {
        let schedule = StandardTable::Management.schedule();
        let tight = IterationLimits::new(dec!(0.0000001), 2);
        let out = solve_circular_fee(dec!(10000), Decimal::ZERO, &schedule, tight);
        assert!(!out.converged);
        assert_eq!(out.iterations, 2);
        assert_eq!(out.fee, dec!(138.32));
    }
}
