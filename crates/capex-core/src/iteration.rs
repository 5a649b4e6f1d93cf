use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CapexError;
use crate::CapexResult;

/// Upper bound on any configurable iteration or round cap.
pub const MAX_ITERATION_CAP: u32 = 1000;

/// Tolerance / iteration-cap pair for a fixed-point solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationLimits {
    /// Stop once successive iterates are strictly closer than this.
    pub tolerance: Decimal,
    pub max_iterations: u32,
}

impl IterationLimits {
    pub const fn new(tolerance: Decimal, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

/// Outcome of a fixed-point solve.
///
/// Hitting the cap is not an error: `value` holds the last iterate and
/// `converged` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPoint<S> {
    pub value: S,
    /// Number of step evaluations performed, including the converging one.
    pub iterations: u32,
    pub converged: bool,
    /// Distance between the last two iterates (`Decimal::MAX` if no step ran).
    pub last_delta: Decimal,
}

impl<S> FixedPoint<S> {
    /// Turn a capped run into `CapexError::ConvergenceFailure`.
    pub fn into_result(self, function: &str) -> CapexResult<S> {
        if self.converged {
            Ok(self.value)
        } else {
            Err(CapexError::ConvergenceFailure {
                function: function.to_string(),
                iterations: self.iterations,
                last_delta: self.last_delta,
            })
        }
    }
}

/// Iterate `step` from `initial` until `distance(next, current) < tolerance`
/// or the iteration cap is reached.
///
/// Both circular dependencies in the estimate (a fee inside its own base and
/// a loan inside its own total) are contractions, so this converges for any
/// realistic input; it never fails, it only reports.
pub fn solve_fixed_point<S, F, D>(
    initial: S,
    limits: IterationLimits,
    mut step: F,
    distance: D,
) -> FixedPoint<S>
where
    F: FnMut(&S) -> S,
    D: Fn(&S, &S) -> Decimal,
{
    let mut current = initial;
    let mut last_delta = Decimal::MAX;

    for i in 1..=limits.max_iterations {
        let next = step(&current);
        last_delta = distance(&next, &current);
        current = next;

        if last_delta < limits.tolerance {
            return FixedPoint {
                value: current,
                iterations: i,
                converged: true,
                last_delta,
            };
        }
    }

    FixedPoint {
        value: current,
        iterations: limits.max_iterations,
        converged: false,
        last_delta,
    }
}

/// `solve_fixed_point` specialised to a single Decimal with absolute distance.
pub fn solve_scalar<F>(initial: Decimal, limits: IterationLimits, step: F) -> FixedPoint<Decimal>
where
    F: FnMut(&Decimal) -> Decimal,
{
    solve_fixed_point(initial, limits, step, |a, b| (*a - *b).abs())
}
