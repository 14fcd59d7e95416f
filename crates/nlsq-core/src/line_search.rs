//! Scalar line search along a fixed direction.
//!
//! The trust-region minimizer uses a line search only for constrained
//! problems: after the strategy proposes a step `delta`, the search finds
//! a multiplier `α` along `delta` satisfying a sufficient-decrease
//! condition, and `delta` is rescaled by it. The search sees the problem
//! only through [`LineSearchObjective`], a one-dimensional restriction
//! `φ(α) = cost(Plus(x, α·delta))`.
//!
//! The Armijo (backtracking) condition accepted here is
//! `φ(α) ≤ φ(0) + c₁ α φ'(0)` with `0 < c₁ < 1`.

use crate::error::{SolverError, SolverResult};
use crate::types::Scalar;
use num_traits::Float;
use std::fmt::Debug;

/// One-dimensional restriction of the objective along a search direction.
///
/// `evaluate` returns `None` when the underlying cost evaluation fails at
/// the probed point; the search treats such a step length as
/// unacceptable and keeps contracting.
pub trait LineSearchObjective<T: Scalar> {
    /// Evaluates `φ(step_size)`.
    fn evaluate(&mut self, step_size: T) -> Option<T>;
}

impl<T: Scalar, F: FnMut(T) -> Option<T>> LineSearchObjective<T> for F {
    fn evaluate(&mut self, step_size: T) -> Option<T> {
        self(step_size)
    }
}

/// Parameters for line search algorithms.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// Sufficient decrease constant c₁ ∈ (0, 1).
    pub sufficient_decrease: T,

    /// Step length contraction factor ρ ∈ (0, 1).
    pub contraction_factor: T,

    /// Step lengths below this threshold fail the search.
    pub min_step_size: T,

    /// Maximum number of step lengths to try.
    pub max_iterations: usize,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            sufficient_decrease: <T as Scalar>::from_f64(1e-4),
            contraction_factor: <T as Scalar>::from_f64(0.5),
            min_step_size: <T as Scalar>::from_f64(1e-9),
            max_iterations: 20,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Validates parameters against their documented constraints.
    pub fn validate(&self) -> SolverResult<()> {
        if self.sufficient_decrease <= T::zero() || self.sufficient_decrease >= T::one() {
            return Err(SolverError::invalid_configuration(
                "must be in (0, 1)",
                "sufficient_decrease",
                format!("{}", self.sufficient_decrease),
            ));
        }

        if self.contraction_factor <= T::zero() || self.contraction_factor >= T::one() {
            return Err(SolverError::invalid_configuration(
                "must be in (0, 1)",
                "contraction_factor",
                format!("{}", self.contraction_factor),
            ));
        }

        if self.min_step_size <= T::zero() {
            return Err(SolverError::invalid_configuration(
                "must be positive",
                "min_step_size",
                format!("{}", self.min_step_size),
            ));
        }

        if self.max_iterations == 0 {
            return Err(SolverError::invalid_configuration(
                "must be at least 1",
                "max_iterations",
                "0",
            ));
        }

        Ok(())
    }
}

/// Result of a line search.
#[derive(Debug, Clone)]
pub struct LineSearchSummary<T: Scalar> {
    /// Accepted step length multiplier.
    pub step_size: T,

    /// Objective value at the accepted step length.
    pub value: T,

    /// Number of step lengths tried.
    pub num_iterations: usize,
}

/// Interface for scalar line search algorithms.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches for a step length starting at `initial_step_size`.
    ///
    /// `initial_value` is `φ(0)` and `directional_derivative` is `φ'(0)`,
    /// which must be negative (descent direction).
    fn search(
        &mut self,
        objective: &mut dyn LineSearchObjective<T>,
        initial_step_size: T,
        initial_value: T,
        directional_derivative: T,
        params: &LineSearchParams<T>,
    ) -> SolverResult<LineSearchSummary<T>>;

    /// Human-readable algorithm name.
    fn name(&self) -> &str;
}

/// Backtracking line search with the Armijo sufficient-decrease condition.
///
/// Starting from the initial step length, the candidate is contracted by
/// `contraction_factor` until `φ(α) ≤ φ(0) + c₁ α φ'(0)` holds, the step
/// length underflows `min_step_size`, or the iteration budget runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmijoLineSearch;

impl ArmijoLineSearch {
    /// Creates a new Armijo backtracking line search.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> LineSearch<T> for ArmijoLineSearch {
    fn search(
        &mut self,
        objective: &mut dyn LineSearchObjective<T>,
        initial_step_size: T,
        initial_value: T,
        directional_derivative: T,
        params: &LineSearchParams<T>,
    ) -> SolverResult<LineSearchSummary<T>> {
        params.validate()?;

        if directional_derivative >= T::zero() {
            return Err(SolverError::line_search_failed(
                "search direction is not a descent direction",
                0,
                initial_step_size.to_f64(),
            ));
        }

        let mut step_size = initial_step_size;
        let mut num_iterations = 0;

        while num_iterations < params.max_iterations {
            if step_size < params.min_step_size {
                return Err(SolverError::line_search_failed(
                    "step length fell below min_step_size",
                    num_iterations,
                    step_size.to_f64(),
                ));
            }

            num_iterations += 1;
            let value = objective.evaluate(step_size);

            if let Some(value) = value {
                let decrease = params.sufficient_decrease * step_size * directional_derivative;
                if value <= initial_value + decrease && <T as Float>::is_finite(value) {
                    return Ok(LineSearchSummary {
                        step_size,
                        value,
                        num_iterations,
                    });
                }
            }

            step_size *= params.contraction_factor;
        }

        Err(SolverError::line_search_failed(
            "sufficient decrease condition never satisfied",
            num_iterations,
            step_size.to_f64(),
        ))
    }

    fn name(&self) -> &str {
        "Armijo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // φ(α) = (1 - α)², the restriction of a bowl along its axis.
    fn bowl(alpha: f64) -> Option<f64> {
        Some((1.0 - alpha) * (1.0 - alpha))
    }

    #[test]
    fn test_full_step_accepted() {
        let mut search = ArmijoLineSearch::new();
        let summary = LineSearch::<f64>::search(
            &mut search,
            &mut bowl,
            1.0,
            1.0,
            -2.0,
            &LineSearchParams::default(),
        )
        .unwrap();

        assert_relative_eq!(summary.step_size, 1.0);
        assert_relative_eq!(summary.value, 0.0);
        assert_eq!(summary.num_iterations, 1);
    }

    #[test]
    fn test_backtracks_past_overshoot() {
        // φ(α) = (1 - 4α)²: the unit step overshoots the minimum at 1/4
        // badly enough to fail Armijo and force contraction.
        let mut phi = |alpha: f64| Some((1.0 - 4.0 * alpha) * (1.0 - 4.0 * alpha));
        let mut search = ArmijoLineSearch::new();
        let summary = LineSearch::<f64>::search(
            &mut search,
            &mut phi,
            1.0,
            1.0,
            -8.0,
            &LineSearchParams::default(),
        )
        .unwrap();

        assert!(summary.step_size < 1.0);
        assert!(summary.value < 1.0);
        assert!(summary.num_iterations > 1);
    }

    #[test]
    fn test_failed_evaluations_are_skipped() {
        // Evaluation fails for α > 0.3; the search must contract past the
        // failures and still succeed.
        let mut phi = |alpha: f64| {
            if alpha > 0.3 {
                None
            } else {
                Some((1.0 - alpha) * (1.0 - alpha))
            }
        };
        let mut search = ArmijoLineSearch::new();
        let summary = LineSearch::<f64>::search(
            &mut search,
            &mut phi,
            1.0,
            1.0,
            -2.0,
            &LineSearchParams::default(),
        )
        .unwrap();

        assert!(summary.step_size <= 0.3);
    }

    #[test]
    fn test_non_descent_direction_rejected() {
        let mut search = ArmijoLineSearch::new();
        let result = LineSearch::<f64>::search(
            &mut search,
            &mut bowl,
            1.0,
            1.0,
            1.0,
            &LineSearchParams::default(),
        );
        assert!(matches!(result, Err(SolverError::LineSearchFailed { .. })));
    }

    #[test]
    fn test_increasing_objective_fails() {
        // φ grows along the direction; no step length can satisfy Armijo.
        let mut phi = |alpha: f64| Some(1.0 + alpha);
        let mut search = ArmijoLineSearch::new();
        let result = LineSearch::<f64>::search(
            &mut search,
            &mut phi,
            1.0,
            1.0,
            -1.0,
            &LineSearchParams::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_params_validation() {
        let mut params = LineSearchParams::<f64>::default();
        params.sufficient_decrease = 1.5;
        assert!(params.validate().is_err());

        let mut params = LineSearchParams::<f64>::default();
        params.contraction_factor = 0.0;
        assert!(params.validate().is_err());

        let mut params = LineSearchParams::<f64>::default();
        params.max_iterations = 0;
        assert!(params.validate().is_err());
    }
}
