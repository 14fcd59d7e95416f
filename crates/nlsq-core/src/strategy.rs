//! Trust-region strategy interface.
//!
//! A strategy owns the trust-region radius and knows how to turn the
//! current Jacobian and residuals into a candidate step. The minimizer
//! feeds back the observed step quality through `step_accepted` /
//! `step_rejected` / `step_is_invalid`, and the strategy adapts its
//! radius (or damping) accordingly.

use crate::jacobian::Jacobian;
use crate::types::{DVector, Scalar};

/// Termination status reported by a strategy's linear solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinearSolverTermination {
    /// The linear solve succeeded.
    Success,
    /// An iterative solver hit its iteration cap; the step is still
    /// usable.
    NoConvergence,
    /// The solve failed for numerical reasons; the step is unusable but
    /// retrying with a smaller radius may succeed.
    Failure,
    /// The solve failed for structural, non-numeric reasons; retrying
    /// cannot help.
    FatalError,
}

/// Per-solve knobs passed to `compute_step` each iteration.
#[derive(Debug, Clone)]
pub struct PerSolveOptions<T: Scalar> {
    /// Forcing-sequence parameter for inexact (iterative) linear solves.
    pub eta: T,
}

impl<T: Scalar> Default for PerSolveOptions<T> {
    fn default() -> Self {
        Self {
            eta: <T as crate::types::Scalar>::from_f64(1e-1),
        }
    }
}

/// Outcome of one `compute_step` call.
#[derive(Debug, Clone)]
pub struct StrategySummary {
    /// Number of linear-solver iterations spent on this step.
    pub num_iterations: usize,
    /// How the linear solve terminated.
    pub termination: LinearSolverTermination,
}

/// Trait for trust-region step computation policies.
///
/// Implementations own the radius. The minimizer never adjusts the radius
/// directly; it only reports step quality and reads `radius()` for
/// termination checks and iteration summaries.
pub trait TrustRegionStrategy<T: Scalar, J: Jacobian<T>> {
    /// Computes a step for the current linearization.
    ///
    /// On `Success` or `NoConvergence`, `step` holds a tangent-space step
    /// of length `jacobian.num_cols()` minimizing the damped linear model
    /// `‖J·step + r‖` within the trust region.
    fn compute_step(
        &mut self,
        per_solve_options: &PerSolveOptions<T>,
        jacobian: &J,
        residuals: &DVector<T>,
        step: &mut DVector<T>,
    ) -> StrategySummary;

    /// Reports that the last computed step was accepted with the given
    /// relative decrease.
    fn step_accepted(&mut self, step_quality: T);

    /// Reports that the last computed step was rejected with the given
    /// relative decrease.
    fn step_rejected(&mut self, step_quality: T);

    /// Reports that the last computed step was numerically invalid
    /// (non-positive model cost change or a recoverable solver failure).
    fn step_is_invalid(&mut self);

    /// Current trust-region radius.
    fn radius(&self) -> T;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_solve_options_default() {
        let opts = PerSolveOptions::<f64>::default();
        assert_eq!(opts.eta, 1e-1);
    }

    #[test]
    fn test_termination_equality() {
        assert_eq!(
            LinearSolverTermination::Success,
            LinearSolverTermination::Success
        );
        assert_ne!(
            LinearSolverTermination::Failure,
            LinearSolverTermination::FatalError
        );
    }
}
