//! Per-iteration records and the final solve summary.
//!
//! Every pass through the trust-region loop appends one
//! [`IterationSummary`] to the solve's [`SolverSummary`]. The records are
//! immutable once appended; the loop itself reads back only the previous
//! record's gradient norms (to fill in invalid-step iterations), and
//! everything else exists for callbacks and post-mortem reporting.

use crate::types::Scalar;
use std::time::Duration;

/// How a solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationType {
    /// A convergence tolerance was satisfied, or the trust region
    /// collapsed below its minimum radius.
    Convergence,
    /// An iteration or wall-clock budget was exhausted before any
    /// tolerance was satisfied.
    NoConvergence,
    /// The solver cannot make progress: evaluation failed at a reference
    /// point, the linear solver failed fatally, or too many consecutive
    /// steps were invalid.
    Failure,
    /// An iteration callback asked the loop to stop.
    UserTerminated,
}

/// One record per trust-region loop iteration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationSummary<T: Scalar> {
    /// Iteration index; iteration 0 records the initial evaluation.
    pub iteration: usize,

    /// Whether the step produced a strictly positive model cost change.
    pub step_is_valid: bool,

    /// Whether the step was accepted.
    pub step_is_successful: bool,

    /// Objective value at the end of this iteration.
    pub cost: T,

    /// `cost(x) - cost(x_plus_delta)` for the candidate step.
    pub cost_change: T,

    /// Max norm of the projected gradient.
    pub gradient_max_norm: T,

    /// Euclidean norm of the projected gradient.
    pub gradient_norm: T,

    /// `‖x - x_plus_delta‖` for the candidate step.
    pub step_norm: T,

    /// Ratio of actual to model-predicted cost decrease.
    pub relative_decrease: T,

    /// Trust-region radius at the end of the iteration.
    pub trust_region_radius: T,

    /// Forcing-sequence parameter forwarded to the linear solver.
    pub eta: T,

    /// Linear-solver iterations spent computing the step.
    pub linear_solver_iterations: usize,

    /// Time spent inside the strategy's `compute_step`.
    pub step_solver_time: Duration,

    /// Wall time of this iteration.
    pub iteration_time: Duration,

    /// Wall time since the solve started.
    pub cumulative_time: Duration,
}

impl<T: Scalar> Default for IterationSummary<T> {
    fn default() -> Self {
        Self {
            iteration: 0,
            step_is_valid: false,
            step_is_successful: false,
            cost: T::zero(),
            cost_change: T::zero(),
            gradient_max_norm: T::zero(),
            gradient_norm: T::zero(),
            step_norm: T::zero(),
            relative_decrease: T::zero(),
            trust_region_radius: T::zero(),
            eta: T::zero(),
            linear_solver_iterations: 0,
            step_solver_time: Duration::ZERO,
            iteration_time: Duration::ZERO,
            cumulative_time: Duration::ZERO,
        }
    }
}

/// Result of a full solve.
///
/// The summary is always returned, whatever the termination kind; the
/// `message` explains the terminating condition in human-readable form.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverSummary<T: Scalar> {
    /// Why the solve stopped.
    pub termination: TerminationType,

    /// Human-readable description of the terminating condition.
    pub message: String,

    /// Objective value at the initial point.
    pub initial_cost: T,

    /// Best objective value observed over the whole solve. The caller's
    /// parameter buffer always corresponds to this cost.
    pub final_cost: T,

    /// Number of accepted steps.
    pub num_successful_steps: usize,

    /// Number of rejected or invalid steps.
    pub num_unsuccessful_steps: usize,

    /// Number of outer iterations that ran inner iterations.
    pub num_inner_iteration_steps: usize,

    /// Number of line-search probes across all iterations.
    pub num_line_search_steps: usize,

    /// One record per loop iteration, starting with iteration 0.
    pub iterations: Vec<IterationSummary<T>>,

    /// Total wall time of the solve.
    pub total_time: Duration,
}

impl<T: Scalar> SolverSummary<T> {
    /// Creates an empty summary with `NoConvergence` as the provisional
    /// termination kind.
    pub fn new() -> Self {
        Self {
            termination: TerminationType::NoConvergence,
            message: String::new(),
            initial_cost: T::zero(),
            final_cost: T::zero(),
            num_successful_steps: 0,
            num_unsuccessful_steps: 0,
            num_inner_iteration_steps: 0,
            num_line_search_steps: 0,
            iterations: Vec::new(),
            total_time: Duration::ZERO,
        }
    }

    /// Whether the solve terminated by satisfying a convergence
    /// criterion.
    pub fn converged(&self) -> bool {
        self.termination == TerminationType::Convergence
    }

    /// Whether the final parameter values are usable (anything but a
    /// hard failure).
    pub fn is_usable(&self) -> bool {
        self.termination != TerminationType::Failure
    }
}

impl<T: Scalar> Default for SolverSummary<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_summary_default() {
        let summary = IterationSummary::<f64>::default();
        assert_eq!(summary.iteration, 0);
        assert!(!summary.step_is_valid);
        assert!(!summary.step_is_successful);
        assert_eq!(summary.cost, 0.0);
        assert_eq!(summary.step_solver_time, Duration::ZERO);
    }

    #[test]
    fn test_solver_summary_flags() {
        let mut summary = SolverSummary::<f64>::new();
        assert!(!summary.converged());
        assert!(summary.is_usable());

        summary.termination = TerminationType::Convergence;
        assert!(summary.converged());
        assert!(summary.is_usable());

        summary.termination = TerminationType::Failure;
        assert!(!summary.converged());
        assert!(!summary.is_usable());

        summary.termination = TerminationType::UserTerminated;
        assert!(!summary.converged());
        assert!(summary.is_usable());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_termination_round_trips_through_serde() {
        let json = serde_json::to_string(&TerminationType::Convergence).unwrap();
        let back: TerminationType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TerminationType::Convergence);
    }
}
