//! Callback support for the minimization loop.
//!
//! Callbacks observe each finalized [`IterationSummary`] and can ask the
//! loop to stop. A stop request is cooperative and honored at the
//! iteration boundary; it is reported as `UserTerminated`, not as an
//! error.

use crate::error::SolverResult;
use crate::summary::IterationSummary;
use crate::types::Scalar;

/// Trait for iteration callbacks.
///
/// Callbacks allow monitoring and controlling the solve. They can be
/// used for logging, visualization, checkpointing or early stopping.
pub trait IterationCallback<T: Scalar>: Send {
    /// Called once per finalized iteration.
    ///
    /// Returns `true` to continue the solve, `false` to stop after this
    /// iteration.
    fn on_iteration_end(&mut self, summary: &IterationSummary<T>) -> SolverResult<bool>;
}

/// A no-op callback that always continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar> IterationCallback<T> for NoOpCallback {
    fn on_iteration_end(&mut self, _summary: &IterationSummary<T>) -> SolverResult<bool> {
        Ok(true)
    }
}

/// A callback that prints per-iteration progress to stdout.
#[derive(Debug, Clone)]
pub struct ProgressCallback {
    print_every: usize,
}

impl ProgressCallback {
    /// Creates a new progress-printing callback reporting every
    /// `print_every` iterations.
    pub fn new(print_every: usize) -> Self {
        Self {
            print_every: print_every.max(1),
        }
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T: Scalar> IterationCallback<T> for ProgressCallback {
    fn on_iteration_end(&mut self, summary: &IterationSummary<T>) -> SolverResult<bool> {
        if summary.iteration % self.print_every == 0 {
            println!(
                "iter {:4}  cost {:e}  |g| {:e}  step {:e}  radius {:e}  {}",
                summary.iteration,
                summary.cost,
                summary.gradient_max_norm,
                summary.step_norm,
                summary.trust_region_radius,
                if summary.step_is_successful {
                    "accepted"
                } else {
                    "rejected"
                },
            );
        }
        Ok(true)
    }
}
