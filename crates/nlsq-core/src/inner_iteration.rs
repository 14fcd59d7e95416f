//! Inner-iteration minimizer interface.
//!
//! An inner-iteration minimizer is a cheaper, secondary minimizer
//! (typically a coordinate-descent pass over independent parameter
//! blocks) that the trust-region loop runs on a trial point before the
//! acceptance test, hoping to squeeze extra improvement out of the step.
//! It refines the point in place; the outer loop re-evaluates the cost
//! itself and decides whether to adopt the refined point.

use crate::error::EvaluatorResult;
use crate::evaluator::Evaluator;
use crate::types::{DVector, Scalar};

/// Trait for secondary minimizers run on trial points.
pub trait InnerIterationMinimizer<T: Scalar, E: Evaluator<T>> {
    /// Refines `x` in place.
    ///
    /// Failures are recoverable: the outer loop keeps the unrefined trial
    /// point and continues.
    fn minimize(&mut self, evaluator: &mut E, x: &mut DVector<T>) -> EvaluatorResult<()>;
}

/// Placeholder used when inner iterations are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInnerIterations;

impl<T: Scalar, E: Evaluator<T>> InnerIterationMinimizer<T, E> for NoInnerIterations {
    fn minimize(&mut self, _evaluator: &mut E, _x: &mut DVector<T>) -> EvaluatorResult<()> {
        Ok(())
    }
}
