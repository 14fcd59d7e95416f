//! Evaluator interface for nonlinear least-squares problems.
//!
//! The evaluator is the solver's window onto the user's problem: it
//! produces cost, residuals, gradient and Jacobian at a point, and knows
//! how to apply a tangent-space step to an ambient-space point (the
//! generalized plus, or retraction). Parallel residual evaluation, block
//! bookkeeping and automatic differentiation all live behind this trait.

use crate::error::EvaluatorResult;
use crate::jacobian::Jacobian;
use crate::types::{DVector, Scalar};

/// Trait for evaluating a sum-of-squares objective and its derivatives.
///
/// The objective is `cost(x) = 1/2 ‖r(x)‖²` for a residual vector `r`.
/// Parameters may live on a manifold: `x` has the ambient dimension
/// `num_parameters()`, while steps, gradients and Jacobian columns use the
/// tangent dimension `num_effective_parameters()`.
///
/// `evaluate` is fallible; a failure at a *trial* point is recoverable
/// (the minimizer treats it as infinite cost), while a failure at an
/// accepted iterate is fatal for the solve.
pub trait Evaluator<T: Scalar> {
    /// Jacobian representation produced by this evaluator.
    type Jacobian: Jacobian<T>;

    /// Ambient dimension of the parameter vector.
    fn num_parameters(&self) -> usize;

    /// Tangent dimension seen by the linear solver.
    fn num_effective_parameters(&self) -> usize;

    /// Length of the residual vector.
    fn num_residuals(&self) -> usize;

    /// Creates a Jacobian with this problem's sparsity/shape, to be
    /// filled by `evaluate`.
    fn create_jacobian(&self) -> Self::Jacobian;

    /// Evaluates cost, residuals, gradient and Jacobian at `x`.
    ///
    /// `residuals` must have length `num_residuals()`, `gradient` length
    /// `num_effective_parameters()`. Returns the cost.
    fn evaluate(
        &mut self,
        x: &DVector<T>,
        residuals: &mut DVector<T>,
        gradient: &mut DVector<T>,
        jacobian: &mut Self::Jacobian,
    ) -> EvaluatorResult<T>;

    /// Evaluates only the cost at `x`.
    ///
    /// Used for trial points and line-search probes, where derivatives
    /// are not needed.
    fn evaluate_cost(&mut self, x: &DVector<T>) -> EvaluatorResult<T>;

    /// Computes `x_plus_delta = Plus(x, delta)`.
    ///
    /// For unconstrained Euclidean parameters this is vector addition;
    /// for manifold-valued or constrained parameters it is the retraction
    /// or projection. `x_plus_delta` must have length `num_parameters()`.
    fn plus(
        &self,
        x: &DVector<T>,
        delta: &DVector<T>,
        x_plus_delta: &mut DVector<T>,
    ) -> EvaluatorResult<()>;
}
