//! Small dense least-squares problems shared across the workspace's
//! tests.
//!
//! Available in unit tests and, behind the `test-utils` feature, to
//! downstream crates' test suites.

use crate::error::EvaluatorResult;
use crate::evaluator::Evaluator;
use crate::jacobian::DenseJacobian;
use crate::types::{DMatrix, DVector, Scalar};

/// `r(x) = x - target`: an axis-aligned quadratic bowl with its minimum
/// at `target` and the identity as Jacobian.
#[derive(Debug, Clone)]
pub struct TranslationProblem<T: Scalar> {
    target: DVector<T>,
}

impl<T: Scalar> TranslationProblem<T> {
    /// Creates a bowl with minimum at `target`.
    pub fn new(target: DVector<T>) -> Self {
        Self { target }
    }
}

impl<T: Scalar> Evaluator<T> for TranslationProblem<T> {
    type Jacobian = DenseJacobian<T>;

    fn num_parameters(&self) -> usize {
        self.target.len()
    }

    fn num_effective_parameters(&self) -> usize {
        self.target.len()
    }

    fn num_residuals(&self) -> usize {
        self.target.len()
    }

    fn create_jacobian(&self) -> Self::Jacobian {
        DenseJacobian::zeros(self.target.len(), self.target.len())
    }

    fn evaluate(
        &mut self,
        x: &DVector<T>,
        residuals: &mut DVector<T>,
        gradient: &mut DVector<T>,
        jacobian: &mut Self::Jacobian,
    ) -> EvaluatorResult<T> {
        residuals.copy_from(&(x - &self.target));
        gradient.copy_from(residuals);
        jacobian
            .matrix_mut()
            .copy_from(&DMatrix::identity(self.target.len(), self.target.len()));
        Ok(residuals.norm_squared() / <T as Scalar>::from_f64(2.0))
    }

    fn evaluate_cost(&mut self, x: &DVector<T>) -> EvaluatorResult<T> {
        Ok((x - &self.target).norm_squared() / <T as Scalar>::from_f64(2.0))
    }

    fn plus(
        &self,
        x: &DVector<T>,
        delta: &DVector<T>,
        x_plus_delta: &mut DVector<T>,
    ) -> EvaluatorResult<()> {
        x_plus_delta.copy_from(&(x + delta));
        Ok(())
    }
}

/// `r(x) = A x - b`: a general linear least-squares problem with a
/// constant Jacobian.
#[derive(Debug, Clone)]
pub struct LinearProblem<T: Scalar> {
    a: DMatrix<T>,
    b: DVector<T>,
}

impl<T: Scalar> LinearProblem<T> {
    /// Creates the problem `min ½‖A x - b‖²`.
    ///
    /// # Panics
    ///
    /// Panics if the row counts of `a` and `b` disagree.
    pub fn new(a: DMatrix<T>, b: DVector<T>) -> Self {
        assert_eq!(a.nrows(), b.len());
        Self { a, b }
    }
}

impl<T: Scalar> Evaluator<T> for LinearProblem<T> {
    type Jacobian = DenseJacobian<T>;

    fn num_parameters(&self) -> usize {
        self.a.ncols()
    }

    fn num_effective_parameters(&self) -> usize {
        self.a.ncols()
    }

    fn num_residuals(&self) -> usize {
        self.a.nrows()
    }

    fn create_jacobian(&self) -> Self::Jacobian {
        DenseJacobian::zeros(self.a.nrows(), self.a.ncols())
    }

    fn evaluate(
        &mut self,
        x: &DVector<T>,
        residuals: &mut DVector<T>,
        gradient: &mut DVector<T>,
        jacobian: &mut Self::Jacobian,
    ) -> EvaluatorResult<T> {
        residuals.copy_from(&(&self.a * x - &self.b));
        gradient.copy_from(&(self.a.transpose() * &*residuals));
        jacobian.matrix_mut().copy_from(&self.a);
        Ok(residuals.norm_squared() / <T as Scalar>::from_f64(2.0))
    }

    fn evaluate_cost(&mut self, x: &DVector<T>) -> EvaluatorResult<T> {
        Ok((&self.a * x - &self.b).norm_squared() / <T as Scalar>::from_f64(2.0))
    }

    fn plus(
        &self,
        x: &DVector<T>,
        delta: &DVector<T>,
        x_plus_delta: &mut DVector<T>,
    ) -> EvaluatorResult<()> {
        x_plus_delta.copy_from(&(x + delta));
        Ok(())
    }
}
