//! Levenberg-Marquardt trust region strategy.
//!
//! Implements the classic damped least-squares step. For a trust region
//! radius `mu`, the step solves the regularized normal equations
//!
//! ```text
//! (Jᵀ J + diag(D²) / mu) step = -Jᵀ r
//! ```
//!
//! where `D²` holds the squared column norms of the Jacobian, clamped to a
//! safe range. Shrinking the radius increases the damping and bends the
//! step towards scaled gradient descent; growing it recovers the
//! Gauss-Newton step.
//!
//! Radius adaptation follows Madsen, Nielsen & Tingleff, "Methods for
//! Non-linear Least Squares Problems": accepted steps grow the radius by a
//! smooth function of the step quality, rejected steps halve it with a
//! doubling penalty for consecutive rejections.

use nlsq_core::jacobian::Jacobian;
use nlsq_core::strategy::{
    LinearSolverTermination, PerSolveOptions, StrategySummary, TrustRegionStrategy,
};
use nlsq_core::types::{DVector, Scalar};
use num_traits::Float;

/// Levenberg-Marquardt step computation with adaptive damping.
///
/// The normal equations are formed densely and solved with a Cholesky
/// factorization. A factorization failure is reported as a recoverable
/// [`LinearSolverTermination::Failure`]; the minimizer will retry with a
/// smaller radius, which makes the system better conditioned.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtStrategy<T: Scalar> {
    radius: T,
    max_radius: T,
    min_diagonal: T,
    max_diagonal: T,
    decrease_factor: T,
    reuse_diagonal: bool,
    diagonal: DVector<T>,
}

impl<T: Scalar> LevenbergMarquardtStrategy<T> {
    /// Creates a strategy with the given initial and maximum radius.
    pub fn new(initial_radius: T, max_radius: T) -> Self {
        Self {
            radius: initial_radius,
            max_radius,
            min_diagonal: <T as Scalar>::from_f64(1e-6),
            max_diagonal: <T as Scalar>::from_f64(1e32),
            decrease_factor: <T as Scalar>::from_f64(2.0),
            reuse_diagonal: false,
            diagonal: DVector::zeros(0),
        }
    }

    /// Overrides the clamping range for the damping diagonal.
    pub fn with_diagonal_bounds(mut self, min_diagonal: T, max_diagonal: T) -> Self {
        self.min_diagonal = min_diagonal;
        self.max_diagonal = max_diagonal;
        self
    }

    fn shrink_radius(&mut self) {
        self.radius = self.radius / self.decrease_factor;
        self.decrease_factor *= <T as Scalar>::from_f64(2.0);
        self.reuse_diagonal = true;
    }
}

impl<T: Scalar, J: Jacobian<T>> TrustRegionStrategy<T, J> for LevenbergMarquardtStrategy<T> {
    fn compute_step(
        &mut self,
        _per_solve_options: &PerSolveOptions<T>,
        jacobian: &J,
        residuals: &DVector<T>,
        step: &mut DVector<T>,
    ) -> StrategySummary {
        let num_cols = jacobian.num_cols();

        // The damping diagonal depends only on the Jacobian, which does
        // not change while steps keep being rejected.
        if !self.reuse_diagonal {
            let mut diagonal = jacobian.squared_column_norms();
            for value in diagonal.iter_mut() {
                *value = <T as Float>::min(
                    <T as Float>::max(*value, self.min_diagonal),
                    self.max_diagonal,
                );
            }
            self.diagonal = diagonal;
        }
        self.reuse_diagonal = true;

        let dense = jacobian.to_dense();
        let mut lhs = dense.tr_mul(&dense);
        for i in 0..num_cols {
            lhs[(i, i)] += self.diagonal[i] / self.radius;
        }

        let mut rhs = DVector::zeros(num_cols);
        jacobian.left_multiply(residuals, &mut rhs);
        rhs.neg_mut();

        match lhs.cholesky() {
            Some(cholesky) => {
                step.copy_from(&cholesky.solve(&rhs));
                StrategySummary {
                    num_iterations: 1,
                    termination: LinearSolverTermination::Success,
                }
            }
            None => StrategySummary {
                num_iterations: 0,
                termination: LinearSolverTermination::Failure,
            },
        }
    }

    fn step_accepted(&mut self, step_quality: T) {
        let one = T::one();
        let two = <T as Scalar>::from_f64(2.0);
        let shrink = one - <T as Float>::powi(two * step_quality - one, 3);
        self.radius = self.radius / <T as Float>::max(<T as Scalar>::from_f64(1.0 / 3.0), shrink);
        self.radius = <T as Float>::min(self.radius, self.max_radius);
        self.decrease_factor = two;
        self.reuse_diagonal = false;
    }

    fn step_rejected(&mut self, _step_quality: T) {
        self.shrink_radius();
    }

    fn step_is_invalid(&mut self) {
        self.shrink_radius();
    }

    fn radius(&self) -> T {
        self.radius
    }
}
