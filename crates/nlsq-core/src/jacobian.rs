//! Jacobian abstraction for the trust-region machinery.
//!
//! The minimizer and the trust-region strategies never look inside the
//! Jacobian; they only need a handful of capabilities: matrix-vector
//! products, column scaling, column norms, and (for dense factorization
//! backends) densification. Sparse and GPU-backed implementations can
//! provide the same surface without the core loop changing.

use crate::types::{DMatrix, DVector, Scalar};
use num_traits::Float;

/// Capability surface the solver requires of a Jacobian.
///
/// Column scaling mutates the matrix in place; all other operations are
/// read-only. Implementations are recomputed fresh by the evaluator at
/// every accepted iterate, so scaling must be re-applied each time.
pub trait Jacobian<T: Scalar> {
    /// Number of rows (residuals).
    fn num_rows(&self) -> usize;

    /// Number of columns (effective parameters).
    fn num_cols(&self) -> usize;

    /// Computes `y = J * x`.
    ///
    /// Unlike some sparse-matrix interfaces this assigns rather than
    /// accumulates, so callers do not need to zero `y` first.
    fn right_multiply(&self, x: &DVector<T>, y: &mut DVector<T>);

    /// Computes `y = Jᵀ * x`.
    fn left_multiply(&self, x: &DVector<T>, y: &mut DVector<T>);

    /// Scales column `j` by `scale[j]` in place.
    fn scale_columns(&mut self, scale: &DVector<T>);

    /// Returns the squared Euclidean norm of each column.
    fn squared_column_norms(&self) -> DVector<T>;

    /// Returns a dense copy of the matrix, for dense factorization
    /// backends.
    fn to_dense(&self) -> DMatrix<T>;
}

/// Dense Jacobian backed by an owned nalgebra matrix.
#[derive(Debug, Clone)]
pub struct DenseJacobian<T: Scalar> {
    matrix: DMatrix<T>,
}

impl<T: Scalar> DenseJacobian<T> {
    /// Creates a zeroed Jacobian with the given shape.
    pub fn zeros(num_rows: usize, num_cols: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(num_rows, num_cols),
        }
    }

    /// Creates a Jacobian from an existing matrix.
    pub fn from_matrix(matrix: DMatrix<T>) -> Self {
        Self { matrix }
    }

    /// Read access to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<T> {
        &self.matrix
    }

    /// Mutable access to the underlying matrix, used by evaluators to
    /// fill in fresh derivative values.
    pub fn matrix_mut(&mut self) -> &mut DMatrix<T> {
        &mut self.matrix
    }
}

impl<T: Scalar> Jacobian<T> for DenseJacobian<T> {
    fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    fn num_cols(&self) -> usize {
        self.matrix.ncols()
    }

    fn right_multiply(&self, x: &DVector<T>, y: &mut DVector<T>) {
        self.matrix.mul_to(x, y);
    }

    fn left_multiply(&self, x: &DVector<T>, y: &mut DVector<T>) {
        self.matrix.tr_mul_to(x, y);
    }

    fn scale_columns(&mut self, scale: &DVector<T>) {
        for (j, mut col) in self.matrix.column_iter_mut().enumerate() {
            col *= scale[j];
        }
    }

    fn squared_column_norms(&self) -> DVector<T> {
        DVector::from_iterator(
            self.matrix.ncols(),
            self.matrix.column_iter().map(|c| c.norm_squared()),
        )
    }

    fn to_dense(&self) -> DMatrix<T> {
        self.matrix.clone()
    }
}

/// Computes the Jacobi column scale `scale[j] = 1 / (1 + ‖col_j‖)` from
/// squared column norms.
///
/// The `1 +` guard keeps the scale finite and positive for zero columns,
/// so re-applying and undoing the scale is always well defined.
pub fn jacobi_scale<T: Scalar>(squared_column_norms: &DVector<T>) -> DVector<T> {
    squared_column_norms.map(|n| T::one() / (T::one() + <T as Float>::sqrt(n)))
}
