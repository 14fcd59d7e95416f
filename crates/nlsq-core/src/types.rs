//! Type definitions and aliases for nonlinear least-squares solvers.
//!
//! This module provides common type aliases, the scalar trait used by all
//! generic numeric code, and default numerical constants.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display, LowerExp};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the numeric traits the solver needs, plus a
/// small set of per-precision default tolerances.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + LowerExp
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default relative function-value tolerance.
    const DEFAULT_FUNCTION_TOLERANCE: Self;

    /// Default gradient max-norm tolerance.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Default relative parameter-change tolerance.
    const DEFAULT_PARAMETER_TOLERANCE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a
    /// non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    ///
    /// Returns None if the conversion fails.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_to_f64` for a non-panicking
    /// version.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Try to convert to f64.
    ///
    /// Returns None if the conversion fails.
    fn try_to_f64(self) -> Option<f64> {
        num_traits::cast(self)
    }

    /// Convert from usize (for iteration counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-4;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-6;
    const DEFAULT_PARAMETER_TOLERANCE: Self = 1e-5;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-6;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-10;
    const DEFAULT_PARAMETER_TOLERANCE: Self = 1e-8;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_trait_f32() {
        assert_eq!(<f32 as Scalar>::EPSILON, f32::EPSILON);
        assert!(f32::DEFAULT_FUNCTION_TOLERANCE > 0.0);
        assert!(f32::DEFAULT_GRADIENT_TOLERANCE > 0.0);
        assert!(f32::DEFAULT_PARAMETER_TOLERANCE > 0.0);
    }

    #[test]
    fn test_scalar_trait_f64() {
        assert_eq!(<f64 as Scalar>::EPSILON, f64::EPSILON);
        assert!(f64::DEFAULT_FUNCTION_TOLERANCE > 0.0);
        assert!(f64::DEFAULT_GRADIENT_TOLERANCE > 0.0);
        assert!(f64::DEFAULT_PARAMETER_TOLERANCE > 0.0);
    }

    #[test]
    fn test_scalar_conversions() {
        let val_f64 = 3.14159;
        let val_f32 = <f32 as Scalar>::from_f64(val_f64);
        assert_relative_eq!(f64::from(val_f32), val_f64, epsilon = 1e-6);

        let back_f64 = val_f32.to_f64();
        assert_relative_eq!(back_f64, f64::from(val_f32));

        assert_eq!(<f64 as Scalar>::from_usize(7), 7.0);
        assert_eq!(<f64 as Scalar>::try_from_f64(1.5), Some(1.5));
    }

    #[test]
    fn test_vector_and_matrix_aliases() {
        let v: DVector<f64> = DVector::zeros(10);
        assert_eq!(v.len(), 10);

        let m: DMatrix<f64> = DMatrix::identity(3, 3);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 3);
    }

    #[test]
    fn test_tolerance_ordering() {
        assert!(f32::DEFAULT_GRADIENT_TOLERANCE < f32::DEFAULT_FUNCTION_TOLERANCE);
        assert!(f64::DEFAULT_GRADIENT_TOLERANCE < f64::DEFAULT_FUNCTION_TOLERANCE);
        assert!(f64::DEFAULT_PARAMETER_TOLERANCE < f64::DEFAULT_FUNCTION_TOLERANCE);
    }
}
