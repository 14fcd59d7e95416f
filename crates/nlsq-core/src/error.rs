//! Error types for evaluator and solver operations.
//!
//! This module defines the core error types used throughout the library.
//! Evaluator errors describe failures of the user-supplied residual
//! evaluation machinery; solver errors describe failures of the
//! minimization machinery itself (bad configuration, fatal evaluation at a
//! reference point).

use thiserror::Error;

/// Errors that can occur while evaluating a least-squares problem.
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
    /// Residual, gradient or Jacobian evaluation failed.
    ///
    /// This error occurs when the user-supplied cost terms cannot be
    /// evaluated at the given point, e.g. because the point falls outside
    /// the domain of one of the residual functions.
    #[error("Evaluation failed: {reason}")]
    EvaluationFailed {
        /// Description of why the evaluation failed
        reason: String,
    },

    /// The generalized plus (retraction) operation failed.
    ///
    /// This error occurs when a step cannot be applied to a point, e.g.
    /// because the projection onto the feasible set has no solution.
    #[error("Plus(x, delta) failed: {reason}")]
    PlusFailed {
        /// Description of why the retraction failed
        reason: String,
    },

    /// Dimension mismatch between vectors or matrices.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Numerical instability detected.
    ///
    /// This error occurs when numerical operations become unstable, such
    /// as division by near-zero values or non-finite intermediate results.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },
}

impl EvaluatorError {
    /// Create an EvaluationFailed error with a custom reason.
    pub fn evaluation_failed<S: Into<String>>(reason: S) -> Self {
        Self::EvaluationFailed {
            reason: reason.into(),
        }
    }

    /// Create a PlusFailed error with a custom reason.
    pub fn plus_failed<S: Into<String>>(reason: S) -> Self {
        Self::PlusFailed {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while setting up or running a solver.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// Invalid solver configuration.
    ///
    /// This error occurs when the solver is configured with parameters
    /// that violate their documented constraints (e.g. a non-positive
    /// tolerance or an empty nonmonotonic window).
    #[error("Invalid solver configuration: {reason} (parameter: {parameter}, value: {value})")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Line search failed to find an acceptable step length.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of step lengths tried
        iterations: usize,
        /// Last step length tried
        last_step_size: f64,
    },

    /// Propagated evaluator error.
    #[error("Evaluator operation failed: {0}")]
    Evaluator(#[from] EvaluatorError),
}

impl SolverError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a LineSearchFailed error with context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
        }
    }
}

/// Result type alias for operations that can produce EvaluatorError.
pub type EvaluatorResult<T> = std::result::Result<T, EvaluatorError>;

/// Result type alias for solver operations.
pub type SolverResult<T> = std::result::Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_evaluator_error_creation() {
        let err = EvaluatorError::evaluation_failed("residual block 3 returned NaN");
        assert!(matches!(err, EvaluatorError::EvaluationFailed { .. }));
        assert_eq!(
            err.to_string(),
            "Evaluation failed: residual block 3 returned NaN"
        );

        let err = EvaluatorError::dimension_mismatch("6", "4");
        assert!(matches!(err, EvaluatorError::DimensionMismatch { .. }));
        assert_eq!(err.to_string(), "Dimension mismatch: expected 6, got 4");
    }

    #[test]
    fn test_evaluator_error_display() {
        let errors = vec![
            EvaluatorError::evaluation_failed("cost is not finite"),
            EvaluatorError::plus_failed("projection infeasible"),
            EvaluatorError::dimension_mismatch("10", "9"),
            EvaluatorError::numerical_error("division by zero column norm"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_solver_error_creation() {
        let err =
            SolverError::invalid_configuration("must be positive", "function_tolerance", "-1e-6");
        assert!(matches!(err, SolverError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("function_tolerance"));

        let err = SolverError::line_search_failed("step length underflow", 20, 1e-12);
        if let SolverError::LineSearchFailed {
            reason,
            iterations,
            last_step_size,
        } = err
        {
            assert_eq!(reason, "step length underflow");
            assert_eq!(iterations, 20);
            assert_eq!(last_step_size, 1e-12);
        } else {
            panic!("Expected LineSearchFailed variant");
        }
    }

    #[test]
    fn test_evaluator_error_propagation() {
        let eval_err = EvaluatorError::plus_failed("quaternion norm is zero");
        let solver_err: SolverError = eval_err.into();

        assert!(matches!(solver_err, SolverError::Evaluator(_)));
        assert!(solver_err.to_string().contains("Evaluator operation failed"));
        assert!(solver_err.to_string().contains("quaternion norm is zero"));
    }
}
