//! Core traits and types for trust-region nonlinear least-squares
//! solvers.
//!
//! This crate provides the collaborator seams the minimization loop in
//! `nlsq-solver` is written against: an [`Evaluator`] producing cost,
//! residuals, gradient and Jacobian; a [`Jacobian`] capability trait; a
//! [`TrustRegionStrategy`] that owns the trust-region radius and proposes
//! steps; a scalar [`LineSearch`] used for constrained problems; optional
//! [`InnerIterationMinimizer`]s; iteration callbacks; and the summary
//! value objects every solve returns.
//!
//! [`Evaluator`]: evaluator::Evaluator
//! [`Jacobian`]: jacobian::Jacobian
//! [`TrustRegionStrategy`]: strategy::TrustRegionStrategy
//! [`LineSearch`]: line_search::LineSearch
//! [`InnerIterationMinimizer`]: inner_iteration::InnerIterationMinimizer

pub mod callback;
pub mod error;
pub mod evaluator;
pub mod inner_iteration;
pub mod jacobian;
pub mod line_search;
pub mod strategy;
pub mod summary;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_problems;

// Re-export commonly used items at the crate root
pub use error::{EvaluatorError, EvaluatorResult, SolverError, SolverResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use nlsq_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::callback::{IterationCallback, NoOpCallback, ProgressCallback};
    pub use crate::error::{EvaluatorError, EvaluatorResult, SolverError, SolverResult};
    pub use crate::evaluator::Evaluator;
    pub use crate::inner_iteration::{InnerIterationMinimizer, NoInnerIterations};
    pub use crate::jacobian::{jacobi_scale, DenseJacobian, Jacobian};
    pub use crate::line_search::{
        ArmijoLineSearch, LineSearch, LineSearchObjective, LineSearchParams, LineSearchSummary,
    };
    pub use crate::strategy::{
        LinearSolverTermination, PerSolveOptions, StrategySummary, TrustRegionStrategy,
    };
    pub use crate::summary::{IterationSummary, SolverSummary, TerminationType};
    pub use crate::types::{DMatrix, DVector, Scalar};
}
