//! Trust region minimization for nonlinear least-squares problems.
//!
//! This crate provides the outer optimization loop on top of the traits
//! in [`nlsq_core`]: a Levenberg-Marquardt trust region strategy, step
//! acceptance policies (monotonic and nonmonotonic), and the
//! [`TrustRegionMinimizer`] that ties them together.
//!
//! # Example
//!
//! ```
//! use nlsq_core::test_problems::TranslationProblem;
//! use nlsq_core::types::DVector;
//! use nlsq_solver::prelude::*;
//!
//! let problem = TranslationProblem::new(DVector::from_vec(vec![1.0, -2.0]));
//! let options = TrustRegionOptions::default();
//! let strategy = LevenbergMarquardtStrategy::new(
//!     options.initial_trust_region_radius,
//!     options.max_trust_region_radius,
//! );
//!
//! let mut x = DVector::from_vec(vec![0.0, 0.0]);
//! let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);
//! assert!(summary.converged());
//! ```

pub mod levenberg_marquardt;
pub mod minimizer;
pub mod options;
pub mod step_evaluator;

pub use levenberg_marquardt::LevenbergMarquardtStrategy;
pub use minimizer::TrustRegionMinimizer;
pub use options::TrustRegionOptions;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::levenberg_marquardt::LevenbergMarquardtStrategy;
    pub use crate::minimizer::TrustRegionMinimizer;
    pub use crate::options::TrustRegionOptions;
    pub use crate::step_evaluator::{
        MonotonicStepEvaluator, StepEvaluator, TointStepEvaluator,
    };
    pub use nlsq_core::prelude::*;
}
