//! Configuration for the trust region minimizer.

use std::time::Duration;

use nlsq_core::line_search::LineSearchParams;
use nlsq_core::types::Scalar;
use nlsq_core::{SolverError, SolverResult};

/// Configuration for [`TrustRegionMinimizer`](crate::minimizer::TrustRegionMinimizer).
///
/// The defaults follow standard practice for Levenberg-Marquardt style
/// solvers and are usable as-is for well scaled problems. The builder
/// methods allow selective overrides:
///
/// ```
/// use nlsq_solver::options::TrustRegionOptions;
///
/// let options = TrustRegionOptions::<f64>::new()
///     .with_max_num_iterations(200)
///     .with_function_tolerance(1e-12);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrustRegionOptions<T: Scalar> {
    /// Maximum number of minimizer iterations.
    pub max_num_iterations: usize,
    /// Wall-clock budget for the whole solve. `None` disables the check.
    pub max_solver_time: Option<Duration>,
    /// Terminate when `|cost_change| <= function_tolerance * cost`.
    pub function_tolerance: T,
    /// Terminate when the max-norm of the projected gradient falls below
    /// this value.
    pub gradient_tolerance: T,
    /// Terminate when the step norm falls below
    /// `parameter_tolerance * (parameter_norm + parameter_tolerance)`.
    pub parameter_tolerance: T,
    /// Minimum relative decrease a step must achieve to be accepted.
    pub min_relative_decrease: T,
    /// Initial trust region radius.
    pub initial_trust_region_radius: T,
    /// Largest the trust region radius is allowed to grow.
    pub max_trust_region_radius: T,
    /// Once the radius shrinks below this the minimizer terminates.
    pub min_trust_region_radius: T,
    /// Number of consecutive invalid steps tolerated before declaring
    /// failure.
    pub max_num_consecutive_invalid_steps: usize,
    /// Use the nonmonotonic step acceptance of Conn, Gould & Toint
    /// instead of strictly monotonic descent.
    pub use_nonmonotonic_steps: bool,
    /// Window size for nonmonotonic step acceptance.
    pub max_consecutive_nonmonotonic_steps: usize,
    /// Relative decrease inner iterations must deliver to stay enabled.
    pub inner_iteration_tolerance: T,
    /// Whether the parameter vector is subject to bounds. Enables the
    /// line search safeguard after each accepted trust region step.
    pub is_constrained: bool,
    /// Scale Jacobian columns by their norms before solving.
    pub jacobi_scaling: bool,
    /// Forcing tolerance handed to iterative linear solvers.
    pub eta: T,
    /// Parameters for the Armijo line search used on constrained
    /// problems.
    pub line_search: LineSearchParams<T>,
}

impl<T: Scalar> Default for TrustRegionOptions<T> {
    fn default() -> Self {
        Self {
            max_num_iterations: 50,
            max_solver_time: None,
            function_tolerance: T::DEFAULT_FUNCTION_TOLERANCE,
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
            parameter_tolerance: T::DEFAULT_PARAMETER_TOLERANCE,
            min_relative_decrease: <T as Scalar>::from_f64(1e-3),
            initial_trust_region_radius: <T as Scalar>::from_f64(1e4),
            max_trust_region_radius: <T as Scalar>::from_f64(1e16),
            min_trust_region_radius: <T as Scalar>::from_f64(1e-32),
            max_num_consecutive_invalid_steps: 5,
            use_nonmonotonic_steps: false,
            max_consecutive_nonmonotonic_steps: 5,
            inner_iteration_tolerance: <T as Scalar>::from_f64(1e-3),
            is_constrained: false,
            jacobi_scaling: true,
            eta: <T as Scalar>::from_f64(1e-1),
            line_search: LineSearchParams::default(),
        }
    }
}

impl<T: Scalar> TrustRegionOptions<T> {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_num_iterations(mut self, n: usize) -> Self {
        self.max_num_iterations = n;
        self
    }

    /// Sets the wall-clock budget for the solve.
    pub fn with_max_solver_time(mut self, budget: Duration) -> Self {
        self.max_solver_time = Some(budget);
        self
    }

    /// Sets the function tolerance.
    pub fn with_function_tolerance(mut self, tol: T) -> Self {
        self.function_tolerance = tol;
        self
    }

    /// Sets the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Sets the parameter tolerance.
    pub fn with_parameter_tolerance(mut self, tol: T) -> Self {
        self.parameter_tolerance = tol;
        self
    }

    /// Sets the minimum relative decrease for step acceptance.
    pub fn with_min_relative_decrease(mut self, ratio: T) -> Self {
        self.min_relative_decrease = ratio;
        self
    }

    /// Sets the initial trust region radius.
    pub fn with_initial_trust_region_radius(mut self, radius: T) -> Self {
        self.initial_trust_region_radius = radius;
        self
    }

    /// Sets the maximum trust region radius.
    pub fn with_max_trust_region_radius(mut self, radius: T) -> Self {
        self.max_trust_region_radius = radius;
        self
    }

    /// Sets the minimum trust region radius.
    pub fn with_min_trust_region_radius(mut self, radius: T) -> Self {
        self.min_trust_region_radius = radius;
        self
    }

    /// Sets the invalid step budget.
    pub fn with_max_num_consecutive_invalid_steps(mut self, n: usize) -> Self {
        self.max_num_consecutive_invalid_steps = n;
        self
    }

    /// Enables nonmonotonic step acceptance with the given window size.
    pub fn with_nonmonotonic_steps(mut self, window: usize) -> Self {
        self.use_nonmonotonic_steps = true;
        self.max_consecutive_nonmonotonic_steps = window;
        self
    }

    /// Sets the inner iteration tolerance.
    pub fn with_inner_iteration_tolerance(mut self, tol: T) -> Self {
        self.inner_iteration_tolerance = tol;
        self
    }

    /// Marks the problem as bound constrained.
    pub fn with_constrained(mut self, constrained: bool) -> Self {
        self.is_constrained = constrained;
        self
    }

    /// Enables or disables Jacobi column scaling.
    pub fn with_jacobi_scaling(mut self, enabled: bool) -> Self {
        self.jacobi_scaling = enabled;
        self
    }

    /// Sets the forcing tolerance for iterative linear solvers.
    pub fn with_eta(mut self, eta: T) -> Self {
        self.eta = eta;
        self
    }

    /// Sets the line search parameters.
    pub fn with_line_search(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search = params;
        self
    }

    /// Checks the options for internal consistency.
    pub fn validate(&self) -> SolverResult<()> {
        let zero = T::zero();
        if self.function_tolerance < zero {
            return Err(SolverError::invalid_configuration(
                "must be non-negative",
                "function_tolerance",
                self.function_tolerance.to_f64().to_string(),
            ));
        }
        if self.gradient_tolerance < zero {
            return Err(SolverError::invalid_configuration(
                "must be non-negative",
                "gradient_tolerance",
                self.gradient_tolerance.to_f64().to_string(),
            ));
        }
        if self.parameter_tolerance < zero {
            return Err(SolverError::invalid_configuration(
                "must be non-negative",
                "parameter_tolerance",
                self.parameter_tolerance.to_f64().to_string(),
            ));
        }
        if self.min_relative_decrease < zero || self.min_relative_decrease >= T::one() {
            return Err(SolverError::invalid_configuration(
                "must lie in [0, 1)",
                "min_relative_decrease",
                self.min_relative_decrease.to_f64().to_string(),
            ));
        }
        if self.initial_trust_region_radius <= zero {
            return Err(SolverError::invalid_configuration(
                "must be positive",
                "initial_trust_region_radius",
                self.initial_trust_region_radius.to_f64().to_string(),
            ));
        }
        if self.max_trust_region_radius < self.initial_trust_region_radius {
            return Err(SolverError::invalid_configuration(
                "must be at least initial_trust_region_radius",
                "max_trust_region_radius",
                self.max_trust_region_radius.to_f64().to_string(),
            ));
        }
        if self.min_trust_region_radius <= zero
            || self.min_trust_region_radius > self.initial_trust_region_radius
        {
            return Err(SolverError::invalid_configuration(
                "must be positive and at most initial_trust_region_radius",
                "min_trust_region_radius",
                self.min_trust_region_radius.to_f64().to_string(),
            ));
        }
        if self.use_nonmonotonic_steps && self.max_consecutive_nonmonotonic_steps == 0 {
            return Err(SolverError::invalid_configuration(
                "must be at least 1 when nonmonotonic steps are enabled",
                "max_consecutive_nonmonotonic_steps",
                "0",
            ));
        }
        if self.inner_iteration_tolerance < zero {
            return Err(SolverError::invalid_configuration(
                "must be non-negative",
                "inner_iteration_tolerance",
                self.inner_iteration_tolerance.to_f64().to_string(),
            ));
        }
        if self.eta <= zero || self.eta >= T::one() {
            return Err(SolverError::invalid_configuration(
                "must lie in (0, 1)",
                "eta",
                self.eta.to_f64().to_string(),
            ));
        }
        self.line_search.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrustRegionOptions::<f64>::default().validate().is_ok());
        assert!(TrustRegionOptions::<f32>::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = TrustRegionOptions::<f64>::new()
            .with_max_num_iterations(10)
            .with_initial_trust_region_radius(1.0)
            .with_nonmonotonic_steps(3)
            .with_constrained(true);
        assert_eq!(options.max_num_iterations, 10);
        assert!(options.use_nonmonotonic_steps);
        assert_eq!(options.max_consecutive_nonmonotonic_steps, 3);
        assert!(options.is_constrained);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let options = TrustRegionOptions::<f64>::new().with_function_tolerance(-1.0);
        let err = options.validate();
        assert!(matches!(
            err,
            Err(SolverError::InvalidConfiguration { parameter, .. })
                if parameter == "function_tolerance"
        ));
    }

    #[test]
    fn test_rejects_inverted_radius_bounds() {
        let options = TrustRegionOptions::<f64>::new()
            .with_initial_trust_region_radius(1e4)
            .with_max_trust_region_radius(1.0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_nonmonotonic_window() {
        let options = TrustRegionOptions::<f64>::new().with_nonmonotonic_steps(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_eta() {
        let options = TrustRegionOptions::<f64>::new().with_eta(1.5);
        assert!(options.validate().is_err());
    }
}
