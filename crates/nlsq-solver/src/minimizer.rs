//! Generic trust region loop for nonlinear least squares.
//!
//! The minimizer owns nothing problem specific. It drives an
//! [`Evaluator`] for cost and derivatives, a [`TrustRegionStrategy`] for
//! step proposals, a step acceptance policy, optional inner iterations
//! and an Armijo line search for constrained problems, and records one
//! [`IterationSummary`] per pass through the loop.
//!
//! # Algorithm
//!
//! Each iteration linearizes the problem at the current iterate, asks the
//! strategy for a step within the trust region, and computes the change
//! predicted by the linear model. Steps with non-positive predicted
//! change are invalid and only shrink the radius. For valid steps the
//! trial point is evaluated (optionally refined by inner iterations) and
//! the ratio of actual to predicted decrease decides acceptance. The
//! radius grows on good steps and shrinks on bad ones, so the loop
//! interpolates between Gauss-Newton and scaled gradient descent.
//!
//! # Contract
//!
//! `minimize` consumes the minimizer and always returns a populated
//! [`SolverSummary`], never an error. On return the caller's parameter
//! buffer holds the iterate with the lowest cost observed during the
//! whole solve, which is not necessarily the last accepted iterate when
//! nonmonotonic steps are enabled.

use std::time::Instant;

use nlsq_core::callback::IterationCallback;
use nlsq_core::evaluator::Evaluator;
use nlsq_core::inner_iteration::InnerIterationMinimizer;
use nlsq_core::jacobian::{jacobi_scale, Jacobian};
use nlsq_core::line_search::{ArmijoLineSearch, LineSearch};
use nlsq_core::strategy::{LinearSolverTermination, PerSolveOptions, TrustRegionStrategy};
use nlsq_core::summary::{IterationSummary, SolverSummary, TerminationType};
use nlsq_core::types::{DVector, Scalar};
use nlsq_core::SolverError;
use num_traits::Float;

use crate::options::TrustRegionOptions;
use crate::step_evaluator::{MonotonicStepEvaluator, StepEvaluator, TointStepEvaluator};

/// Trust region minimizer for nonlinear least-squares problems.
///
/// A minimizer is single use: construct it, configure it, call
/// [`minimize`](Self::minimize).
pub struct TrustRegionMinimizer<T, E, S>
where
    T: Scalar,
    E: Evaluator<T>,
    S: TrustRegionStrategy<T, E::Jacobian>,
{
    options: TrustRegionOptions<T>,
    evaluator: E,
    strategy: S,
    line_search: ArmijoLineSearch,
    callbacks: Vec<Box<dyn IterationCallback<T>>>,
    inner_iteration_minimizer: Option<Box<dyn InnerIterationMinimizer<T, E>>>,

    jacobian: E::Jacobian,
    x: DVector<T>,
    x_norm: T,
    residuals: DVector<T>,
    gradient: DVector<T>,
    negative_gradient: DVector<T>,
    projected_gradient_step: DVector<T>,
    trust_region_step: DVector<T>,
    delta: DVector<T>,
    x_plus_delta: DVector<T>,
    model_residuals: DVector<T>,
    scale: DVector<T>,

    cost: T,
    model_cost_change: T,
    num_consecutive_invalid_steps: usize,
    inner_iterations_are_enabled: bool,
    inner_iterations_were_useful: bool,

    iteration_summary: IterationSummary<T>,
    summary: SolverSummary<T>,
    start_time: Instant,
    iteration_start_time: Instant,
}

impl<T, E, S> TrustRegionMinimizer<T, E, S>
where
    T: Scalar,
    E: Evaluator<T>,
    S: TrustRegionStrategy<T, E::Jacobian>,
{
    /// Creates a minimizer for the given problem and strategy.
    pub fn new(options: TrustRegionOptions<T>, evaluator: E, strategy: S) -> Self {
        let num_parameters = evaluator.num_parameters();
        let num_effective = evaluator.num_effective_parameters();
        let num_residuals = evaluator.num_residuals();
        let jacobian = evaluator.create_jacobian();
        let now = Instant::now();
        Self {
            options,
            evaluator,
            strategy,
            line_search: ArmijoLineSearch::new(),
            callbacks: Vec::new(),
            inner_iteration_minimizer: None,
            jacobian,
            x: DVector::zeros(num_parameters),
            x_norm: T::zero(),
            residuals: DVector::zeros(num_residuals),
            gradient: DVector::zeros(num_effective),
            negative_gradient: DVector::zeros(num_effective),
            projected_gradient_step: DVector::zeros(num_parameters),
            trust_region_step: DVector::zeros(num_effective),
            delta: DVector::zeros(num_effective),
            x_plus_delta: DVector::zeros(num_parameters),
            model_residuals: DVector::zeros(num_residuals),
            scale: DVector::from_element(num_effective, T::one()),
            cost: T::zero(),
            model_cost_change: T::zero(),
            num_consecutive_invalid_steps: 0,
            inner_iterations_are_enabled: false,
            inner_iterations_were_useful: false,
            iteration_summary: IterationSummary::default(),
            summary: SolverSummary::new(),
            start_time: now,
            iteration_start_time: now,
        }
    }

    /// Registers an iteration callback.
    pub fn with_callback(mut self, callback: Box<dyn IterationCallback<T>>) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Enables inner iterations using the given secondary minimizer.
    pub fn with_inner_iteration_minimizer(
        mut self,
        minimizer: Box<dyn InnerIterationMinimizer<T, E>>,
    ) -> Self {
        self.inner_iteration_minimizer = Some(minimizer);
        self.inner_iterations_are_enabled = true;
        self
    }

    /// Runs the minimization starting from `parameters`.
    ///
    /// On return `parameters` holds the lowest-cost iterate observed.
    /// The summary is always populated; inspect
    /// [`SolverSummary::termination`] and
    /// [`SolverSummary::message`] to find out how the solve ended.
    pub fn minimize(mut self, parameters: &mut DVector<T>) -> SolverSummary<T> {
        self.start_time = Instant::now();
        self.iteration_start_time = self.start_time;

        if let Err(err) = self.options.validate() {
            return self.fail(err.to_string());
        }
        if parameters.len() != self.evaluator.num_parameters() {
            let err = SolverError::invalid_configuration(
                "parameter vector length does not match the evaluator",
                "parameters",
                parameters.len().to_string(),
            );
            return self.fail(err.to_string());
        }

        self.x.copy_from(parameters);
        self.x_norm = self.x.norm();

        if !self.iteration_zero() {
            return self.finish();
        }

        // The projection in iteration zero may have moved the point.
        parameters.copy_from(&self.x);

        let mut step_evaluator: Box<dyn StepEvaluator<T>> = if self.options.use_nonmonotonic_steps
        {
            Box::new(TointStepEvaluator::new(
                self.cost,
                self.options.max_consecutive_nonmonotonic_steps,
            ))
        } else {
            Box::new(MonotonicStepEvaluator::new(self.cost))
        };
        let mut minimum_cost = self.cost;

        while self.finalize_iteration_and_check_if_minimizer_can_continue() {
            self.iteration_start_time = Instant::now();
            let next_iteration = self
                .summary
                .iterations
                .last()
                .map(|s| s.iteration + 1)
                .unwrap_or(1);
            self.iteration_summary = IterationSummary {
                iteration: next_iteration,
                eta: self.options.eta,
                ..IterationSummary::default()
            };

            if !self.compute_trust_region_step() {
                break;
            }
            if !self.iteration_summary.step_is_valid {
                if !self.handle_invalid_step() {
                    break;
                }
                continue;
            }

            self.num_consecutive_invalid_steps = 0;
            // Undo the Jacobian column scaling to get a step in the
            // unscaled tangent space.
            self.delta = self.trust_region_step.component_mul(&self.scale);

            if self.options.is_constrained {
                self.do_line_search();
            }

            // A trial point that cannot be evaluated is treated as a
            // step with infinite cost and left to the acceptance test.
            let mut plus_failed = false;
            let mut new_cost = <T as Float>::infinity();
            match self
                .evaluator
                .plus(&self.x, &self.delta, &mut self.x_plus_delta)
            {
                Ok(()) => {
                    if let Ok(cost) = self.evaluator.evaluate_cost(&self.x_plus_delta) {
                        new_cost = cost;
                    }
                }
                Err(_) => {
                    plus_failed = true;
                    self.x_plus_delta.copy_from(&self.x);
                }
            }

            if <T as Float>::is_finite(new_cost) && self.inner_iterations_are_enabled {
                new_cost = self.do_inner_iterations(new_cost);
            }

            self.iteration_summary.cost_change = self.cost - new_cost;
            self.iteration_summary.step_norm = (&self.x - &self.x_plus_delta).norm();

            // Convergence based on parameter tolerance. Skipped when the
            // trial point is not a real step.
            if !plus_failed {
                let step_size_tolerance = self.options.parameter_tolerance
                    * (self.x_norm + self.options.parameter_tolerance);
                if self.iteration_summary.step_norm <= step_size_tolerance {
                    self.summary.message = format!(
                        "Parameter tolerance reached. Relative step norm: {:e} <= {:e}.",
                        self.iteration_summary.step_norm
                            / (self.x_norm + self.options.parameter_tolerance),
                        self.options.parameter_tolerance
                    );
                    self.summary.termination = TerminationType::Convergence;
                    break;
                }
            }

            let absolute_function_tolerance = self.options.function_tolerance * self.cost;
            if <T as Float>::abs(self.iteration_summary.cost_change)
                <= absolute_function_tolerance
            {
                self.summary.message = format!(
                    "Function tolerance reached. |cost_change|/cost: {:e} <= {:e}.",
                    <T as Float>::abs(self.iteration_summary.cost_change) / self.cost,
                    self.options.function_tolerance
                );
                self.summary.termination = TerminationType::Convergence;
                break;
            }

            self.iteration_summary.relative_decrease =
                step_evaluator.step_quality(new_cost, self.model_cost_change);
            self.iteration_summary.step_is_successful = self.inner_iterations_were_useful
                || self.iteration_summary.relative_decrease > self.options.min_relative_decrease;

            if !self.iteration_summary.step_is_successful {
                self.summary.num_unsuccessful_steps += 1;
                self.strategy
                    .step_rejected(self.iteration_summary.relative_decrease);
                step_evaluator.step_rejected(new_cost, self.model_cost_change);
                self.iteration_summary.cost = new_cost;
                continue;
            }

            self.summary.num_successful_steps += 1;
            self.strategy
                .step_accepted(self.iteration_summary.relative_decrease);
            step_evaluator.step_accepted(new_cost, self.model_cost_change);

            self.x.copy_from(&self.x_plus_delta);
            self.x_norm = self.x.norm();
            if !self.evaluate_gradient_and_jacobian() {
                break;
            }

            if self.cost < minimum_cost {
                minimum_cost = self.cost;
                parameters.copy_from(&self.x);
            }
        }

        self.summary.final_cost = minimum_cost;
        self.finish()
    }

    fn fail(mut self, message: String) -> SolverSummary<T> {
        self.summary.message = message;
        self.summary.termination = TerminationType::Failure;
        self.finish()
    }

    fn finish(mut self) -> SolverSummary<T> {
        self.summary.total_time = self.start_time.elapsed();
        self.summary
    }

    /// Evaluates the initial point and records iteration 0.
    fn iteration_zero(&mut self) -> bool {
        self.iteration_summary = IterationSummary {
            eta: self.options.eta,
            ..IterationSummary::default()
        };

        if self.options.is_constrained {
            // Project the initial point onto the feasible set.
            self.delta.fill(T::zero());
            if self
                .evaluator
                .plus(&self.x, &self.delta, &mut self.x_plus_delta)
                .is_err()
            {
                self.summary.message =
                    "Unable to project the initial point onto the feasible set.".to_string();
                self.summary.termination = TerminationType::Failure;
                return false;
            }
            self.x.copy_from(&self.x_plus_delta);
            self.x_norm = self.x.norm();
        }

        if !self.evaluate_gradient_and_jacobian() {
            return false;
        }

        self.summary.initial_cost = self.cost;
        self.summary.final_cost = self.cost;
        true
    }

    /// Evaluates cost, residuals, gradient and Jacobian at the current
    /// iterate, applies Jacobi scaling and computes the projected
    /// gradient norms. A failure here is fatal since the iterate has
    /// already been accepted.
    fn evaluate_gradient_and_jacobian(&mut self) -> bool {
        match self.evaluator.evaluate(
            &self.x,
            &mut self.residuals,
            &mut self.gradient,
            &mut self.jacobian,
        ) {
            Ok(cost) => self.cost = cost,
            Err(err) => {
                self.summary.message = format!("Residual and Jacobian evaluation failed: {err}");
                self.summary.termination = TerminationType::Failure;
                return false;
            }
        }

        self.iteration_summary.cost = self.cost;

        if self.options.jacobi_scaling {
            if self.iteration_summary.iteration == 0 {
                self.scale = jacobi_scale(&self.jacobian.squared_column_norms());
            }
            // The evaluator writes a fresh Jacobian each time, so the
            // scaling is re-applied with the scale from iteration 0.
            self.jacobian.scale_columns(&self.scale);
        }

        self.negative_gradient.copy_from(&self.gradient);
        self.negative_gradient.neg_mut();
        if let Err(err) = self.evaluator.plus(
            &self.x,
            &self.negative_gradient,
            &mut self.projected_gradient_step,
        ) {
            self.summary.message = format!("Projected gradient step failed: {err}");
            self.summary.termination = TerminationType::Failure;
            return false;
        }

        let projected = &self.x - &self.projected_gradient_step;
        self.iteration_summary.gradient_max_norm = projected
            .iter()
            .fold(T::zero(), |acc, v| <T as Float>::max(acc, <T as Float>::abs(*v)));
        self.iteration_summary.gradient_norm = projected.norm();
        true
    }

    /// Records the current iteration and decides whether the loop keeps
    /// running. Returns `false` on any terminating condition.
    fn finalize_iteration_and_check_if_minimizer_can_continue(&mut self) -> bool {
        self.iteration_summary.trust_region_radius = self.strategy.radius();
        self.iteration_summary.iteration_time = self.iteration_start_time.elapsed();
        self.iteration_summary.cumulative_time = self.start_time.elapsed();
        self.summary.iterations.push(self.iteration_summary.clone());

        for callback in self.callbacks.iter_mut() {
            match callback.on_iteration_end(&self.iteration_summary) {
                Ok(true) => {}
                Ok(false) => {
                    self.summary.message = "Terminated by user callback.".to_string();
                    self.summary.termination = TerminationType::UserTerminated;
                    return false;
                }
                Err(err) => {
                    self.summary.message = format!("Iteration callback failed: {err}");
                    self.summary.termination = TerminationType::UserTerminated;
                    return false;
                }
            }
        }

        if let Some(budget) = self.options.max_solver_time {
            if self.start_time.elapsed() >= budget {
                self.summary.message = "Maximum solver time reached.".to_string();
                self.summary.termination = TerminationType::NoConvergence;
                return false;
            }
        }

        if self.iteration_summary.iteration >= self.options.max_num_iterations {
            self.summary.message = "Maximum number of iterations reached.".to_string();
            self.summary.termination = TerminationType::NoConvergence;
            return false;
        }

        // The gradient is only current at the start and after accepted
        // steps; in between it refers to the last accepted iterate.
        if (self.iteration_summary.step_is_successful || self.iteration_summary.iteration == 0)
            && self.iteration_summary.gradient_max_norm <= self.options.gradient_tolerance
        {
            self.summary.message = format!(
                "Gradient tolerance reached. Gradient max norm: {:e} <= {:e}.",
                self.iteration_summary.gradient_max_norm, self.options.gradient_tolerance
            );
            self.summary.termination = TerminationType::Convergence;
            return false;
        }

        if self.iteration_summary.trust_region_radius < self.options.min_trust_region_radius {
            self.summary.message = "Minimum trust region radius reached.".to_string();
            self.summary.termination = TerminationType::Convergence;
            return false;
        }

        true
    }

    /// Asks the strategy for a step and computes the model cost change.
    /// Returns `false` only on a fatal linear solver error.
    fn compute_trust_region_step(&mut self) -> bool {
        let step_start_time = Instant::now();
        let per_solve_options = PerSolveOptions {
            eta: self.options.eta,
        };
        let strategy_summary = self.strategy.compute_step(
            &per_solve_options,
            &self.jacobian,
            &self.residuals,
            &mut self.trust_region_step,
        );

        if strategy_summary.termination == LinearSolverTermination::FatalError {
            self.summary.message =
                "Linear solver failed due to unrecoverable non-numeric causes.".to_string();
            self.summary.termination = TerminationType::Failure;
            return false;
        }

        self.iteration_summary.step_solver_time = step_start_time.elapsed();
        self.iteration_summary.linear_solver_iterations = strategy_summary.num_iterations;

        if strategy_summary.termination == LinearSolverTermination::Failure {
            self.iteration_summary.step_is_valid = false;
            return true;
        }

        // With new_model_cost = 1/2 |r + J step|^2, the decrease
        // predicted by the model is
        //   model_cost_change = cost - new_model_cost
        //                     = -(J step)' (r + J step / 2).
        self.jacobian
            .right_multiply(&self.trust_region_step, &mut self.model_residuals);
        let half = <T as Scalar>::from_f64(0.5);
        self.model_cost_change = -self
            .model_residuals
            .dot(&(&self.residuals + &self.model_residuals * half));

        // A step is only valid if the model predicts an actual decrease;
        // zero or negative predictions come from round-off or solver
        // breakdown and cannot pass the acceptance test.
        self.iteration_summary.step_is_valid = self.model_cost_change > T::zero();
        true
    }

    /// Books an invalid step as unsuccessful and shrinks the radius.
    /// Returns `false` once too many consecutive steps were invalid.
    fn handle_invalid_step(&mut self) -> bool {
        self.num_consecutive_invalid_steps += 1;
        if self.num_consecutive_invalid_steps >= self.options.max_num_consecutive_invalid_steps {
            self.summary.message = format!(
                "Number of consecutive invalid steps reached the limit of {}.",
                self.options.max_num_consecutive_invalid_steps
            );
            self.summary.termination = TerminationType::Failure;
            return false;
        }

        self.summary.num_unsuccessful_steps += 1;
        self.strategy.step_is_invalid();

        // The radius will shrink and the step will be recomputed. The
        // iteration summary records a zero-length step with no progress;
        // the gradient norms still refer to the last accepted iterate.
        self.iteration_summary.cost = self.cost;
        self.iteration_summary.cost_change = T::zero();
        self.iteration_summary.step_norm = T::zero();
        self.iteration_summary.relative_decrease = T::zero();
        if let Some(previous) = self.summary.iterations.last() {
            self.iteration_summary.gradient_max_norm = previous.gradient_max_norm;
            self.iteration_summary.gradient_norm = previous.gradient_norm;
        }
        true
    }

    /// Runs the secondary minimizer on the trial point and adopts the
    /// refinement when it can be evaluated. Disables itself once the
    /// relative improvement drops below the tolerance.
    fn do_inner_iterations(&mut self, new_cost: T) -> T {
        let minimizer = match self.inner_iteration_minimizer.as_mut() {
            Some(minimizer) => minimizer,
            None => return new_cost,
        };

        self.summary.num_inner_iteration_steps += 1;
        let mut refined = self.x_plus_delta.clone();
        if minimizer.minimize(&mut self.evaluator, &mut refined).is_err() {
            return new_cost;
        }
        let inner_cost = match self.evaluator.evaluate_cost(&refined) {
            Ok(cost) => cost,
            Err(_) => return new_cost,
        };
        self.x_plus_delta.copy_from(&refined);

        self.model_cost_change += new_cost - inner_cost;
        self.inner_iterations_were_useful = inner_cost < self.cost;
        let relative_progress = T::one() - inner_cost / new_cost;
        self.inner_iterations_are_enabled =
            relative_progress > self.options.inner_iteration_tolerance;
        inner_cost
    }

    /// Safeguards the step on constrained problems: backtracks along
    /// `delta` until the Armijo condition holds. A failed search leaves
    /// the step unchanged.
    fn do_line_search(&mut self) {
        let directional_derivative = self.gradient.dot(&self.delta);
        let initial_cost = self.cost;
        let mut probe = DVector::zeros(self.evaluator.num_parameters());
        let mut scaled_delta = DVector::zeros(self.delta.len());

        let result = {
            let evaluator = &mut self.evaluator;
            let x = &self.x;
            let delta = &self.delta;
            let mut objective = |step_size: T| -> Option<T> {
                scaled_delta.copy_from(delta);
                scaled_delta *= step_size;
                if evaluator.plus(x, &scaled_delta, &mut probe).is_err() {
                    return None;
                }
                evaluator.evaluate_cost(&probe).ok()
            };
            self.line_search.search(
                &mut objective,
                T::one(),
                initial_cost,
                directional_derivative,
                &self.options.line_search,
            )
        };

        match result {
            Ok(line_search_summary) => {
                self.summary.num_line_search_steps += line_search_summary.num_iterations;
                self.delta *= line_search_summary.step_size;
            }
            Err(SolverError::LineSearchFailed { iterations, .. }) => {
                self.summary.num_line_search_steps += iterations;
            }
            Err(_) => {}
        }
    }
}
