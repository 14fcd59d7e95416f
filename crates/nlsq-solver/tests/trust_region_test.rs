//! Integration tests for the trust region minimizer.

use std::time::Duration;

use approx::assert_relative_eq;
use nlsq_core::callback::IterationCallback;
use nlsq_core::error::{EvaluatorError, EvaluatorResult, SolverResult};
use nlsq_core::evaluator::Evaluator;
use nlsq_core::inner_iteration::InnerIterationMinimizer;
use nlsq_core::jacobian::DenseJacobian;
use nlsq_core::strategy::{
    LinearSolverTermination, PerSolveOptions, StrategySummary, TrustRegionStrategy,
};
use nlsq_core::summary::{IterationSummary, TerminationType};
use nlsq_core::test_problems::{LinearProblem, TranslationProblem};
use nlsq_core::types::{DMatrix, DVector};
use nlsq_solver::{LevenbergMarquardtStrategy, TrustRegionMinimizer, TrustRegionOptions};

fn lm_strategy(options: &TrustRegionOptions<f64>) -> LevenbergMarquardtStrategy<f64> {
    LevenbergMarquardtStrategy::new(
        options.initial_trust_region_radius,
        options.max_trust_region_radius,
    )
}

#[test]
fn test_converges_on_translation_problem() {
    let target = DVector::from_vec(vec![1.0, -2.0, 0.5]);
    let problem = TranslationProblem::new(target.clone());
    let options = TrustRegionOptions::default();
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(3);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    for i in 0..3 {
        assert_relative_eq!(x[i], target[i], epsilon = 1e-6);
    }
    assert_relative_eq!(summary.initial_cost, 0.5 * target.norm_squared());
    assert!(summary.final_cost < 1e-10);
    assert!(summary.num_successful_steps >= 1);

    // Iteration 0 records the initial evaluation, not a step.
    let first = &summary.iterations[0];
    assert_eq!(first.iteration, 0);
    assert!(!first.step_is_valid);
    assert_relative_eq!(first.cost, summary.initial_cost);
}

#[test]
fn test_converges_on_linear_least_squares() {
    let a = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0, 4.0]);
    let b = DVector::from_vec(vec![6.0, 5.0, 7.0, 10.0]);
    // Normal equations solution, for comparison.
    let expected = (a.tr_mul(&a))
        .cholesky()
        .map(|chol| chol.solve(&a.tr_mul(&b)))
        .unwrap();

    let problem = LinearProblem::new(a, b);
    // The minimum cost is far from zero here, so the default function
    // tolerance stops while the iterate is still ~1e-4 away from the
    // normal equations solution. Tighten it to get a sharp answer.
    let options = TrustRegionOptions::default().with_function_tolerance(1e-12);
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(2);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    assert_relative_eq!(x[0], expected[0], epsilon = 1e-5);
    assert_relative_eq!(x[1], expected[1], epsilon = 1e-5);
    assert!(summary.final_cost <= summary.initial_cost);
}

#[test]
fn test_nonmonotonic_steps_converge_on_convex_problem() {
    let target = DVector::from_vec(vec![3.0, -1.0]);
    let problem = TranslationProblem::new(target.clone());
    let options = TrustRegionOptions::default().with_nonmonotonic_steps(5);
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(2);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    assert_relative_eq!(x[0], target[0], epsilon = 1e-6);
    assert_relative_eq!(x[1], target[1], epsilon = 1e-6);
}

/// Evaluator whose trial-point evaluations always fail, while full
/// evaluations at accepted iterates succeed.
struct FailingTrialPoints {
    inner: TranslationProblem<f64>,
}

impl Evaluator<f64> for FailingTrialPoints {
    type Jacobian = DenseJacobian<f64>;

    fn num_parameters(&self) -> usize {
        self.inner.num_parameters()
    }

    fn num_effective_parameters(&self) -> usize {
        self.inner.num_effective_parameters()
    }

    fn num_residuals(&self) -> usize {
        self.inner.num_residuals()
    }

    fn create_jacobian(&self) -> Self::Jacobian {
        self.inner.create_jacobian()
    }

    fn evaluate(
        &mut self,
        x: &DVector<f64>,
        residuals: &mut DVector<f64>,
        gradient: &mut DVector<f64>,
        jacobian: &mut Self::Jacobian,
    ) -> EvaluatorResult<f64> {
        self.inner.evaluate(x, residuals, gradient, jacobian)
    }

    fn evaluate_cost(&mut self, _x: &DVector<f64>) -> EvaluatorResult<f64> {
        Err(EvaluatorError::evaluation_failed("trial point out of domain"))
    }

    fn plus(
        &self,
        x: &DVector<f64>,
        delta: &DVector<f64>,
        x_plus_delta: &mut DVector<f64>,
    ) -> EvaluatorResult<()> {
        self.inner.plus(x, delta, x_plus_delta)
    }
}

#[test]
fn test_unevaluable_trial_points_are_rejected_not_fatal() {
    let x0 = DVector::from_vec(vec![1.0, 1.0]);
    let problem = FailingTrialPoints {
        inner: TranslationProblem::new(DVector::from_vec(vec![4.0, -4.0])),
    };
    let options = TrustRegionOptions::default().with_max_num_iterations(5);
    let strategy = lm_strategy(&options);

    let mut x = x0.clone();
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    // Every trial point has infinite cost, so every step is rejected and
    // the iteration budget runs out. The solve is not a failure and the
    // parameters are untouched.
    assert_eq!(summary.termination, TerminationType::NoConvergence, "{}", summary.message);
    assert_eq!(summary.num_successful_steps, 0);
    assert_eq!(summary.num_unsuccessful_steps, 5);
    assert_relative_eq!(summary.final_cost, summary.initial_cost);
    assert_eq!(x, x0);
}

/// Strategy that always proposes a zero step, making every step invalid.
struct ZeroStepStrategy {
    radius: f64,
}

impl TrustRegionStrategy<f64, DenseJacobian<f64>> for ZeroStepStrategy {
    fn compute_step(
        &mut self,
        _per_solve_options: &PerSolveOptions<f64>,
        _jacobian: &DenseJacobian<f64>,
        _residuals: &DVector<f64>,
        step: &mut DVector<f64>,
    ) -> StrategySummary {
        step.fill(0.0);
        StrategySummary {
            num_iterations: 1,
            termination: LinearSolverTermination::Success,
        }
    }

    fn step_accepted(&mut self, _step_quality: f64) {}

    fn step_rejected(&mut self, _step_quality: f64) {
        self.radius /= 2.0;
    }

    fn step_is_invalid(&mut self) {
        self.step_rejected(0.0);
    }

    fn radius(&self) -> f64 {
        self.radius
    }
}

#[test]
fn test_consecutive_invalid_steps_terminate_with_failure() {
    let problem = TranslationProblem::new(DVector::from_vec(vec![2.0]));
    let options = TrustRegionOptions::<f64>::default().with_max_num_consecutive_invalid_steps(3);
    let strategy = ZeroStepStrategy { radius: 1.0 };

    let mut x = DVector::zeros(1);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Failure);
    assert!(summary.message.contains("invalid steps"), "{}", summary.message);
    // Iteration 0 plus the tolerated invalid iterations are recorded;
    // the terminating iteration is not.
    assert_eq!(summary.iterations.len(), 3);
    assert_eq!(summary.num_unsuccessful_steps, 2);
    assert!(summary.iterations[1..].iter().all(|s| !s.step_is_valid));
}

/// Inner minimizer that pulls the trial point halfway towards the target.
struct HalfwayRefiner {
    target: DVector<f64>,
}

impl InnerIterationMinimizer<f64, TranslationProblem<f64>> for HalfwayRefiner {
    fn minimize(
        &mut self,
        _evaluator: &mut TranslationProblem<f64>,
        x: &mut DVector<f64>,
    ) -> EvaluatorResult<()> {
        let correction = (&self.target - &*x) * 0.5;
        *x += correction;
        Ok(())
    }
}

/// Inner minimizer that never improves the trial point.
struct IdleRefiner;

impl InnerIterationMinimizer<f64, TranslationProblem<f64>> for IdleRefiner {
    fn minimize(
        &mut self,
        _evaluator: &mut TranslationProblem<f64>,
        _x: &mut DVector<f64>,
    ) -> EvaluatorResult<()> {
        Ok(())
    }
}

#[test]
fn test_inner_iterations_refine_trial_points() {
    let target = DVector::from_vec(vec![2.0, -1.0, 4.0]);
    let problem = TranslationProblem::new(target.clone());
    let options = TrustRegionOptions::default();
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(3);
    let summary = TrustRegionMinimizer::new(options, problem, strategy)
        .with_inner_iteration_minimizer(Box::new(HalfwayRefiner {
            target: target.clone(),
        }))
        .minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    // Each trial point's cost drops by 4x under the refiner, well above
    // the tolerance, so inner iterations keep running on every trial.
    assert!(summary.num_inner_iteration_steps >= 2);
    assert!(summary.num_inner_iteration_steps >= summary.num_successful_steps);
    for i in 0..3 {
        assert_relative_eq!(x[i], target[i], epsilon = 1e-6);
    }
}

#[test]
fn test_unproductive_inner_iterations_disable_themselves() {
    let target = DVector::from_vec(vec![2.0, -1.0]);
    let problem = TranslationProblem::new(target.clone());
    let options = TrustRegionOptions::default();
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(2);
    let summary = TrustRegionMinimizer::new(options, problem, strategy)
        .with_inner_iteration_minimizer(Box::new(IdleRefiner))
        .minimize(&mut x);

    // The refiner makes no progress, so after one attempt the inner
    // iterations switch off and the solve proceeds without them.
    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    assert_eq!(summary.num_inner_iteration_steps, 1);
    assert_relative_eq!(x[0], target[0], epsilon = 1e-6);
    assert_relative_eq!(x[1], target[1], epsilon = 1e-6);
}

struct StopAfter {
    remaining: usize,
}

impl IterationCallback<f64> for StopAfter {
    fn on_iteration_end(&mut self, _summary: &IterationSummary<f64>) -> SolverResult<bool> {
        if self.remaining == 0 {
            return Ok(false);
        }
        self.remaining -= 1;
        Ok(true)
    }
}

#[test]
fn test_callback_stop_reports_user_termination() {
    let problem = TranslationProblem::new(DVector::from_vec(vec![2.0, 2.0]));
    let options = TrustRegionOptions::default();
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(2);
    let summary = TrustRegionMinimizer::new(options, problem, strategy)
        .with_callback(Box::new(StopAfter { remaining: 0 }))
        .minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::UserTerminated);
    assert_eq!(summary.iterations.len(), 1);
    assert!(summary.is_usable());
}

struct CountingCallback {
    seen: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl IterationCallback<f64> for CountingCallback {
    fn on_iteration_end(&mut self, _summary: &IterationSummary<f64>) -> SolverResult<bool> {
        self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(true)
    }
}

#[test]
fn test_callback_sees_every_recorded_iteration() {
    let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let problem = TranslationProblem::new(DVector::from_vec(vec![1.0, 2.0, 3.0]));
    let options = TrustRegionOptions::default();
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(3);
    let summary = TrustRegionMinimizer::new(options, problem, strategy)
        .with_callback(Box::new(CountingCallback { seen: seen.clone() }))
        .minimize(&mut x);

    assert_eq!(
        seen.load(std::sync::atomic::Ordering::SeqCst),
        summary.iterations.len()
    );
}

#[test]
fn test_zero_time_budget_stops_after_iteration_zero() {
    let problem = TranslationProblem::new(DVector::from_vec(vec![2.0]));
    let options = TrustRegionOptions::default().with_max_solver_time(Duration::ZERO);
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(1);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::NoConvergence);
    assert!(summary.message.contains("time"), "{}", summary.message);
    assert_eq!(summary.iterations.len(), 1);
}

#[test]
fn test_zero_iteration_budget_stops_after_iteration_zero() {
    let problem = TranslationProblem::new(DVector::from_vec(vec![2.0]));
    let options = TrustRegionOptions::default().with_max_num_iterations(0);
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(1);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::NoConvergence);
    assert!(summary.message.contains("iterations"), "{}", summary.message);
    assert_eq!(summary.iterations.len(), 1);
}

#[test]
fn test_invalid_options_fail_before_evaluating() {
    let problem = TranslationProblem::new(DVector::from_vec(vec![2.0]));
    let options = TrustRegionOptions::default().with_function_tolerance(-1.0);
    let strategy = lm_strategy(&TrustRegionOptions::default());

    let mut x = DVector::zeros(1);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Failure);
    assert!(summary.message.contains("function_tolerance"), "{}", summary.message);
    assert!(summary.iterations.is_empty());
}

#[test]
fn test_constrained_solve_runs_the_line_search() {
    let target = DVector::from_vec(vec![4.0, -3.0]);
    let problem = TranslationProblem::new(target.clone());
    let options = TrustRegionOptions::default().with_constrained(true);
    let strategy = lm_strategy(&options);

    let mut x = DVector::zeros(2);
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    assert!(summary.num_line_search_steps >= 1);
    assert_relative_eq!(x[0], target[0], epsilon = 1e-6);
    assert_relative_eq!(x[1], target[1], epsilon = 1e-6);
}

#[test]
fn test_starting_at_the_minimum_converges_immediately() {
    let target = DVector::from_vec(vec![1.5, 2.5]);
    let problem = TranslationProblem::new(target.clone());
    let options = TrustRegionOptions::default();
    let strategy = lm_strategy(&options);

    let mut x = target.clone();
    let summary = TrustRegionMinimizer::new(options, problem, strategy).minimize(&mut x);

    // The gradient vanishes at the minimum, so iteration 0 already
    // satisfies the gradient tolerance.
    assert_eq!(summary.termination, TerminationType::Convergence, "{}", summary.message);
    assert_eq!(summary.iterations.len(), 1);
    assert_eq!(x, target);
}
