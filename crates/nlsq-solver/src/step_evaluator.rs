//! Step acceptance policies for the trust region minimizer.
//!
//! After the trust region strategy proposes a step, the minimizer asks a
//! step evaluator how good the step is. The quality is the ratio of the
//! actual cost decrease to the decrease predicted by the linearized model;
//! steps whose quality exceeds `min_relative_decrease` are accepted.
//!
//! Two policies are provided. [`MonotonicStepEvaluator`] measures the
//! decrease against the cost of the current iterate, so the cost sequence
//! is strictly decreasing. [`TointStepEvaluator`] implements the
//! nonmonotonic acceptance of Conn, Gould & Toint ("Trust Region
//! Methods", Algorithm 10.1.2), which also measures the decrease against a
//! slowly moving reference cost and can therefore accept steps that
//! increase the cost locally. This helps the minimizer escape regions of
//! shallow progress at the price of a temporarily higher cost.

use std::fmt::Debug;

use nlsq_core::types::Scalar;
use num_traits::Float;

/// Ranks trial points produced by the trust region strategy.
pub trait StepEvaluator<T: Scalar>: Debug {
    /// Quality of moving to a point with cost `cost`, where the linear
    /// model predicted a decrease of `model_cost_change`.
    fn step_quality(&self, cost: T, model_cost_change: T) -> T;

    /// Informs the evaluator that the step was accepted and the iterate
    /// now has cost `cost`.
    fn step_accepted(&mut self, cost: T, model_cost_change: T);

    /// Informs the evaluator that the step was rejected.
    fn step_rejected(&mut self, _cost: T, _model_cost_change: T) {}
}

/// Classical step acceptance: quality is the decrease relative to the
/// cost of the current iterate.
#[derive(Debug, Clone)]
pub struct MonotonicStepEvaluator<T: Scalar> {
    current_cost: T,
}

impl<T: Scalar> MonotonicStepEvaluator<T> {
    /// Creates an evaluator anchored at the initial cost.
    pub fn new(initial_cost: T) -> Self {
        Self {
            current_cost: initial_cost,
        }
    }
}

impl<T: Scalar> StepEvaluator<T> for MonotonicStepEvaluator<T> {
    fn step_quality(&self, cost: T, model_cost_change: T) -> T {
        (self.current_cost - cost) / model_cost_change
    }

    fn step_accepted(&mut self, cost: T, _model_cost_change: T) {
        self.current_cost = cost;
    }
}

/// Nonmonotonic step acceptance, Algorithm 10.1.2 of Conn, Gould &
/// Toint.
///
/// The quality of a step is the better of the classical ratio and a
/// historical ratio measured against a reference cost. The reference is
/// re-anchored at the worst cost seen since the last improvement of the
/// overall minimum once `window` consecutive non-improving steps have
/// been accepted.
#[derive(Debug, Clone)]
pub struct TointStepEvaluator<T: Scalar> {
    window: usize,
    minimum_cost: T,
    current_cost: T,
    reference_cost: T,
    candidate_cost: T,
    accumulated_reference_model_cost_change: T,
    accumulated_candidate_model_cost_change: T,
    num_consecutive_nonmonotonic_steps: usize,
}

impl<T: Scalar> TointStepEvaluator<T> {
    /// Creates an evaluator anchored at the initial cost.
    ///
    /// `window` is the number of consecutive non-improving accepted steps
    /// after which the reference cost is re-anchored. It must be at
    /// least 1; a window of zero degenerates to monotonic acceptance,
    /// for which [`MonotonicStepEvaluator`] should be used instead.
    pub fn new(initial_cost: T, window: usize) -> Self {
        debug_assert!(window >= 1);
        Self {
            window,
            minimum_cost: initial_cost,
            current_cost: initial_cost,
            reference_cost: initial_cost,
            candidate_cost: initial_cost,
            accumulated_reference_model_cost_change: T::zero(),
            accumulated_candidate_model_cost_change: T::zero(),
            num_consecutive_nonmonotonic_steps: 0,
        }
    }
}

impl<T: Scalar> StepEvaluator<T> for TointStepEvaluator<T> {
    fn step_quality(&self, cost: T, model_cost_change: T) -> T {
        let relative_decrease = (self.current_cost - cost) / model_cost_change;
        let historical_relative_decrease = (self.reference_cost - cost)
            / (self.accumulated_reference_model_cost_change + model_cost_change);
        <T as Float>::max(relative_decrease, historical_relative_decrease)
    }

    fn step_accepted(&mut self, cost: T, model_cost_change: T) {
        self.current_cost = cost;
        self.accumulated_candidate_model_cost_change += model_cost_change;
        self.accumulated_reference_model_cost_change += model_cost_change;

        if self.current_cost < self.minimum_cost {
            self.minimum_cost = self.current_cost;
            self.num_consecutive_nonmonotonic_steps = 0;
            self.candidate_cost = self.current_cost;
            self.accumulated_candidate_model_cost_change = T::zero();
        } else {
            // The iterate is still above the best cost seen so far. The
            // candidate tracks the worst cost in this stretch; once the
            // stretch reaches the window length it becomes the new
            // reference.
            self.num_consecutive_nonmonotonic_steps += 1;
            if self.current_cost > self.candidate_cost {
                self.candidate_cost = self.current_cost;
                self.accumulated_candidate_model_cost_change = T::zero();
            }
        }

        if self.num_consecutive_nonmonotonic_steps == self.window {
            self.reference_cost = self.candidate_cost;
            self.accumulated_reference_model_cost_change =
                self.accumulated_candidate_model_cost_change;
        }
    }
}
