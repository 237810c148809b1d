//! Inverse-kinematics solver capability and a gradient-descent reference
//! implementation.
//!
//! The planner projects candidate configurations onto the constraint
//! manifold by minimizing a scalar metric over the linearized configuration
//! vector. Production deployments wire in a nonlinear-programming solver;
//! the reference implementation here is a bounded projected gradient descent
//! which is sufficient for smooth metrics and keeps the crate usable without
//! external solver bindings.

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame_traits::JointLimit;
use crate::plan_error::PlanError;

/// The solver capability the planner consumes. A call performs a single
/// attempt and yields at most one solution; `None` means the attempt did not
/// converge. Implementations must honor the stop flag between iterations.
pub trait Solver: Send + Sync {
    fn solve(
        &self,
        linear_seed: &[f64],
        metric: &(dyn Fn(&[f64]) -> f64 + Sync),
        rand_seed: u64,
        stop: &AtomicBool,
    ) -> Result<Option<Vec<f64>>, PlanError>;
}

/// Projected gradient descent over the linearized configuration, with
/// numeric central-difference gradients and backtracking line search.
/// Iterates are clamped to the DOF limits after every step.
pub struct GradientDescentSolver {
    limits: Vec<JointLimit>,
    /// Metric value below which the attempt counts as converged.
    pub tolerance: f64,
    /// Step length the line search starts from.
    pub initial_step: f64,
    /// Perturbation size for finite-difference gradients.
    pub gradient_epsilon: f64,
    pub max_iterations: usize,
    /// Descent attempts per call; attempts after the first restart from a
    /// jittered seed drawn from the provided random seed.
    pub max_attempts: usize,
}

impl GradientDescentSolver {
    pub fn new(limits: Vec<JointLimit>) -> Self {
        GradientDescentSolver {
            limits,
            tolerance: 1e-8,
            initial_step: 1.0,
            gradient_epsilon: 1e-7,
            max_iterations: 200,
            max_attempts: 2,
        }
    }

    fn clamp(&self, x: &mut DVector<f64>) {
        for (i, lim) in self.limits.iter().enumerate() {
            let (min, max) = lim.clamped();
            x[i] = x[i].clamp(min, max);
        }
    }

    fn gradient(&self, metric: &(dyn Fn(&[f64]) -> f64 + Sync), x: &DVector<f64>) -> DVector<f64> {
        let mut grad = DVector::zeros(x.len());
        let mut probe = x.clone();
        for i in 0..x.len() {
            let h = self.gradient_epsilon;
            probe[i] = x[i] + h;
            let upper = metric(probe.as_slice());
            probe[i] = x[i] - h;
            let lower = metric(probe.as_slice());
            probe[i] = x[i];
            grad[i] = (upper - lower) / (2.0 * h);
        }
        grad
    }

    /// One bounded descent from `seed`. Returns the solution when the metric
    /// drops below tolerance, None when the attempt stalls.
    fn descend(
        &self,
        seed: DVector<f64>,
        metric: &(dyn Fn(&[f64]) -> f64 + Sync),
        stop: &AtomicBool,
    ) -> Option<Vec<f64>> {
        let mut x = seed;
        self.clamp(&mut x);
        for _ in 0..self.max_iterations {
            if stop.load(Ordering::Relaxed) {
                return None;
            }
            let value = metric(x.as_slice());
            if value <= self.tolerance {
                return Some(x.as_slice().to_vec());
            }
            let grad = self.gradient(metric, &x);
            let norm = grad.norm();
            if norm == 0.0 || !norm.is_finite() {
                return None;
            }
            // Backtracking line search along the negative gradient
            let mut alpha = self.initial_step / norm;
            let mut advanced = false;
            while alpha * norm > 1e-12 {
                let mut trial = &x - &grad * alpha;
                self.clamp(&mut trial);
                if metric(trial.as_slice()) < value {
                    x = trial;
                    advanced = true;
                    break;
                }
                alpha *= 0.5;
            }
            if !advanced {
                return None;
            }
        }
        None
    }
}

impl Solver for GradientDescentSolver {
    fn solve(
        &self,
        linear_seed: &[f64],
        metric: &(dyn Fn(&[f64]) -> f64 + Sync),
        rand_seed: u64,
        stop: &AtomicBool,
    ) -> Result<Option<Vec<f64>>, PlanError> {
        if linear_seed.len() != self.limits.len() {
            return Err(PlanError::Solver(format!(
                "seed has {} values, solver configured for {} DOF",
                linear_seed.len(),
                self.limits.len()
            )));
        }
        let seed = DVector::from_column_slice(linear_seed);
        if let Some(solution) = self.descend(seed.clone(), metric, stop) {
            return Ok(Some(solution));
        }
        // Restarts jitter the seed within a small fraction of each DOF range
        let mut rng = StdRng::seed_from_u64(rand_seed);
        for _ in 1..self.max_attempts {
            if stop.load(Ordering::Relaxed) {
                return Ok(None);
            }
            let mut jittered = seed.clone();
            for (i, lim) in self.limits.iter().enumerate() {
                let (min, max) = lim.clamped();
                let span = max - min;
                if span > 0.0 {
                    jittered[i] += rng.gen_range(-0.01..0.01) * span;
                }
            }
            if let Some(solution) = self.descend(jittered, metric, stop) {
                return Ok(Some(solution));
            }
        }
        Ok(None)
    }
}
