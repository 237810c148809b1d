//! Planner options bundle and its defaults.

use std::time::Duration;

use crate::configuration::DistanceMetric;
use crate::plan_error::PlanError;

pub const DEFAULT_PLAN_ITER: usize = 2000;
pub const DEFAULT_INPUT_IDENT_DIST: f64 = 0.0001;
pub const DEFAULT_RESOLUTION: f64 = 0.01;
pub const DEFAULT_NUM_THREADS: usize = 8;
pub const DEFAULT_SMOOTH_ITER: usize = 200;
pub const DEFAULT_SOLUTIONS_TO_SEED: usize = 10;
pub const DEFAULT_FRAME_STEP: f64 = 0.015;
pub const DEFAULT_ITER_BEFORE_RAND: usize = 50;

/// Recognized planner options. `frame_step` is the fraction of each DOF's
/// total range used to derive the per-DOF extension step (`qstep`); infinite
/// limits are clamped before the range is taken.
#[derive(Clone, Debug)]
pub struct PlannerOptions {
    /// Maximum outer planning iterations.
    pub plan_iter: usize,
    /// Distance below which two configurations count as identical for
    /// connection and progress checks, in units of `distance_metric`.
    pub input_ident_dist: f64,
    /// Step spacing for segment validity interpolation.
    pub resolution: f64,
    /// Parallelism of the nearest-neighbor search.
    pub num_threads: usize,
    /// Smoothing iteration budget.
    pub smooth_iter: usize,
    /// Number of IK solutions used to seed a goal region.
    pub solutions_to_seed: usize,
    /// Fraction of per-DOF total movement taken as the extension step.
    pub frame_step: f64,
    /// Outer iterations before the sampler mixes in fully random targets.
    pub iter_before_rand: usize,
    /// Wall-clock budget for a single plan() call.
    pub timeout: Option<Duration>,
    /// Configuration-segment distance metric.
    pub distance_metric: DistanceMetric,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        PlannerOptions {
            plan_iter: DEFAULT_PLAN_ITER,
            input_ident_dist: DEFAULT_INPUT_IDENT_DIST,
            resolution: DEFAULT_RESOLUTION,
            num_threads: DEFAULT_NUM_THREADS,
            smooth_iter: DEFAULT_SMOOTH_ITER,
            solutions_to_seed: DEFAULT_SOLUTIONS_TO_SEED,
            frame_step: DEFAULT_FRAME_STEP,
            iter_before_rand: DEFAULT_ITER_BEFORE_RAND,
            timeout: None,
            distance_metric: DistanceMetric::SquaredNorm,
        }
    }
}

impl PlannerOptions {
    /// Check option ranges. Called at planner construction.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.plan_iter == 0 {
            return Err(PlanError::InvalidOptions("plan_iter must be at least 1".into()));
        }
        if !(self.input_ident_dist > 0.0) || !self.input_ident_dist.is_finite() {
            return Err(PlanError::InvalidOptions(
                "input_ident_dist must be a positive finite float".into(),
            ));
        }
        if !(self.resolution > 0.0) || !self.resolution.is_finite() {
            return Err(PlanError::InvalidOptions(
                "resolution must be a positive finite float".into(),
            ));
        }
        if self.num_threads == 0 {
            return Err(PlanError::InvalidOptions("num_threads must be at least 1".into()));
        }
        if self.solutions_to_seed == 0 {
            return Err(PlanError::InvalidOptions(
                "solutions_to_seed must be at least 1".into(),
            ));
        }
        if !(self.frame_step > 0.0 && self.frame_step < 1.0) {
            return Err(PlanError::InvalidOptions(
                "frame_step must lie in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}
