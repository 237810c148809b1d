//! Constraint handling: state validity, segment validation and the path
//! metric the IK solver descends to stay on the constraint manifold.

use std::sync::Arc;

use crate::configuration::Configuration;
use crate::frame_traits::FrameSystem;

/// The first failing sub-segment of a checked segment: `start` is the last
/// valid sampled configuration, `end` the first invalid one.
#[derive(Clone, Debug)]
pub struct FailedSpan {
    pub start: Configuration,
    pub end: Configuration,
}

/// Outcome of a segment-and-state validity check.
#[derive(Clone, Debug)]
pub enum SegmentCheck {
    Valid,
    /// The segment is invalid. The failing span is reported when the check
    /// was able to localize the failure.
    Invalid(Option<FailedSpan>),
}

impl SegmentCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SegmentCheck::Valid)
    }
}

/// The constraint-handler capability set the planner consumes. A handler
/// decides state validity (collision, joint constraints, task constraints)
/// and exposes a scalar path metric that is zero on the constraint manifold.
pub trait ConstraintHandler: Send + Sync {
    /// True if the single configuration satisfies all constraints.
    fn check_state(&self, q: &Configuration) -> bool;

    /// Scalar objective minimized by the IK solver to stay on the constraint
    /// manifold. Zero means the configuration satisfies all path
    /// constraints; unconstrained planning keeps the default.
    fn path_metric(&self, _q: &Configuration) -> f64 {
        0.0
    }

    /// Validate the straight configuration-space segment `start -> end` by
    /// sampling it at `resolution` spacing (Euclidean DOF distance) and
    /// checking every sampled state. Returns the first failing sub-segment,
    /// bracketed by the last valid and first invalid sample.
    fn check_segment_and_state(
        &self,
        fs: &dyn FrameSystem,
        start: &Configuration,
        end: &Configuration,
        resolution: f64,
    ) -> SegmentCheck {
        if !self.check_state(start) {
            // No valid bracket exists when the segment starts off-manifold.
            return SegmentCheck::Invalid(None);
        }
        let steps = segment_step_count(start, end, resolution);
        let mut last_valid = start.clone();
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            let q = match fs.interpolate(start, end, t) {
                Ok(q) => q,
                // A segment that cannot be interpolated cannot be validated.
                Err(_) => return SegmentCheck::Invalid(None),
            };
            if !self.check_state(&q) {
                return SegmentCheck::Invalid(Some(FailedSpan {
                    start: last_valid,
                    end: q,
                }));
            }
            last_valid = q;
        }
        SegmentCheck::Valid
    }
}

/// Number of interpolation steps needed to sample a segment at `resolution`
/// spacing, always at least one so the end state itself is checked.
fn segment_step_count(start: &Configuration, end: &Configuration, resolution: f64) -> usize {
    let mut sq = 0.0;
    for (name, va) in start.frames() {
        if let Some(vb) = end.get(name) {
            for (x, y) in va.iter().zip(vb) {
                let d = x - y;
                sq += d * d;
            }
        }
    }
    ((sq.sqrt() / resolution).ceil() as usize).max(1)
}

type StateValidator = Arc<dyn Fn(&Configuration) -> bool + Send + Sync>;
type PathMetric = Arc<dyn Fn(&Configuration) -> f64 + Send + Sync>;

/// Constraint handler assembled from state-validity predicates and an
/// optional path metric. The default handler allows everything, which
/// reduces the planner to an unconstrained bidirectional RRT.
#[derive(Clone, Default)]
pub struct StateConstraintHandler {
    validators: Vec<StateValidator>,
    metric: Option<PathMetric>,
}

impl StateConstraintHandler {
    /// A handler with no constraints.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&Configuration) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn with_path_metric(
        mut self,
        metric: impl Fn(&Configuration) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.metric = Some(Arc::new(metric));
        self
    }
}

impl ConstraintHandler for StateConstraintHandler {
    fn check_state(&self, q: &Configuration) -> bool {
        self.validators.iter().all(|validator| validator.as_ref()(q))
    }

    fn path_metric(&self, q: &Configuration) -> f64 {
        match &self.metric {
            Some(metric) => metric.as_ref()(q),
            None => 0.0,
        }
    }
}
