//! Defines traits for frames and frame systems consumed by the planner.

use crate::configuration::Configuration;
use crate::plan_error::PlanError;

/// Substitute bound used when a DOF limit is infinite. Sampling and step
/// derivation need a finite range to work with.
pub const LIMIT_INFINITY_SUBSTITUTE: f64 = 999.0;

/// Allowed range of a single DOF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointLimit {
    pub min: f64,
    pub max: f64,
}

impl JointLimit {
    pub fn new(min: f64, max: f64) -> Self {
        JointLimit { min, max }
    }

    /// An unbounded DOF.
    pub fn unbounded() -> Self {
        JointLimit {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// The limit with infinite bounds replaced by ±[`LIMIT_INFINITY_SUBSTITUTE`].
    pub fn clamped(&self) -> (f64, f64) {
        let min = if self.min == f64::NEG_INFINITY {
            -LIMIT_INFINITY_SUBSTITUTE
        } else {
            self.min
        };
        let max = if self.max == f64::INFINITY {
            LIMIT_INFINITY_SUBSTITUTE
        } else {
            self.max
        };
        (min, max)
    }
}

/// A kinematic element contributing zero or more DOF to the system. For the
/// planner a frame is only a name and a list of limits; whether the DOFs
/// parameterize joint angles or a steering-space trajectory family
/// (PTG-style frames) makes no difference to tree growth.
pub trait Frame {
    /// Stable name, unique within its frame system.
    fn name(&self) -> &str;

    /// Per-DOF limits, in DOF order.
    fn dof(&self) -> &[JointLimit];
}

/// The frame-system capability set the planner consumes. Implementations
/// must keep the frame order stable for the lifetime of the planner.
pub trait FrameSystem: Send + Sync {
    /// All frames, in a stable order.
    fn frames(&self) -> Vec<&dyn Frame>;

    /// Interpolate between two configurations at `t` in [0, 1]. Must respect
    /// each frame's geometry (e.g. quaternion SLERP for orientation DOFs).
    /// Fails if either input is missing a frame or has the wrong arity.
    fn interpolate(
        &self,
        from: &Configuration,
        to: &Configuration,
        t: f64,
    ) -> Result<Configuration, PlanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_substitutes_infinite_bounds() {
        let lim = JointLimit::unbounded();
        assert_eq!(lim.clamped(), (-999.0, 999.0));

        let lim = JointLimit::new(-1.5, f64::INFINITY);
        assert_eq!(lim.clamped(), (-1.5, 999.0));
    }

    #[test]
    fn clamped_keeps_finite_bounds() {
        let lim = JointLimit::new(-3.0, 2.5);
        assert_eq!(lim.clamped(), (-3.0, 2.5));
    }
}
