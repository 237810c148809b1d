//! A concrete frame system over named vector frames with per-DOF linear
//! interpolation. Sufficient for articulated arms, gantries and
//! steering-space frames whose DOFs interpolate componentwise; systems with
//! orientation DOFs provide their own [`FrameSystem`] implementation.

use crate::configuration::Configuration;
use crate::frame_traits::{Frame, FrameSystem, JointLimit};
use crate::plan_error::PlanError;

/// A frame whose DOFs are plain scalars with box limits.
#[derive(Clone, Debug)]
pub struct VectorFrame {
    name: String,
    limits: Vec<JointLimit>,
}

impl VectorFrame {
    pub fn new(name: &str, limits: Vec<JointLimit>) -> Self {
        VectorFrame {
            name: name.to_string(),
            limits,
        }
    }

    /// A frame with the same `(min, max)` limit on every DOF.
    pub fn uniform(name: &str, dof: usize, min: f64, max: f64) -> Self {
        Self::new(name, vec![JointLimit::new(min, max); dof])
    }
}

impl Frame for VectorFrame {
    fn name(&self) -> &str {
        &self.name
    }

    fn dof(&self) -> &[JointLimit] {
        &self.limits
    }
}

/// Frame system composed of [`VectorFrame`]s, interpolating every DOF
/// linearly.
///
/// ```
/// use rs_cbirrt::configuration::Configuration;
/// use rs_cbirrt::frame_system::{LinearFrameSystem, VectorFrame};
/// use rs_cbirrt::frame_traits::FrameSystem;
///
/// let fs = LinearFrameSystem::new(vec![VectorFrame::uniform("gantry", 2, -10.0, 10.0)]);
/// let a = Configuration::single("gantry", vec![0.0, 0.0]);
/// let b = Configuration::single("gantry", vec![4.0, -2.0]);
/// let mid = fs.interpolate(&a, &b, 0.5).unwrap();
/// assert_eq!(mid.get("gantry").unwrap(), &[2.0, -1.0]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct LinearFrameSystem {
    frames: Vec<VectorFrame>,
}

impl LinearFrameSystem {
    pub fn new(frames: Vec<VectorFrame>) -> Self {
        LinearFrameSystem { frames }
    }

    fn frame_values<'a>(
        &self,
        frame: &VectorFrame,
        config: &'a Configuration,
    ) -> Result<&'a [f64], PlanError> {
        let values = config.get(frame.name()).ok_or_else(|| {
            PlanError::Interpolation(format!("configuration is missing frame '{}'", frame.name()))
        })?;
        if values.len() != frame.limits.len() {
            return Err(PlanError::Interpolation(format!(
                "frame '{}' expects {} DOF, configuration has {}",
                frame.name(),
                frame.limits.len(),
                values.len()
            )));
        }
        Ok(values)
    }
}

impl FrameSystem for LinearFrameSystem {
    fn frames(&self) -> Vec<&dyn Frame> {
        self.frames.iter().map(|f| f as &dyn Frame).collect()
    }

    fn interpolate(
        &self,
        from: &Configuration,
        to: &Configuration,
        t: f64,
    ) -> Result<Configuration, PlanError> {
        if !(0.0..=1.0).contains(&t) {
            return Err(PlanError::Interpolation(format!(
                "interpolation parameter {} outside [0, 1]",
                t
            )));
        }
        let mut result = Configuration::new();
        for frame in &self.frames {
            let a = self.frame_values(frame, from)?;
            let b = self.frame_values(frame, to)?;
            let values = a
                .iter()
                .zip(b)
                .map(|(x, y)| x + (y - x) * t)
                .collect::<Vec<_>>();
            result.set(frame.name(), values);
        }
        Ok(result)
    }
}
