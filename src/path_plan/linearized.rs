//! Flattens the heterogeneous per-frame DOF map into a single ordered
//! float vector and back.
//!
//! The IK solver and the gradient metrics operate on flat vectors; the rest
//! of the system works with named-frame maps. The ordering is captured from
//! the frame system at construction and stays stable for the lifetime of
//! the planner.

use crate::configuration::Configuration;
use crate::frame_traits::{FrameSystem, JointLimit};
use crate::plan_error::PlanError;

/// Name and limits of one frame, in linearization order.
#[derive(Clone, Debug)]
pub struct FrameSpec {
    pub name: String,
    pub limits: Vec<JointLimit>,
}

#[derive(Clone, Debug)]
pub struct LinearizedFrameSystem {
    frames: Vec<FrameSpec>,
    /// Total degrees of freedom across all frames.
    pub dof: usize,
}

impl LinearizedFrameSystem {
    /// Capture the frame order and limits of a frame system.
    pub fn new(fs: &dyn FrameSystem) -> Self {
        let frames: Vec<FrameSpec> = fs
            .frames()
            .iter()
            .map(|f| FrameSpec {
                name: f.name().to_string(),
                limits: f.dof().to_vec(),
            })
            .collect();
        let dof = frames.iter().map(|f| f.limits.len()).sum();
        LinearizedFrameSystem { frames, dof }
    }

    pub fn frames(&self) -> &[FrameSpec] {
        &self.frames
    }

    /// Flattened per-DOF limits, in linearization order.
    pub fn linear_limits(&self) -> Vec<JointLimit> {
        self.frames
            .iter()
            .flat_map(|f| f.limits.iter().copied())
            .collect()
    }

    /// Flatten a configuration into a vector ordered by the captured frame
    /// order. Fails if any frame is missing or has the wrong arity.
    pub fn map_to_slice(&self, config: &Configuration) -> Result<Vec<f64>, PlanError> {
        let mut flat = Vec::with_capacity(self.dof);
        for frame in &self.frames {
            let values = config.get(&frame.name).ok_or_else(|| {
                PlanError::Linearization(format!(
                    "configuration is missing frame '{}'",
                    frame.name
                ))
            })?;
            if values.len() != frame.limits.len() {
                return Err(PlanError::Linearization(format!(
                    "frame '{}' expects {} DOF, configuration has {}",
                    frame.name,
                    frame.limits.len(),
                    values.len()
                )));
            }
            flat.extend_from_slice(values);
        }
        Ok(flat)
    }

    /// Rebuild a configuration from a flat vector. Fails if the length does
    /// not match the total DOF.
    pub fn slice_to_map(&self, flat: &[f64]) -> Result<Configuration, PlanError> {
        if flat.len() != self.dof {
            return Err(PlanError::Linearization(format!(
                "expected {} values, got {}",
                self.dof,
                flat.len()
            )));
        }
        let mut config = Configuration::new();
        let mut offset = 0;
        for frame in &self.frames {
            let next = offset + frame.limits.len();
            config.set(&frame.name, flat[offset..next].to_vec());
            offset = next;
        }
        Ok(config)
    }
}
