//! Constrained Bidirectional Rapidly-exploring Random Tree (CBiRRT) motion
//! planner for articulated and wheeled-vehicle kinematic systems.
//!
//! This crate implements the planner described in _Manipulation Planning on
//! Constraint Manifolds_ by Berenson et al., 2009
//! ([IEEE](https://ieeexplore.ieee.org/document/5152399/)): two trees grow
//! toward each other from the seed and the goal, every extension step is
//! projected back onto the constraint manifold by gradient-descent inverse
//! kinematics, and the extracted path is post-processed by randomized
//! shortcut smoothing over its corner nodes.
//!
//! # Features
//!
//! - Continuous path constraints: every edge admitted into either tree has
//!   a constraint-satisfying segment to its parent, validated at a
//!   configurable resolution.
//! - Goals as concrete configurations or as regions described by a goal
//!   metric, seeded with multiple IK solutions.
//! - Parallel nearest-neighbor searches and paired tree extensions; a
//!   cancellation flag is honored at every suspension point.
//! - Deterministic planning: one master PRNG, with child PRNGs derived
//!   before each concurrent extension, so reruns with the same seed produce
//!   identical paths.
//! - Frames are abstract: articulated joints and steering-space (PTG-style)
//!   frames are treated identically by the core.
//!
//! The planner consumes its collaborators through small capability traits:
//! [`frame_traits::FrameSystem`] for interpolation and limits,
//! [`constraint::ConstraintHandler`] for validity and the path metric, and
//! [`solver::Solver`] for IK projection. Concrete implementations for the
//! common cases ship in [`frame_system`], [`constraint`] and [`solver`].

pub mod configuration;

pub mod frame_traits;
pub mod frame_system;

pub mod constraint;

pub mod solver;

pub mod plan_error;

pub mod planner_options;

#[cfg(feature = "options_from_file")]
pub mod options_from_file;

pub mod planner_traits;

#[path = "path_plan/node.rs"]
pub mod node;

#[path = "path_plan/linearized.rs"]
pub mod linearized;

#[path = "path_plan/neighbors.rs"]
pub mod neighbors;

#[path = "path_plan/sampler.rs"]
pub mod sampler;

#[path = "path_plan/cbirrt.rs"]
pub mod cbirrt;

#[path = "path_plan/smoother.rs"]
mod smoother;

#[path = "utils/utils.rs"]
pub mod utils;

#[cfg(test)]
mod tests;
