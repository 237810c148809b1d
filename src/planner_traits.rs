//! Planner-facing types: plan states, the motion-planner capability, and
//! the solution shape handed back from the planning task.

use std::fmt;
use std::sync::Arc;

use crate::configuration::Configuration;
use crate::node::{PathNode, Tree};
use crate::plan_error::PlanError;

/// Distance function over configurations returning 0 at the goal.
pub type GoalMetric = Arc<dyn Fn(&Configuration) -> f64 + Send + Sync>;

/// Either a concrete configuration or a goal region described by a metric.
/// The planner converts a plan state into one or more seed nodes before
/// iterating; a goal region is seeded through the IK solver.
#[derive(Clone)]
pub enum PlanState {
    Configuration(Configuration),
    GoalRegion(GoalMetric),
}

impl PlanState {
    pub fn configuration(q: Configuration) -> Self {
        PlanState::Configuration(q)
    }

    pub fn goal_region(metric: impl Fn(&Configuration) -> f64 + Send + Sync + 'static) -> Self {
        PlanState::GoalRegion(Arc::new(metric))
    }
}

impl fmt::Debug for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanState::Configuration(q) => f.debug_tuple("Configuration").field(q).finish(),
            PlanState::GoalRegion(_) => f.write_str("GoalRegion(..)"),
        }
    }
}

/// The start and goal trees grown during planning. Returned alongside
/// failures for diagnostic use.
#[derive(Debug, Default)]
pub struct TreePair {
    pub start: Tree,
    pub goal: Tree,
}

/// Result of a planning run: the path (or the failure that ended the run),
/// plus the trees grown up to that point when they survived the failure.
#[derive(Debug)]
pub struct RrtSolution {
    pub result: Result<Vec<PathNode>, PlanError>,
    pub trees: Option<TreePair>,
}

/// Agreed functionality of motion planners: find a feasible path from a
/// seed state to a goal state, subject to the constraints the planner was
/// constructed with.
pub trait MotionPlanner {
    fn plan(&mut self, seed: &PlanState, goal: &PlanState) -> Result<Vec<PathNode>, PlanError>;
}
