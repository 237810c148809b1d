//! End-to-end planner scenarios on small kinematic systems.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::cbirrt::CBiRRTPlanner;
use crate::configuration::Configuration;
use crate::frame_system::{LinearFrameSystem, VectorFrame};
use crate::plan_error::PlanError;
use crate::planner_traits::{MotionPlanner, PlanState};
use crate::tests::test_utils::*;
use crate::utils::path_travel_distance;

#[test]
fn trivial_plan_when_seed_equals_goal() -> Result<()> {
    let fs = Arc::new(LinearFrameSystem::new(vec![VectorFrame::uniform(
        "joint", 1, -1.0, 1.0,
    )]));
    let q = Configuration::single("joint", vec![0.5]);
    let mut planner = CBiRRTPlanner::new(fs, free_space(), Some(test_options()), 1)?;
    let path = planner.plan(
        &PlanState::configuration(q.clone()),
        &PlanState::configuration(q.clone()),
    )?;
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].q, q);
    Ok(())
}

#[test]
fn straight_line_in_free_space() -> Result<()> {
    let fs = planar_fs(10.0);
    let options = crate::planner_options::PlannerOptions {
        plan_iter: 50,
        ..test_options()
    };
    let mut planner = CBiRRTPlanner::new(fs.clone(), free_space(), Some(options), 1)?;
    let seed = q2(0.0, 0.0);
    let goal = q2(5.0, 5.0);
    let path = planner.plan(
        &PlanState::configuration(seed.clone()),
        &PlanState::configuration(goal.clone()),
    )?;

    assert!(!path.is_empty());
    assert_eq!(path[0].q, seed);
    let last = &path[path.len() - 1].q;
    let end_delta = planner.options().distance_metric.evaluate(last, &goal);
    assert!(
        end_delta <= planner.options().input_ident_dist,
        "path ends {} away from the goal",
        end_delta
    );
    Ok(())
}

#[test]
fn detours_around_a_box_obstacle() -> Result<()> {
    let fs = planar_fs(10.0);
    let handler = box_obstacle(0.0, 0.0, 1.0, 2.0);
    let mut planner = CBiRRTPlanner::new(fs.clone(), handler.clone(), Some(test_options()), 7)?;
    let seed = q2(-5.0, 0.0);
    let goal = q2(5.0, 0.0);
    let path = planner.plan(
        &PlanState::configuration(seed.clone()),
        &PlanState::configuration(goal.clone()),
    )?;

    assert_eq!(path[0].q, seed);
    assert_path_segments_valid(
        &path,
        fs.as_ref(),
        handler.as_ref(),
        planner.options().resolution,
    );

    // Any collision-free route must leave the straight line between seed
    // and goal, so its travel exceeds the straight-line distance
    let travel = path_travel_distance(&path, &planner.options().distance_metric);
    assert!(
        travel > 10.0,
        "detour travel {} should exceed the straight-line distance",
        travel
    );
    Ok(())
}

#[test]
fn steering_frame_reaches_a_distant_goal() -> Result<()> {
    let fs = steering_fs();
    let mut planner = CBiRRTPlanner::new(fs, free_space(), Some(test_options()), 3)?;
    let seed = Configuration::single("ptg", vec![0.0, 0.0, 0.0]);
    let goal = Configuration::single("ptg", vec![200.0, 0.0, 0.0]);
    let path = planner.plan(
        &PlanState::configuration(seed.clone()),
        &PlanState::configuration(goal),
    )?;
    assert!(path.len() >= 2, "expected at least 2 nodes, got {}", path.len());
    assert_eq!(path[0].q, seed);
    Ok(())
}

#[test]
fn unreachable_goal_fails_after_the_iteration_budget() -> Result<()> {
    let fs = planar_fs(10.0);
    // The goal sits inside a fully-enclosing ring
    let handler = ring_obstacle(5.0, 0.0, 2.0, 3.0);
    let options = crate::planner_options::PlannerOptions {
        plan_iter: 15,
        smooth_iter: 0,
        ..test_options()
    };
    let mut planner = CBiRRTPlanner::new(fs, handler, Some(options), 5)?;
    let solution = planner.plan_with_trees(
        &PlanState::configuration(q2(-5.0, 0.0)),
        &PlanState::configuration(q2(5.0, 0.0)),
    );

    match solution.result {
        Err(PlanError::PlannerFailed { iteration }) => assert_eq!(iteration, 15),
        other => return Err(anyhow!("expected PlannerFailed, got {:?}", other)),
    }
    let trees = solution
        .trees
        .ok_or_else(|| anyhow!("failed plans must preserve the trees"))?;
    assert!(!trees.start.is_empty());
    assert!(!trees.goal.is_empty());
    Ok(())
}

#[test]
fn goal_region_is_seeded_through_the_solver() -> Result<()> {
    let fs = planar_fs(10.0);
    let mut planner = CBiRRTPlanner::new(fs, free_space(), Some(test_options()), 11)?;
    let goal = PlanState::goal_region(|q: &Configuration| {
        let v = q.get(FRAME).unwrap_or(&[0.0, 0.0]);
        (v[0] - 5.0).powi(2) + (v[1] - 5.0).powi(2)
    });
    let path = planner.plan(&PlanState::configuration(q2(0.0, 0.0)), &goal)?;

    let last = path[path.len() - 1].q.get(FRAME).unwrap();
    let residual = (last[0] - 5.0).powi(2) + (last[1] - 5.0).powi(2);
    assert!(
        residual < planner.options().input_ident_dist,
        "goal region residual {} too large",
        residual
    );
    Ok(())
}

#[test]
fn identical_seeds_produce_identical_paths() -> Result<()> {
    let plan_once = || -> Result<Vec<Vec<f64>>> {
        let fs = planar_fs(10.0);
        let handler = box_obstacle(0.0, 0.0, 1.0, 2.0);
        let mut planner = CBiRRTPlanner::new(fs, handler, Some(test_options()), 42)?;
        let path = planner.plan(
            &PlanState::configuration(q2(-5.0, 0.0)),
            &PlanState::configuration(q2(5.0, 0.0)),
        )?;
        Ok(path
            .iter()
            .map(|step| step.q.get(FRAME).unwrap().to_vec())
            .collect())
    };
    assert_eq!(plan_once()?, plan_once()?);
    Ok(())
}

#[test]
fn cancellation_surfaces_before_any_iteration() -> Result<()> {
    let fs = planar_fs(10.0);
    let mut planner = CBiRRTPlanner::new(fs, free_space(), Some(test_options()), 1)?;
    planner.cancellation().store(true, Ordering::Relaxed);
    let solution = planner.plan_with_trees(
        &PlanState::configuration(q2(0.0, 0.0)),
        &PlanState::configuration(q2(5.0, 5.0)),
    );
    match solution.result {
        Err(PlanError::Cancelled { iteration }) => assert_eq!(iteration, 0),
        other => return Err(anyhow!("expected Cancelled, got {:?}", other)),
    }
    assert!(solution.trees.is_some());
    Ok(())
}

#[test]
fn zero_timeout_fails_immediately() -> Result<()> {
    let fs = planar_fs(10.0);
    let options = crate::planner_options::PlannerOptions {
        timeout: Some(Duration::ZERO),
        ..test_options()
    };
    let mut planner = CBiRRTPlanner::new(fs, free_space(), Some(options), 1)?;
    let result = planner.plan(
        &PlanState::configuration(q2(0.0, 0.0)),
        &PlanState::configuration(q2(5.0, 5.0)),
    );
    match result {
        Err(PlanError::Timeout { iteration }) => assert_eq!(iteration, 0),
        other => return Err(anyhow!("expected Timeout, got {:?}", other)),
    }
    Ok(())
}

#[test]
fn goal_region_as_seed_is_rejected() -> Result<()> {
    let fs = planar_fs(10.0);
    let mut planner = CBiRRTPlanner::new(fs, free_space(), Some(test_options()), 1)?;
    let region = PlanState::goal_region(|_: &Configuration| 0.0);
    let result = planner.plan(&region, &PlanState::configuration(q2(0.0, 0.0)));
    assert!(matches!(result, Err(PlanError::InvalidOptions(_))));
    Ok(())
}
