//! Constrained Bidirectional Rapidly-exploring Random Tree planner,
//! Berenson et al. 2009, <https://ieeexplore.ieee.org/document/5152399/>.
//!
//! Two trees grow toward each other, one rooted at the seed configuration
//! and one at the goal state. Every extension step is projected back onto
//! the constraint manifold by gradient-descent IK before it is admitted, so
//! every edge in either tree satisfies the constraint handler. When the
//! trees meet within `input_ident_dist` the path is extracted and handed to
//! the shortcut smoother.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::configuration::Configuration;
use crate::constraint::{ConstraintHandler, SegmentCheck};
use crate::frame_traits::FrameSystem;
use crate::linearized::LinearizedFrameSystem;
use crate::neighbors::NeighborManager;
use crate::node::{extract_path, NodeId, PathNode, Tree};
use crate::plan_error::PlanError;
use crate::planner_options::PlannerOptions;
use crate::planner_traits::{GoalMetric, MotionPlanner, PlanState, RrtSolution, TreePair};
use crate::sampler::{uniform_configuration, Sampler};
use crate::smoother;
use crate::solver::{GradientDescentSolver, Solver};

/// Maximum number of iterations that constrain_near will run before giving
/// up. Typically it solves in the first five iterations, or not at all.
const MAX_NEAR_ITER: usize = 20;

/// Maximum number of iterations that constrained_extend will run.
const MAX_EXTEND_ITER: usize = 5000;

/// Per-frame maximum step sizes used during tree extension.
pub(crate) type FrameSteps = BTreeMap<String, Vec<f64>>;

/// An object able to solve constrained paths around obstacles to some goal
/// for a given frame system.
pub struct CBiRRTPlanner {
    pub(crate) fs: Arc<dyn FrameSystem>,
    pub(crate) constraints: Arc<dyn ConstraintHandler>,
    /// IK used to project candidate configurations onto the constraint
    /// manifold; a fast gradient descent configured for a single attempt.
    pub(crate) solver: Arc<dyn Solver>,
    pub(crate) options: PlannerOptions,
    pub(crate) lfs: LinearizedFrameSystem,
    pub(crate) qstep: FrameSteps,
    pub(crate) sampler: Sampler,
    /// Master PRNG. Child PRNGs for concurrent work are derived from it
    /// deterministically, never shared across threads.
    pub(crate) rng: StdRng,
    pub(crate) stop: Arc<AtomicBool>,
}

struct InitializedTrees {
    trees: TreePair,
    /// A connected path found during initialization (degenerate case).
    steps: Option<Vec<PathNode>>,
    /// Representative goal configuration for the first interpolated target.
    best_goal: Configuration,
}

impl CBiRRTPlanner {
    /// Create a planner with a user-specified random seed. Fails when no
    /// options bundle is supplied or the options are out of range.
    pub fn new(
        fs: Arc<dyn FrameSystem>,
        constraints: Arc<dyn ConstraintHandler>,
        options: Option<PlannerOptions>,
        seed: u64,
    ) -> Result<Self, PlanError> {
        let options = options.ok_or(PlanError::NoPlannerOptions)?;
        options.validate()?;
        let lfs = LinearizedFrameSystem::new(fs.as_ref());
        let qstep = get_frame_steps(&lfs, options.frame_step);
        let solver = Arc::new(GradientDescentSolver::new(lfs.linear_limits()));
        let sampler = Sampler::new(options.iter_before_rand);
        let rng = StdRng::seed_from_u64(seed);
        Ok(CBiRRTPlanner {
            fs,
            constraints,
            solver,
            options,
            lfs,
            qstep,
            sampler,
            rng,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the reference IK solver with an external one.
    pub fn with_solver(mut self, solver: Arc<dyn Solver>) -> Self {
        self.solver = solver;
        self
    }

    /// Cancellation flag polled by every planning loop. Store `true` to make
    /// the planner surface `Cancelled` at the next suspension point.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Plan and also return the grown trees for diagnostic use. On failures
    /// past initialization the incomplete trees are preserved.
    pub fn plan_with_trees(&mut self, seed: &PlanState, goal: &PlanState) -> RrtSolution {
        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        let init = match self.init_rrt_solutions(seed, goal) {
            Ok(init) => init,
            Err(err) => {
                return RrtSolution {
                    result: Err(err),
                    trees: None,
                }
            }
        };
        let InitializedTrees {
            trees,
            steps,
            best_goal,
        } = init;
        if let Some(steps) = steps {
            return RrtSolution {
                result: Ok(steps),
                trees: Some(trees),
            };
        }

        // The planning task runs as a scoped thread and hands its result
        // back over a rendezvous channel of capacity 1.
        let (tx, rx) = mpsc::sync_channel::<RrtSolution>(1);
        let received = thread::scope(|scope| {
            scope.spawn(move || {
                let solution = self.rrt_background_runner(trees, best_goal, deadline);
                let _ = tx.send(solution);
            });
            rx.recv()
        });
        match received {
            Ok(solution) => solution,
            // The runner's final action is the send; a receive error means
            // it panicked, and the scope re-raises that panic on join.
            Err(_) => RrtSolution {
                result: Err(PlanError::PlannerFailed { iteration: 0 }),
                trees: None,
            },
        }
    }

    /// Build the start tree from the seed state and the goal tree from the
    /// goal state. A goal region seeds up to `solutions_to_seed` roots.
    fn init_rrt_solutions(
        &mut self,
        seed: &PlanState,
        goal: &PlanState,
    ) -> Result<InitializedTrees, PlanError> {
        let start_q = match seed {
            PlanState::Configuration(q) => q.clone(),
            PlanState::GoalRegion(_) => {
                return Err(PlanError::InvalidOptions(
                    "the seed state must be a concrete configuration".into(),
                ))
            }
        };
        let mut trees = TreePair::default();
        let start_id = trees.start.add_root(start_q.clone(), 0.0);

        let goal_seeds: Vec<(Configuration, f64)> = match goal {
            PlanState::Configuration(q) => vec![(q.clone(), 0.0)],
            PlanState::GoalRegion(metric) => self.seed_goal_region(&start_q, metric)?,
        };
        for (q, cost) in &goal_seeds {
            trees.goal.add_root(q.clone(), *cost);
        }
        let best_goal = goal_seeds
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(q, _)| q.clone())
            .ok_or_else(|| PlanError::Solver("goal seeding produced no solutions".into()))?;

        // Degenerate case: a goal root already connects to the seed
        for root in trees.goal.roots() {
            let root_q = trees.goal.config(root);
            if self.options.distance_metric.evaluate(&start_q, root_q)
                < self.options.input_ident_dist
            {
                if start_q == *root_q {
                    return Ok(InitializedTrees {
                        steps: Some(vec![trees.start.path_node(start_id)]),
                        trees,
                        best_goal,
                    });
                }
                if self
                    .constraints
                    .check_segment_and_state(
                        self.fs.as_ref(),
                        &start_q,
                        root_q,
                        self.options.resolution,
                    )
                    .is_valid()
                {
                    let steps = vec![trees.start.path_node(start_id), trees.goal.path_node(root)];
                    return Ok(InitializedTrees {
                        steps: Some(steps),
                        trees,
                        best_goal,
                    });
                }
            }
        }
        Ok(InitializedTrees {
            trees,
            steps: None,
            best_goal,
        })
    }

    /// Draw up to `solutions_to_seed` IK solutions of the goal metric, the
    /// first attempt seeded at the start configuration and the rest at
    /// uniform random configurations. Solutions within `input_ident_dist`
    /// of an already-collected one are discarded.
    fn seed_goal_region(
        &mut self,
        start: &Configuration,
        metric: &GoalMetric,
    ) -> Result<Vec<(Configuration, f64)>, PlanError> {
        let lfs = self.lfs.clone();
        let goal_metric = Arc::clone(metric);
        let linear_metric = move |x: &[f64]| match lfs.slice_to_map(x) {
            Ok(q) => goal_metric.as_ref()(&q),
            Err(_) => f64::INFINITY,
        };

        let mut seeds: Vec<(Configuration, f64)> = Vec::new();
        let attempts = self.options.solutions_to_seed * 5;
        for attempt in 0..attempts {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            let linear_seed = if attempt == 0 {
                self.lfs.map_to_slice(start)?
            } else {
                let q = uniform_configuration(&self.lfs, &mut self.rng);
                self.lfs.map_to_slice(&q)?
            };
            let solved =
                self.solver
                    .solve(&linear_seed, &linear_metric, self.rng.next_u64(), &self.stop)?;
            let Some(solution) = solved else { continue };
            let q = self.lfs.slice_to_map(&solution)?;
            if !self.constraints.check_state(&q) {
                continue;
            }
            if seeds.iter().any(|(existing, _)| {
                self.options.distance_metric.evaluate(existing, &q)
                    < self.options.input_ident_dist
            }) {
                continue;
            }
            let residual = metric.as_ref()(&q);
            seeds.push((q, residual));
            if seeds.len() == self.options.solutions_to_seed {
                break;
            }
        }
        if seeds.is_empty() {
            return Err(PlanError::Solver(
                "unable to seed any goal configuration from the goal region".into(),
            ));
        }
        Ok(seeds)
    }

    /// The planning loop. Alternates which tree leads, extending both toward
    /// a shared target each iteration and retargeting at the halfway point
    /// when the trees nearly meet.
    fn rrt_background_runner(
        &mut self,
        mut trees: TreePair,
        best_goal: Configuration,
        deadline: Option<Instant>,
    ) -> RrtSolution {
        debug!(
            start_nodes = trees.start.len(),
            goal_nodes = trees.goal.len(),
            dof = self.lfs.dof,
            "starting cbirrt"
        );
        // The seed is the first node added to the start tree
        let start_q = trees.start.config(NodeId(0)).clone();
        let mut target = match self.fs.interpolate(&start_q, &best_goal, 0.5) {
            Ok(q) => q,
            Err(err) => {
                return RrtSolution {
                    result: Err(err),
                    trees: Some(trees),
                }
            }
        };

        let mut map1_is_start = true;
        for i in 0..self.options.plan_iter {
            if self.stop.load(Ordering::Relaxed) {
                debug!(iteration = i, "cbirrt cancelled");
                return RrtSolution {
                    result: Err(PlanError::Cancelled { iteration: i }),
                    trees: Some(trees),
                };
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    debug!(iteration = i, "cbirrt timed out");
                    return RrtSolution {
                        result: Err(PlanError::Timeout { iteration: i }),
                        trees: Some(trees),
                    };
                }
            }
            if i > 0 && i % 100 == 0 {
                debug!(iteration = i, "cbirrt planner iteration");
            }

            let (mut reached1, mut reached2) =
                match self.try_extend(&mut trees, map1_is_start, &target, i) {
                    Ok(pair) => pair,
                    Err(err) => {
                        return RrtSolution {
                            result: Err(err),
                            trees: Some(trees),
                        }
                    }
                };

            let (q1, q2) = self.reached_configs(&trees, map1_is_start, reached1, reached2);
            let mut reached_delta = self.options.distance_metric.evaluate(&q1, &q2);

            // Second extension, toward the halfway point between where the
            // two trees reached
            if reached_delta > self.options.input_ident_dist {
                target = match self.fs.interpolate(&q1, &q2, 0.5) {
                    Ok(q) => q,
                    Err(err) => {
                        return RrtSolution {
                            result: Err(err),
                            trees: Some(trees),
                        }
                    }
                };
                (reached1, reached2) = match self.try_extend(&mut trees, map1_is_start, &target, i)
                {
                    Ok(pair) => pair,
                    Err(err) => {
                        return RrtSolution {
                            result: Err(err),
                            trees: Some(trees),
                        }
                    }
                };
                let (q1, q2) = self.reached_configs(&trees, map1_is_start, reached1, reached2);
                reached_delta = self.options.distance_metric.evaluate(&q1, &q2);
            }

            // Solved
            if reached_delta <= self.options.input_ident_dist {
                debug!(iteration = i, "cbirrt found solution");
                let (start_reached, goal_reached) = if map1_is_start {
                    (reached1, reached2)
                } else {
                    (reached2, reached1)
                };
                let path = extract_path(&trees.start, &trees.goal, start_reached, goal_reached, true);
                let path = smoother::smooth_path(self, path);
                return RrtSolution {
                    result: Ok(path),
                    trees: Some(trees),
                };
            }

            // Sample near the tree that just led, and swap roles so both
            // trees keep growing in alternation
            let anchor = self
                .reached_configs(&trees, map1_is_start, reached1, reached2)
                .0;
            target = self.sampler.sample(&self.lfs, &anchor, i, &mut self.rng);
            map1_is_start = !map1_is_start;
        }
        RrtSolution {
            result: Err(PlanError::PlannerFailed {
                iteration: self.options.plan_iter,
            }),
            trees: Some(trees),
        }
    }

    /// Configurations of the nodes both extends reached this iteration, in
    /// (map1, map2) order.
    fn reached_configs(
        &self,
        trees: &TreePair,
        map1_is_start: bool,
        reached1: NodeId,
        reached2: NodeId,
    ) -> (Configuration, Configuration) {
        let (map1, map2) = if map1_is_start {
            (&trees.start, &trees.goal)
        } else {
            (&trees.goal, &trees.start)
        };
        (map1.config(reached1).clone(), map2.config(reached2).clone())
    }

    /// Concurrently find each tree's nearest node to the target and run a
    /// constrained extension on both. Both reached nodes are corner-marked.
    fn try_extend(
        &mut self,
        trees: &mut TreePair,
        map1_is_start: bool,
        target: &Configuration,
        iteration: usize,
    ) -> Result<(NodeId, NodeId), PlanError> {
        let nm1 = NeighborManager::new(self.options.num_threads);
        let nm2 = NeighborManager::new(self.options.num_threads);
        let metric = &self.options.distance_metric;
        let stop = self.stop.as_ref();

        let (near1, near2) = {
            let (map1, map2) = if map1_is_start {
                (&trees.start, &trees.goal)
            } else {
                (&trees.goal, &trees.start)
            };
            rayon::join(
                || nm1.nearest(target, map1, metric, stop),
                || nm2.nearest(target, map2, metric, stop),
            )
        };
        // A fired stop flag invalidates partial nearest-neighbor results
        if stop.load(Ordering::Relaxed) {
            return Err(PlanError::Cancelled { iteration });
        }
        let (Some(near1), Some(near2)) = (near1, near2) else {
            return Err(PlanError::Cancelled { iteration });
        };

        // Child seeds are drawn from the master PRNG before launching, so
        // reruns with the same master seed produce identical trees
        let seed1 = self.rng.next_u64();
        let seed2 = self.rng.next_u64();

        let (map1, map2) = if map1_is_start {
            (&mut trees.start, &mut trees.goal)
        } else {
            (&mut trees.goal, &mut trees.start)
        };
        let (reached1, reached2) = rayon::join(
            || {
                let mut rng = StdRng::seed_from_u64(seed1);
                let reached = self.constrained_extend(&mut rng, map1, near1, target);
                map1.set_corner(reached, true);
                reached
            },
            || {
                let mut rng = StdRng::seed_from_u64(seed2);
                let reached = self.constrained_extend(&mut rng, map2, near2, target);
                map2.set_corner(reached, true);
                reached
            },
        );
        Ok((reached1, reached2))
    }

    /// Grow `tree` from `near` toward `target` while meeting constraints
    /// along the way, returning the closest node to the target it reaches.
    ///
    /// Iterates until one of: the target is reached; the extension regresses
    /// (best node moving away from the target); further iterations change
    /// the best node by close-to-zero amounts; cancellation; or the
    /// iteration cap. Every node inserted has a constraint-satisfying
    /// segment to its parent.
    pub(crate) fn constrained_extend(
        &self,
        rng: &mut StdRng,
        tree: &mut Tree,
        near: NodeId,
        target: &Configuration,
    ) -> NodeId {
        // qstep may be doubled once as a means to escape configurations
        // which gradient-descend back onto their seed
        let mut qstep = self.qstep.clone();
        let mut doubled = false;

        let metric = &self.options.distance_metric;
        let mut near_id = near;
        let mut old_near = near;
        for _ in 0..MAX_EXTEND_ITER {
            if self.stop.load(Ordering::Relaxed) {
                return old_near;
            }
            let dist = metric.evaluate(tree.config(near_id), target);
            let old_dist = metric.evaluate(tree.config(old_near), target);
            if dist < self.options.input_ident_dist {
                return near_id;
            }
            if dist > old_dist {
                return old_near;
            }

            old_near = near_id;

            let stepped = fixed_step_interpolation(tree.config(near_id), target, &qstep);
            let seed_q = tree.config(old_near).clone();
            match self.constrain_near(rng, &seed_q, &stepped) {
                Some(projected) => {
                    let near_dist = metric.evaluate(tree.config(old_near), &projected);
                    if near_dist < self.options.input_ident_dist.powi(3) {
                        if !doubled {
                            doubled = true;
                            for steps in qstep.values_mut() {
                                for step in steps.iter_mut() {
                                    *step *= 2.0;
                                }
                            }
                            continue;
                        }
                        // Arrived back at very nearly the same configuration
                        // again; stop solving without adding the
                        // near-identical node
                        return old_near;
                    }
                    if doubled {
                        qstep = self.qstep.clone();
                        doubled = false;
                    }
                    // constrain_near ensured the segment from old_near to the
                    // projected configuration satisfies constraints
                    near_id = tree.add_child(old_near, projected);
                }
                None => break,
            }
        }
        old_near
    }

    /// Gradient-descend from a known-valid configuration toward `target`,
    /// returning a configuration whose segment from `seed_inputs` is valid,
    /// or None. Walks toward the target along the constraint manifold by
    /// re-projecting at the first failing sub-segment; each recursion step
    /// must move the target by more than `input_ident_dist` or the walk
    /// terminates.
    pub(crate) fn constrain_near(
        &self,
        rng: &mut StdRng,
        seed_inputs: &Configuration,
        target: &Configuration,
    ) -> Option<Configuration> {
        let mut seed_inputs = seed_inputs.clone();
        let mut target = target.clone();
        for _ in 0..MAX_NEAR_ITER {
            if self.stop.load(Ordering::Relaxed) {
                return None;
            }
            // The direct arc may already be valid
            if self
                .constraints
                .check_segment_and_state(
                    self.fs.as_ref(),
                    &seed_inputs,
                    &target,
                    self.options.resolution,
                )
                .is_valid()
            {
                return Some(target);
            }

            let linear_seed = self.lfs.map_to_slice(&target).ok()?;
            let lfs = &self.lfs;
            let constraints = &self.constraints;
            let path_metric = move |x: &[f64]| match lfs.slice_to_map(x) {
                Ok(q) => constraints.path_metric(&q),
                Err(_) => f64::INFINITY,
            };
            let solution = match self
                .solver
                .solve(&linear_seed, &path_metric, rng.next_u64(), &self.stop)
            {
                Ok(Some(solution)) => solution,
                _ => return None,
            };
            let solution_q = self.lfs.slice_to_map(&solution).ok()?;

            match self.constraints.check_segment_and_state(
                self.fs.as_ref(),
                &seed_inputs,
                &solution_q,
                self.options.resolution,
            ) {
                SegmentCheck::Valid => return Some(solution_q),
                SegmentCheck::Invalid(Some(span)) => {
                    let dist = self.options.distance_metric.evaluate(&target, &span.end);
                    if dist <= self.options.input_ident_dist {
                        // The failing span no longer makes progress
                        return None;
                    }
                    seed_inputs = span.start;
                    target = span.end;
                }
                SegmentCheck::Invalid(None) => return None,
            }
        }
        None
    }
}

impl MotionPlanner for CBiRRTPlanner {
    fn plan(&mut self, seed: &PlanState, goal: &PlanState) -> Result<Vec<PathNode>, PlanError> {
        self.plan_with_trees(seed, goal).result
    }
}

/// Per-DOF step toward the target, clipped by `qstep`.
pub(crate) fn fixed_step_interpolation(
    start: &Configuration,
    target: &Configuration,
    qstep: &FrameSteps,
) -> Configuration {
    let mut result = Configuration::new();
    for (name, start_vals) in start.frames() {
        // Both configurations were constructed in-algorithm from existing
        // nodes, so the frame layouts match
        let target_vals = target.get(name).unwrap_or(start_vals);
        let steps = qstep.get(name);
        let values = start_vals
            .iter()
            .enumerate()
            .map(|(i, &v1)| {
                let v2 = target_vals.get(i).copied().unwrap_or(v1);
                let limit = steps.and_then(|s| s.get(i)).copied().unwrap_or(f64::INFINITY);
                let mut delta = limit.min((v2 - v1).abs());
                if v2 < v1 {
                    delta = -delta;
                }
                v1 + delta
            })
            .collect();
        result.set(name, values);
    }
    result
}

/// The largest amount each DOF of a frame should move in a single extension
/// step: `percent_total_movement` of the DOF's total range, with infinite
/// limits clamped first.
pub(crate) fn get_frame_steps(
    lfs: &LinearizedFrameSystem,
    percent_total_movement: f64,
) -> FrameSteps {
    let mut frame_steps = FrameSteps::new();
    for frame in lfs.frames() {
        let per_dof = frame
            .limits
            .iter()
            .map(|lim| {
                let (l, u) = lim.clamped();
                (u - l).abs() * percent_total_movement
            })
            .collect();
        frame_steps.insert(frame.name.clone(), per_dof);
    }
    frame_steps
}
