//! Randomized shortcut smoothing over corner nodes.
//!
//! Picks two points along the path at random and runs a constrained
//! extension directly between them, cutting off randomly-chosen waypoints
//! with odd joint excursions. Two passes are made, first requiring two
//! corners between the shortcut endpoints and then one.

use std::sync::atomic::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::cbirrt::CBiRRTPlanner;
use crate::node::{PathNode, Tree};

pub(crate) fn smooth_path(mp: &mut CBiRRTPlanner, mut steps: Vec<PathNode>) -> Vec<PathNode> {
    let to_iter = (steps.len() * steps.len()).min(mp.options.smooth_iter);
    // Child PRNG derived from the master keeps reruns reproducible
    let mut rng = StdRng::seed_from_u64(mp.rng.next_u64());

    for num_corners_to_pass in [2usize, 1] {
        let mut iter = 0;
        while iter < to_iter / 2 && steps.len() > 3 {
            iter += 1;
            if mp.stop.load(Ordering::Relaxed) {
                return steps;
            }
            // Start of the shortcut; cannot be the last or second-to-last node
            let i = rng.gen_range(0..steps.len() - 2);
            let mut j = i + 1;
            let mut corners_passed = 0;
            let mut corners_hit = 0;
            // Walk forward until enough corners were passed and the end node
            // itself is a corner, or until the end of the path
            while (corners_passed != num_corners_to_pass || !steps[j].corner())
                && j < steps.len() - 1
            {
                j += 1;
                if corners_passed < num_corners_to_pass && steps[j].corner() {
                    corners_passed += 1;
                    corners_hit += 1;
                }
            }
            // No corners between i and the end of the path; not a candidate
            if corners_hit == 0 {
                continue;
            }

            // Extend a one-node shortcut tree from steps[j] toward steps[i]
            let mut shortcut = Tree::new();
            let root = shortcut.add_root(steps[j].q.clone(), 0.0);
            let reached = mp.constrained_extend(&mut rng, &mut shortcut, root, &steps[i].q);

            let dist = mp
                .options
                .distance_metric
                .evaluate(&steps[i].q, shortcut.config(reached));
            if dist < mp.options.input_ident_dist {
                // Splice the shortcut in place of steps[i..=j]. The shortcut
                // may hold more waypoints than it replaces; smoothed paths
                // lend themselves to further shortening, so elongation is
                // allowed.
                let mut new_steps: Vec<PathNode> = steps[..i].to_vec();
                let splice_start = new_steps.len();
                let mut cursor = Some(reached);
                while let Some(id) = cursor {
                    new_steps.push(shortcut.path_node(id));
                    cursor = shortcut.parent(id);
                }
                // The replaced corners are gone; the splice endpoints become
                // the new corners
                new_steps[splice_start].set_corner(true);
                let splice_end = new_steps.len() - 1;
                new_steps[splice_end].set_corner(true);
                new_steps.extend_from_slice(&steps[j + 1..]);
                steps = new_steps;
            }
        }
    }
    steps
}
