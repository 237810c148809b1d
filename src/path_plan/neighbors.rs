//! Parallel brute-force nearest-neighbor search over a tree.
//!
//! No index structure is maintained; tree sizes stay small enough that the
//! sharded linear scan wins on constant factors. Ties break toward the
//! lowest arena index, which keeps results deterministic regardless of
//! worker scheduling.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::configuration::{Configuration, DistanceMetric};
use crate::node::{NodeId, Tree};

pub struct NeighborManager {
    pub num_threads: usize,
}

impl NeighborManager {
    pub fn new(num_threads: usize) -> Self {
        NeighborManager {
            num_threads: num_threads.max(1),
        }
    }

    /// The node minimizing `metric(target, node)`, or None for an empty
    /// tree. When the stop flag fires mid-search, workers finish early and
    /// the partial result should be discarded by the caller.
    pub fn nearest(
        &self,
        target: &Configuration,
        tree: &Tree,
        metric: &DistanceMetric,
        stop: &AtomicBool,
    ) -> Option<NodeId> {
        let len = tree.len();
        if len == 0 {
            return None;
        }
        let shard_size = len.div_ceil(self.num_threads);
        let shards: Vec<(usize, usize)> = (0..len)
            .step_by(shard_size)
            .map(|begin| (begin, (begin + shard_size).min(len)))
            .collect();

        shards
            .par_iter()
            .filter_map(|&(begin, end)| {
                // Cancellation is polled between shards only
                if stop.load(Ordering::Relaxed) {
                    return None;
                }
                (begin..end)
                    .map(|i| {
                        let id = NodeId(i);
                        (metric.evaluate(target, tree.config(id)), id)
                    })
                    .min_by(|a, b| cmp_candidates(a, b))
            })
            .min_by(|a, b| cmp_candidates(a, b))
            .map(|(_, id)| id)
    }
}

fn cmp_candidates(a: &(f64, NodeId), b: &(f64, NodeId)) -> std::cmp::Ordering {
    // Distances are finite; tie-break on the lower arena index
    a.0.total_cmp(&b.0).then_with(|| a.1 .0.cmp(&b.1 .0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(x: f64, y: f64) -> Configuration {
        Configuration::single("gantry", vec![x, y])
    }

    fn sample_tree() -> Tree {
        let mut tree = Tree::new();
        let root = tree.add_root(q(0.0, 0.0), 0.0);
        let mut tip = root;
        for i in 1..100 {
            tip = tree.add_child(tip, q(i as f64 * 0.1, 0.0));
        }
        tree
    }

    #[test]
    fn finds_the_closest_node() {
        let tree = sample_tree();
        let nm = NeighborManager::new(4);
        let stop = AtomicBool::new(false);
        let nearest = nm
            .nearest(&q(5.01, 0.0), &tree, &DistanceMetric::SquaredNorm, &stop)
            .unwrap();
        assert_eq!(tree.config(nearest), &q(5.0, 0.0));
    }

    #[test]
    fn ties_break_to_the_lowest_index() {
        let mut tree = Tree::new();
        let a = tree.add_root(q(1.0, 0.0), 0.0);
        tree.add_root(q(-1.0, 0.0), 0.0); // same distance from origin
        let nm = NeighborManager::new(2);
        let stop = AtomicBool::new(false);
        let nearest = nm
            .nearest(&q(0.0, 0.0), &tree, &DistanceMetric::SquaredNorm, &stop)
            .unwrap();
        assert_eq!(nearest, a);
    }

    #[test]
    fn single_thread_matches_parallel() {
        let tree = sample_tree();
        let stop = AtomicBool::new(false);
        let target = q(3.33, 0.2);
        let serial = NeighborManager::new(1)
            .nearest(&target, &tree, &DistanceMetric::SquaredNorm, &stop)
            .unwrap();
        let parallel = NeighborManager::new(8)
            .nearest(&target, &tree, &DistanceMetric::SquaredNorm, &stop)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn empty_tree_yields_none() {
        let tree = Tree::new();
        let nm = NeighborManager::new(4);
        let stop = AtomicBool::new(false);
        assert!(nm
            .nearest(&q(0.0, 0.0), &tree, &DistanceMetric::SquaredNorm, &stop)
            .is_none());
    }
}
