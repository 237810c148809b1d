//! Tree primitives for RRT-style planners: arena-backed nodes and
//! parent-pointer trees.
//!
//! Nodes live in a per-tree arena and are addressed by [`NodeId`]. Parents
//! always precede their children in the arena, so parent chains are finite
//! and cycle-free by construction. A tree may hold several roots (a goal
//! region seeds one root per IK solution); the first root added is the
//! distinguished one.

use bitflags::bitflags;

use crate::configuration::Configuration;

bitflags! {
    /// Flags that can be set on nodes and on path elements in the output.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct NodeFlags: u32 {
        /// A turning point; candidate endpoint for smoothing shortcuts.
        const CORNER = 1 << 0;
    }
}

/// Index of a node within its tree's arena. Ids from different trees must
/// not be mixed; they are plain indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Clone, Debug)]
struct TreeNode {
    q: Configuration,
    cost: f64,
    flags: NodeFlags,
    parent: Option<NodeId>,
}

/// An element of an extracted path: the configuration snapshot plus the
/// node's cost and flags at extraction time.
#[derive(Clone, Debug)]
pub struct PathNode {
    pub q: Configuration,
    pub cost: f64,
    pub flags: NodeFlags,
}

impl PathNode {
    pub fn new(q: Configuration) -> Self {
        PathNode {
            q,
            cost: 0.0,
            flags: NodeFlags::empty(),
        }
    }

    pub fn corner(&self) -> bool {
        self.flags.contains(NodeFlags::CORNER)
    }

    pub fn set_corner(&mut self, corner: bool) {
        self.flags.set(NodeFlags::CORNER, corner);
    }
}

/// Parent-pointer forest rooted at a planning state.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root node. The first root added is the distinguished one.
    pub fn add_root(&mut self, q: Configuration, cost: f64) -> NodeId {
        self.push(q, cost, None)
    }

    /// Add a child of `parent`. The parent must already be in this tree.
    pub fn add_child(&mut self, parent: NodeId, q: Configuration) -> NodeId {
        debug_assert!(parent.0 < self.nodes.len(), "parent not in this tree");
        self.push(q, 0.0, Some(parent))
    }

    fn push(&mut self, q: Configuration, cost: f64, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            q,
            cost,
            flags: NodeFlags::empty(),
            parent,
        });
        id
    }

    pub fn config(&self, id: NodeId) -> &Configuration {
        &self.nodes[id.0].q
    }

    pub fn cost(&self, id: NodeId) -> f64 {
        self.nodes[id.0].cost
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn corner(&self, id: NodeId) -> bool {
        self.nodes[id.0].flags.contains(NodeFlags::CORNER)
    }

    pub fn set_corner(&mut self, id: NodeId, corner: bool) {
        self.nodes[id.0].flags.set(NodeFlags::CORNER, corner);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Ids of all roots, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.ids().filter(|id| self.parent(*id).is_none()).collect()
    }

    /// Snapshot a node as a path element.
    pub fn path_node(&self, id: NodeId) -> PathNode {
        let node = &self.nodes[id.0];
        PathNode {
            q: node.q.clone(),
            cost: node.cost,
            flags: node.flags,
        }
    }
}

/// Splice the two parent chains meeting at (`start_reached`, `goal_reached`)
/// into a single start-to-goal path. With `matched` set the two reached
/// nodes hold the same configuration and the goal-side copy is skipped so
/// the meeting point appears exactly once.
pub(crate) fn extract_path(
    start_tree: &Tree,
    goal_tree: &Tree,
    start_reached: NodeId,
    goal_reached: NodeId,
    matched: bool,
) -> Vec<PathNode> {
    let mut path = Vec::new();

    // Walk up to the start root, then reverse into start-to-meeting order
    let mut cursor = Some(start_reached);
    while let Some(id) = cursor {
        path.push(start_tree.path_node(id));
        cursor = start_tree.parent(id);
    }
    path.reverse();

    let mut cursor = if matched {
        goal_tree.parent(goal_reached)
    } else {
        Some(goal_reached)
    };
    while let Some(id) = cursor {
        path.push(goal_tree.path_node(id));
        cursor = goal_tree.parent(id);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(v: f64) -> Configuration {
        Configuration::single("j", vec![v])
    }

    #[test]
    fn parent_chains_terminate_at_roots() {
        let mut tree = Tree::new();
        let root = tree.add_root(q(0.0), 0.0);
        let a = tree.add_child(root, q(1.0));
        let b = tree.add_child(a, q(2.0));

        let mut cursor = Some(b);
        let mut hops = 0;
        while let Some(id) = cursor {
            cursor = tree.parent(id);
            hops += 1;
        }
        assert_eq!(hops, 3);
        assert_eq!(tree.roots(), vec![root]);
    }

    #[test]
    fn parents_precede_children() {
        let mut tree = Tree::new();
        let root = tree.add_root(q(0.0), 0.0);
        let mut tip = root;
        for i in 1..50 {
            tip = tree.add_child(tip, q(i as f64));
        }
        for id in tree.ids() {
            if let Some(parent) = tree.parent(id) {
                assert!(parent.0 < id.0);
            }
        }
    }

    #[test]
    fn corner_flag_toggles() {
        let mut tree = Tree::new();
        let root = tree.add_root(q(0.0), 0.0);
        assert!(!tree.corner(root));
        tree.set_corner(root, true);
        assert!(tree.corner(root));
        tree.set_corner(root, false);
        assert!(!tree.corner(root));
    }

    #[test]
    fn extract_path_goes_start_to_goal() {
        let mut start = Tree::new();
        let s0 = start.add_root(q(0.0), 0.0);
        let s1 = start.add_child(s0, q(1.0));
        let s2 = start.add_child(s1, q(2.0));

        let mut goal = Tree::new();
        let g0 = goal.add_root(q(5.0), 0.0);
        let g1 = goal.add_child(g0, q(3.0));
        let g2 = goal.add_child(g1, q(2.0)); // meets s2

        let path = extract_path(&start, &goal, s2, g2, true);
        let values: Vec<f64> = path.iter().map(|n| n.q.get("j").unwrap()[0]).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn extract_path_unmatched_keeps_both_reached_nodes() {
        let mut start = Tree::new();
        let s0 = start.add_root(q(0.0), 0.0);

        let mut goal = Tree::new();
        let g0 = goal.add_root(q(5.0), 0.0);
        let g1 = goal.add_child(g0, q(1.0));

        let path = extract_path(&start, &goal, s0, g1, false);
        let values: Vec<f64> = path.iter().map(|n| n.q.get("j").unwrap()[0]).collect();
        assert_eq!(values, vec![0.0, 1.0, 5.0]);
    }
}
