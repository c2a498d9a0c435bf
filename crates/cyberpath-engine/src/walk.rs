//! Pre-order tree walk: scores every node once and flattens the tree into
//! `(node, depth, score)` rows for tabular and indented output.

use cyberpath_core::ScoringConfig;
use serde::Serialize;

use crate::scoring;
use crate::tree::{AttackTree, NodeId};

/// One row of the flattened walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WalkEntry {
    pub node: NodeId,
    /// Distance from the root (root = 0).
    pub depth: usize,
    pub score: f64,
}

/// Result of [`walk`]: the pre-order listing plus per-node lookups.
#[derive(Debug, Clone)]
pub struct TreeWalk {
    entries: Vec<WalkEntry>,
    /// Memoized node scores, indexed by `NodeId`.
    scores: Vec<f64>,
    /// Pre-order position of each node, indexed by `NodeId`.
    positions: Vec<usize>,
}

impl TreeWalk {
    /// Rows in pre-order.
    pub fn entries(&self) -> &[WalkEntry] {
        &self.entries
    }

    pub fn score_of(&self, id: NodeId) -> f64 {
        self.scores[id.0]
    }

    pub fn position_of(&self, id: NodeId) -> usize {
        self.positions[id.0]
    }

    pub fn depth_of(&self, id: NodeId) -> usize {
        self.entries[self.positions[id.0]].depth
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.entries.iter().map(|e| e.depth).max().unwrap_or(0)
    }
}

/// Walk every root in declaration order, children in declared order.
///
/// Uses an explicit stack, so tree depth is bounded only by memory.
pub fn walk(tree: &AttackTree, config: &ScoringConfig) -> TreeWalk {
    let n = tree.len();
    let mut entries = Vec::with_capacity(n);
    let mut scores = vec![0.0; n];
    let mut positions = vec![0; n];

    let mut stack: Vec<(NodeId, usize)> = tree.roots().iter().rev().map(|&r| (r, 0)).collect();

    while let Some((id, depth)) = stack.pop() {
        let score = scoring::score(tree.node(id), config);
        scores[id.0] = score;
        positions[id.0] = entries.len();
        entries.push(WalkEntry {
            node: id,
            depth,
            score,
        });

        for &child in tree.children(id).iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    tracing::debug!(
        nodes = entries.len(),
        roots = tree.roots().len(),
        "Attack tree walked"
    );

    TreeWalk {
        entries,
        scores,
        positions,
    }
}
