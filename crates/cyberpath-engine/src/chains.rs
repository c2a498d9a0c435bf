//! Attack chain enumeration and ranking.
//!
//! Every node yields exactly one chain: the path from its root down to the
//! node itself. Chains sharing a prefix are all kept.
//!
//! Ranking order: cumulative score descending, then shallower chains first,
//! then the pre-order position of the last node. Among chains of equal
//! depth that position follows declared child order, and it makes the
//! order total.

use std::cmp::Ordering;

use cyberpath_core::ScoringConfig;
use serde::Serialize;

use crate::scoring;
use crate::tree::{AttackTree, NodeId};
use crate::walk::TreeWalk;

/// A root-to-node path with its cumulative score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackChain {
    /// Nodes from the root to the chain's terminal node.
    pub nodes: Vec<NodeId>,
    /// Node scores aligned with `nodes`.
    pub node_scores: Vec<f64>,
    pub cumulative_score: f64,
}

impl AttackChain {
    /// Number of edges in the chain; a root-only chain has depth 0.
    pub fn depth(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn terminal(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn names<'t>(&self, tree: &'t AttackTree) -> Vec<&'t str> {
        self.nodes.iter().map(|&id| tree.node(id).name()).collect()
    }
}

/// Emit one chain per node, in pre-order.
///
/// Depth-first with an explicit stack; the current ancestor path is cut
/// back to the popped node's depth before the node is appended. Node
/// scores come from the walk and are not recomputed.
pub fn enumerate_chains(tree: &AttackTree, walk: &TreeWalk, config: &ScoringConfig) -> Vec<AttackChain> {
    let mut chains = Vec::with_capacity(tree.len());
    let mut path: Vec<NodeId> = Vec::new();
    let mut path_scores: Vec<f64> = Vec::new();

    let mut stack: Vec<(NodeId, usize)> = tree.roots().iter().rev().map(|&r| (r, 0)).collect();

    while let Some((id, depth)) = stack.pop() {
        path.truncate(depth);
        path_scores.truncate(depth);
        path.push(id);
        path_scores.push(walk.score_of(id));

        chains.push(AttackChain {
            nodes: path.clone(),
            node_scores: path_scores.clone(),
            cumulative_score: scoring::cumulative_score(&path_scores, config),
        });

        for &child in tree.children(id).iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    chains
}

/// Sort chains into ranking order. Stable and total.
pub fn rank_chains(walk: &TreeWalk, chains: &mut [AttackChain]) {
    chains.sort_by(|a, b| compare_chains(walk, a, b));
}

/// Enumerate and rank in one step.
pub fn ranked_chains(tree: &AttackTree, walk: &TreeWalk, config: &ScoringConfig) -> Vec<AttackChain> {
    let mut chains = enumerate_chains(tree, walk, config);
    rank_chains(walk, &mut chains);

    tracing::debug!(
        chains = chains.len(),
        top_score = chains.first().map(|c| c.cumulative_score).unwrap_or(0.0),
        aggregation = config.aggregation.as_str(),
        "Attack chains ranked"
    );

    chains
}

fn compare_chains(walk: &TreeWalk, a: &AttackChain, b: &AttackChain) -> Ordering {
    b.cumulative_score
        .total_cmp(&a.cumulative_score)
        .then_with(|| a.depth().cmp(&b.depth()))
        .then_with(|| {
            let pos_a = a.terminal().map(|id| walk.position_of(id));
            let pos_b = b.terminal().map(|id| walk.position_of(id));
            pos_a.cmp(&pos_b)
        })
}
