//! Serializable output of an engine run.

use cyberpath_core::{Ratings, ScoringConfig};
use serde::{Deserialize, Serialize};

/// One row of the scored pre-order walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub id: usize,
    pub name: String,
    /// Distance from the root (root = 0).
    pub depth: usize,
    pub parent: Option<usize>,
    pub technique: Option<String>,
    pub ratings: Ratings,
    pub score: f64,
    pub organizational: bool,
}

/// A ranked root-to-node chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChain {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Node ids, root first.
    pub nodes: Vec<usize>,
    pub names: Vec<String>,
    pub node_scores: Vec<f64>,
    pub cumulative_score: f64,
    pub depth: usize,
}

/// Shape of the validated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub nodes: usize,
    pub roots: usize,
    pub leaves: usize,
    pub max_depth: usize,
}

/// Complete result of [`crate::AttackTreeEngine::analyze`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// BLAKE3 digest of the validated tree.
    pub tree_digest: String,
    pub scoring: ScoringConfig,
    /// Pre-order walk.
    pub nodes: Vec<ScoredNode>,
    /// Chains in ranking order.
    pub chains: Vec<RankedChain>,
    pub stats: TreeStats,
    pub computation_ms: u64,
    /// Ledger entry id; set only once the entry was written.
    pub run_id: Option<String>,
}
