//! cyberpath-engine: Attack tree scoring and chain ranking.
//!
//! Validates nested attack-node records into an owned tree, scores every
//! node once in a pre-order walk, enumerates one root-to-node chain per
//! node, and ranks chains by cumulative score. Markdown and PlantUML
//! writers render the result. Runs can be appended to a hash-linked ledger.

pub mod chains;
pub mod error;
pub mod ledger;
pub mod load;
pub mod report;
pub mod scoring;
pub mod tree;
pub mod types;
pub mod walk;

pub use chains::AttackChain;
pub use error::EngineError;
pub use ledger::{RunEntry, RunLedger, RunSummary};
pub use load::InputFormat;
pub use tree::{AttackTree, NodeId, TreeBuilder};
pub use types::{AnalysisResult, RankedChain, ScoredNode, TreeStats};
pub use walk::{TreeWalk, WalkEntry};

use cyberpath_core::{AttackNodeRecord, ScoringConfig};

/// Walk and ranked chains of one tree.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub walk: TreeWalk,
    /// In ranking order.
    pub chains: Vec<AttackChain>,
}

impl Evaluation {
    pub fn stats(&self, tree: &AttackTree) -> TreeStats {
        TreeStats {
            nodes: tree.len(),
            roots: tree.roots().len(),
            leaves: tree.leaf_count(),
            max_depth: self.walk.max_depth(),
        }
    }
}

/// Everything produced by one engine run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tree: AttackTree,
    pub evaluation: Evaluation,
    pub result: AnalysisResult,
}

/// The attack tree scoring engine.
///
/// Holds a validated [`ScoringConfig`]; every run reads it and nothing else.
#[derive(Debug, Clone)]
pub struct AttackTreeEngine {
    config: ScoringConfig,
    ledger_dir: Option<String>,
}

impl AttackTreeEngine {
    /// Create an engine, rejecting an invalid configuration.
    pub fn new(config: ScoringConfig) -> error::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ledger_dir: None,
        })
    }

    /// Append a ledger entry in `dir` after every run.
    pub fn with_ledger_dir(mut self, dir: impl Into<String>) -> Self {
        self.ledger_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Validate records into a tree using the configured rating scale.
    pub fn build_tree(&self, records: &[AttackNodeRecord]) -> error::Result<AttackTree> {
        Ok(AttackTree::from_records(records, &self.config.scale)?)
    }

    /// Score and rank an already validated tree.
    pub fn evaluate(&self, tree: &AttackTree) -> Evaluation {
        let walk = walk::walk(tree, &self.config);
        let chains = chains::ranked_chains(tree, &walk, &self.config);
        Evaluation { walk, chains }
    }

    /// Full run: validate → digest → walk → rank → ledger → result.
    ///
    /// All-or-nothing: a validation error yields no partial output.
    pub fn analyze(&self, records: &[AttackNodeRecord]) -> error::Result<AnalysisResult> {
        self.analyze_detailed(records).map(|analysis| analysis.result)
    }

    /// [`analyze`](Self::analyze), also handing back the tree and its
    /// evaluation for the report writers.
    pub fn analyze_detailed(&self, records: &[AttackNodeRecord]) -> error::Result<Analysis> {
        let start = std::time::Instant::now();

        let tree = self.build_tree(records)?;
        let tree_digest = tree.digest();
        let evaluation = self.evaluate(&tree);
        let stats = evaluation.stats(&tree);

        let nodes = scored_nodes(&tree, &evaluation.walk);
        let chains = ranked_chain_rows(&tree, &evaluation.chains);

        let computation_ms = start.elapsed().as_millis() as u64;
        let top_score = chains.first().map(|c| c.cumulative_score).unwrap_or(0.0);

        let run_id = self.ledger_dir.as_deref().and_then(|dir| {
            let summary = RunSummary {
                nodes: stats.nodes,
                roots: stats.roots,
                chains: chains.len(),
                max_depth: stats.max_depth,
                top_chain: chains.first().map(|c| c.names.clone()).unwrap_or_default(),
                top_score,
                computation_ms,
            };
            self.record_run(dir, &tree_digest, summary)
        });

        tracing::info!(
            tree_digest = %tree_digest,
            nodes = stats.nodes,
            chains = chains.len(),
            top_score,
            computation_ms,
            "Attack tree analyzed"
        );

        let result = AnalysisResult {
            tree_digest,
            scoring: self.config.clone(),
            nodes,
            chains,
            stats,
            computation_ms,
            run_id,
        };

        Ok(Analysis {
            tree,
            evaluation,
            result,
        })
    }

    /// Append to the ledger. A failed write is logged and yields no id;
    /// the analysis itself still succeeds.
    fn record_run(&self, dir: &str, tree_digest: &str, summary: RunSummary) -> Option<String> {
        let appended = RunLedger::open(dir)
            .and_then(|ledger| ledger.append(tree_digest, &self.config, summary));
        match appended {
            Ok(entry) => Some(entry.run_id.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, dir, "Failed to record run in ledger");
                None
            }
        }
    }
}

impl Default for AttackTreeEngine {
    fn default() -> Self {
        Self {
            config: ScoringConfig::default(),
            ledger_dir: None,
        }
    }
}

fn scored_nodes(tree: &AttackTree, walk: &TreeWalk) -> Vec<ScoredNode> {
    walk.entries()
        .iter()
        .map(|entry| {
            let node = tree.node(entry.node);
            ScoredNode {
                id: entry.node.index(),
                name: node.name().to_string(),
                depth: entry.depth,
                parent: tree.parent(entry.node).map(NodeId::index),
                technique: node.technique().map(str::to_string),
                ratings: node.ratings(),
                score: entry.score,
                organizational: node.is_organizational(),
            }
        })
        .collect()
}

fn ranked_chain_rows(tree: &AttackTree, chains: &[AttackChain]) -> Vec<RankedChain> {
    chains
        .iter()
        .enumerate()
        .map(|(i, chain)| RankedChain {
            rank: i + 1,
            nodes: chain.nodes.iter().map(|id| id.index()).collect(),
            names: chain.names(tree).into_iter().map(str::to_string).collect(),
            node_scores: chain.node_scores.clone(),
            cumulative_score: chain.cumulative_score,
            depth: chain.depth(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberpath_core::ConfigurationError;

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = ScoringConfig {
            severity_weight: 0.9,
            ..Default::default()
        };
        assert!(matches!(
            AttackTreeEngine::new(config),
            Err(EngineError::Configuration(ConfigurationError::WeightsNotNormalized { .. }))
        ));
    }

    #[test]
    fn test_analyze_without_ledger_dir() {
        let records = vec![AttackNodeRecord {
            name: "only".to_string(),
            severity: Some(3),
            feasibility: Some(3),
            expertise: Some(3),
            ..Default::default()
        }];

        let result = AttackTreeEngine::default().analyze(&records).unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.chains.len(), 1);
        assert_eq!(result.chains[0].rank, 1);
        assert_eq!(result.stats.leaves, 1);
        assert!(result.run_id.is_none());
    }
}
