//! Risk scoring for attack nodes and chains.
//!
//! Node formula:
//! `score = w_s × severity + w_f × feasibility + w_e × (min + max − expertise)`
//!
//! With weights summing to 1.0 the score stays on the rating scale. Expertise
//! enters inverted: the more skill an attack requires, the lower its risk.
//! Scores are rounded to the configured precision.

use cyberpath_core::{AttackNode, ChainAggregation, Ratings, ScoringConfig};

/// Score a validated node.
pub fn score(node: &AttackNode, config: &ScoringConfig) -> f64 {
    score_ratings(node.ratings(), config)
}

/// Score a node from its three ratings. Pure and deterministic.
pub fn score_ratings(ratings: Ratings, config: &ScoringConfig) -> f64 {
    let severity = f64::from(ratings.severity);
    let feasibility = f64::from(ratings.feasibility);
    let barrier = f64::from(config.scale.invert(ratings.expertise));

    let raw = config.severity_weight * severity
        + config.feasibility_weight * feasibility
        + config.expertise_weight * barrier;

    config.round(raw)
}

/// Fold the node scores of a chain (root first) into its cumulative score.
///
/// Both policies return the root's own score for a root-only chain, and
/// appending a node pulls the aggregate toward that node's score.
/// Returns 0.0 for an empty slice.
pub fn cumulative_score(node_scores: &[f64], config: &ScoringConfig) -> f64 {
    if node_scores.is_empty() {
        return 0.0;
    }

    let raw = match config.aggregation {
        ChainAggregation::Mean => node_scores.iter().sum::<f64>() / node_scores.len() as f64,
        ChainAggregation::DepthWeighted => {
            let (weighted, total_weight) = node_scores.iter().enumerate().fold(
                (0.0, 0.0),
                |(acc, weights), (depth, score)| {
                    let weight = (depth + 1) as f64;
                    (acc + weight * score, weights + weight)
                },
            );
            weighted / total_weight
        }
    };

    config.round(raw)
}
