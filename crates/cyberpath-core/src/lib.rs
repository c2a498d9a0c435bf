//! cyberpath-core: Shared types, configuration, and error handling for CyberPath.
//!
//! This crate provides the foundational types used across all CyberPath components:
//! - Attack node input records and validated nodes
//! - Steps (edge annotations) describing how a node is realized
//! - Scoring configuration (weights, rating scale, chain aggregation)
//! - Validation and configuration error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{ChainAggregation, RatingScale, ScoringConfig};
pub use error::{ConfigurationError, NodePath, ValidationError};
pub use types::{AttackInput, AttackNode, AttackNodeRecord, Ratings, Step};
