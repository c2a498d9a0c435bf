use std::fmt;

use thiserror::Error;

/// Location of a node inside an attack tree, root first.
///
/// Unnamed nodes are identified by their position in the input
/// (`attack_paths[0]`, `subpaths[2]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// A new path one level below `self`.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last segment, usually the offending node's name.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<tree>");
        }
        write!(f, "{}", self.0.join(" > "))
    }
}

/// Malformed attack tree input. Always fatal for the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Node at {path} has an empty name")]
    EmptyName { path: NodePath },

    #[error("Node {path}: {field} = {value} is outside the rating scale {min}..={max}")]
    RatingOutOfRange {
        path: NodePath,
        field: &'static str,
        value: i64,
        min: u8,
        max: u8,
    },

    #[error("Node {path} has partial ratings (missing {missing})")]
    PartialRatings { path: NodePath, missing: String },

    #[error("Node {path} has no ratings; only a root node may omit them")]
    MissingRatings { path: NodePath },

    #[error("Node {path} is attached to more than one parent")]
    MultipleParents { path: NodePath },

    #[error("Attaching {path} would create a cycle")]
    Cycle { path: NodePath },

    #[error("Unknown node handle #{index}")]
    UnknownNode { index: usize },

    #[error("Attack tree has no nodes")]
    EmptyTree,
}

impl ValidationError {
    /// Path of the offending node, when the error refers to one.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Self::EmptyName { path }
            | Self::RatingOutOfRange { path, .. }
            | Self::PartialRatings { path, .. }
            | Self::MissingRatings { path }
            | Self::MultipleParents { path }
            | Self::Cycle { path } => Some(path),
            Self::UnknownNode { .. } | Self::EmptyTree => None,
        }
    }

    /// Replace the node path, used when a node validated in isolation is
    /// placed into a tree.
    pub fn with_path(mut self, new_path: NodePath) -> Self {
        match &mut self {
            Self::EmptyName { path }
            | Self::RatingOutOfRange { path, .. }
            | Self::PartialRatings { path, .. }
            | Self::MissingRatings { path }
            | Self::MultipleParents { path }
            | Self::Cycle { path } => *path = new_path,
            Self::UnknownNode { .. } | Self::EmptyTree => {}
        }
        self
    }
}

/// Scoring configuration outside the documented contract.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Weight {field} = {value} must be finite and non-negative")]
    InvalidWeight { field: &'static str, value: f64 },

    #[error("Scoring weights must sum to 1.0, got {sum}")]
    WeightsNotNormalized { sum: f64 },

    #[error("Rating scale {min}..={max} is empty")]
    InvalidScale { min: u8, max: u8 },

    #[error("Precision {precision} exceeds the maximum of {max} decimal places")]
    InvalidPrecision { precision: u32, max: u32 },

    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path_display_joins_segments() {
        let path = NodePath::root("Compromise Organization").child("Access HR Database");
        assert_eq!(
            path.to_string(),
            "Compromise Organization > Access HR Database"
        );
        assert_eq!(path.leaf(), Some("Access HR Database"));
        assert_eq!(NodePath::default().to_string(), "<tree>");
    }

    #[test]
    fn with_path_replaces_location() {
        let err = ValidationError::EmptyName {
            path: NodePath::root("<unnamed>"),
        }
        .with_path(NodePath::root("Root").child("subpaths[1]"));
        assert_eq!(
            err.path().map(ToString::to_string).as_deref(),
            Some("Root > subpaths[1]")
        );
    }

    #[test]
    fn error_message_names_the_node() {
        let err = ValidationError::RatingOutOfRange {
            path: NodePath::root("Root").child("Phish CFO"),
            field: "severity",
            value: 9,
            min: 1,
            max: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("Phish CFO"));
        assert!(msg.contains("severity = 9"));
    }
}
