//! Core domain types for CyberPath attack trees.
//!
//! Input documents are deserialized into [`AttackNodeRecord`]s, which mirror
//! the document layout (`subpaths`, `steps`) and carry raw, unchecked
//! ratings. A record becomes an [`AttackNode`] only through validation.

use serde::{Deserialize, Serialize};

use crate::config::RatingScale;
use crate::error::{NodePath, ValidationError};

// ── Steps ─────────────────────────────────────────────────────────

/// A concrete action realizing an attack node.
///
/// Descriptive only: steps never influence scoring and are kept verbatim
/// for the report and diagram writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Acting party or asset.
    pub source: String,
    /// Targeted party or asset.
    pub destination: String,
    /// What happens.
    pub action: String,
}

// ── Input records ─────────────────────────────────────────────────

/// An attack node as written in an input document.
///
/// Every field is optional at this level so that a missing name or rating
/// surfaces as a [`ValidationError`] with a node path instead of an opaque
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackNodeRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasibility: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expertise: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subpaths: Vec<AttackNodeRecord>,
}

impl AttackNodeRecord {
    /// Validate this record (not its subpaths) into an [`AttackNode`].
    ///
    /// A root record without any rating is an organizational marker and
    /// receives the uniform minimum rating. Any other missing rating is an
    /// error; ratings are never filled in piecemeal.
    pub fn to_node(&self, is_root: bool, scale: &RatingScale) -> Result<AttackNode, ValidationError> {
        let path = NodePath::root(display_name(&self.name));
        let raw = [
            ("severity", self.severity),
            ("feasibility", self.feasibility),
            ("expertise", self.expertise),
        ];

        let missing: Vec<&str> = raw
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(field, _)| *field)
            .collect();

        let (ratings, organizational) = match missing.len() {
            0 => {
                for (field, value) in raw {
                    let value = value.unwrap_or_default();
                    if !scale.contains(value) {
                        return Err(ValidationError::RatingOutOfRange {
                            path,
                            field,
                            value,
                            min: scale.min,
                            max: scale.max,
                        });
                    }
                }
                let ratings = Ratings {
                    severity: narrow(self.severity),
                    feasibility: narrow(self.feasibility),
                    expertise: narrow(self.expertise),
                };
                (ratings, false)
            }
            3 if is_root => (Ratings::uniform(scale.min), true),
            3 => return Err(ValidationError::MissingRatings { path }),
            _ => {
                return Err(ValidationError::PartialRatings {
                    path,
                    missing: missing.join(", "),
                })
            }
        };

        let mut node = AttackNode::new(
            self.name.clone(),
            self.technique.clone(),
            ratings,
            self.steps.clone(),
            scale,
        )?;
        node.organizational = organizational;
        Ok(node)
    }
}

/// Range-checked by the caller.
fn narrow(value: Option<i64>) -> u8 {
    value.and_then(|v| u8::try_from(v).ok()).unwrap_or_default()
}

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "<unnamed>"
    } else {
        name
    }
}

/// Top-level input document.
///
/// Accepts the `attack_paths:` document layout, a bare list of roots
/// (a forest), or a single root node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttackInput {
    Document { attack_paths: Vec<AttackNodeRecord> },
    Forest(Vec<AttackNodeRecord>),
    Single(AttackNodeRecord),
}

impl AttackInput {
    /// The root records in document order.
    pub fn into_roots(self) -> Vec<AttackNodeRecord> {
        match self {
            Self::Document { attack_paths } => attack_paths,
            Self::Forest(roots) => roots,
            Self::Single(root) => vec![root],
        }
    }
}

// ── Validated nodes ───────────────────────────────────────────────

/// The three ratings of a node, each within the configured scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratings {
    /// Impact if the attack succeeds.
    pub severity: u8,
    /// Ease of execution.
    pub feasibility: u8,
    /// Skill required by the attacker.
    pub expertise: u8,
}

impl Ratings {
    pub fn new(severity: u8, feasibility: u8, expertise: u8) -> Self {
        Self {
            severity,
            feasibility,
            expertise,
        }
    }

    /// Same value for all three ratings.
    pub fn uniform(value: u8) -> Self {
        Self::new(value, value, value)
    }
}

/// A validated attack node. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackNode {
    name: String,
    technique: Option<String>,
    ratings: Ratings,
    steps: Vec<Step>,
    organizational: bool,
}

impl AttackNode {
    /// Build a node, rejecting empty names and ratings outside `scale`.
    pub fn new(
        name: impl Into<String>,
        technique: Option<String>,
        ratings: Ratings,
        steps: Vec<Step>,
        scale: &RatingScale,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                path: NodePath::root(display_name(&name)),
            });
        }

        let fields = [
            ("severity", ratings.severity),
            ("feasibility", ratings.feasibility),
            ("expertise", ratings.expertise),
        ];
        for (field, value) in fields {
            if !scale.contains(i64::from(value)) {
                return Err(ValidationError::RatingOutOfRange {
                    path: NodePath::root(&name),
                    field,
                    value: i64::from(value),
                    min: scale.min,
                    max: scale.max,
                });
            }
        }

        Ok(Self {
            name,
            technique,
            ratings,
            steps,
            organizational: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn technique(&self) -> Option<&str> {
        self.technique.as_deref()
    }

    pub fn ratings(&self) -> Ratings {
        self.ratings
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// True for a root that carried no ratings and was given the uniform
    /// minimum rating.
    pub fn is_organizational(&self) -> bool {
        self.organizational
    }
}
