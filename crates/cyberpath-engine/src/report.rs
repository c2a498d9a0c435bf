//! Markdown report and PlantUML diagram generation.
//!
//! Pure string builders over the engine output. Rendering the diagram to
//! an image is left to PlantUML itself.

use std::fmt::Write as _;

use serde::Serialize;

use crate::chains::AttackChain;
use crate::tree::{AttackTree, NodeId};
use crate::walk::TreeWalk;

/// Coarse risk band used for diagram colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// `< 2.0` low, `< 4.0` medium, otherwise high.
    pub fn from_score(score: f64) -> Self {
        if score < 2.0 {
            Self::Low
        } else if score < 4.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#27ae60",
            Self::Medium => "#f1c40f",
            Self::High => "#e74c3c",
        }
    }
}

/// One row per node in walk order, names indented by depth.
pub fn scoring_table(tree: &AttackTree, walk: &TreeWalk) -> String {
    let mut out = String::from(
        "| Path / Subpath | Technique | Severity | Feasibility | Expertise | Score |\n\
         |---|---|---|---|---|---|\n",
    );

    for entry in walk.entries() {
        let node = tree.node(entry.node);
        let ratings = node.ratings();
        let _ = writeln!(
            out,
            "| {}{} | {} | {} | {} | {} | {:.2} |",
            "└─ ".repeat(entry.depth),
            escape_cell(node.name()),
            node.technique().map(escape_cell).unwrap_or_default(),
            ratings.severity,
            ratings.feasibility,
            ratings.expertise,
            entry.score,
        );
    }

    out
}

/// Ranked chains with their cumulative scores.
pub fn chain_table(tree: &AttackTree, chains: &[AttackChain]) -> String {
    let mut out = String::from("| Full Attack Chain | Cumulative Score |\n|---|---|\n");

    for chain in chains {
        let names: Vec<String> = chain.names(tree).into_iter().map(escape_cell).collect();
        let _ = writeln!(out, "| {} | {:.2} |", names.join(" → "), chain.cumulative_score);
    }

    out
}

/// Full report: diagram link (when an image is available) and both tables.
pub fn markdown_report(
    tree: &AttackTree,
    walk: &TreeWalk,
    chains: &[AttackChain],
    image_path: Option<&str>,
) -> String {
    let mut out = String::from("# Pentest Attack Paths Report\n\n");

    if let Some(image) = image_path {
        let _ = write!(
            out,
            "## Attack Path Diagram\n\n![Attack Paths]({image})\n\n"
        );
    }

    let _ = write!(
        out,
        "## Scoring Table\n\n{}\n## Full Attack Chain Comparison\n\n{}",
        scoring_table(tree, walk),
        chain_table(tree, chains),
    );

    out
}

/// PlantUML attack tree, left to right, nodes coloured by score band.
///
/// Node ids derive from the node's walk position, so nodes with equal names
/// stay distinct. Each edge is labelled with the child's step actions.
pub fn plantuml(tree: &AttackTree, walk: &TreeWalk) -> String {
    let mut out = String::from(
        "@startuml\nskinparam monochrome false\nskinparam linetype ortho\nleft to right direction\n",
    );

    for entry in walk.entries() {
        let node = tree.node(entry.node);
        let _ = writeln!(
            out,
            "rectangle \"{}\\nScore: {:.2}\" as {} {}",
            escape_label(node.name()),
            entry.score,
            uml_id(walk, entry.node),
            RiskBand::from_score(entry.score).color(),
        );
    }

    for entry in walk.entries() {
        let Some(parent) = tree.parent(entry.node) else {
            continue;
        };
        let actions: Vec<String> = tree
            .node(entry.node)
            .steps()
            .iter()
            .map(|s| escape_label(&s.action))
            .collect();

        let _ = write!(out, "{} --> {}", uml_id(walk, parent), uml_id(walk, entry.node));
        if !actions.is_empty() {
            let _ = write!(out, " : {}", actions.join("\\n"));
        }
        out.push('\n');
    }

    out.push_str("@enduml\n");
    out
}

fn uml_id(walk: &TreeWalk, id: NodeId) -> String {
    format!("node_{}", walk.position_of(id))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn escape_label(text: &str) -> String {
    text.replace('"', "'").replace('\n', "\\n")
}
