//! In-memory attack tree.
//!
//! Nodes are stored in a dense arena and refer to each other by [`NodeId`].
//! Each parent owns an ordered child list, so sharing and cycles cannot be
//! expressed once a tree is built. [`TreeBuilder`] enforces this while
//! nodes are being linked; [`AttackTree::from_records`] builds a tree from
//! nested input records in pre-order with an explicit work stack.

use cyberpath_core::{AttackNode, AttackNodeRecord, NodePath, RatingScale, ValidationError};
use serde::{Deserialize, Serialize};

/// Dense index (0..N-1) of a node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A validated, immutable attack tree (or forest of independent roots).
#[derive(Debug, Clone)]
pub struct AttackTree {
    nodes: Vec<AttackNode>,
    /// `children[i]` = ordered children of node `i`.
    children: Vec<Vec<NodeId>>,
    parents: Vec<Option<NodeId>>,
    roots: Vec<NodeId>,
}

impl AttackTree {
    /// Validate nested input records into a tree.
    ///
    /// Fails on the first invalid node in pre-order, reporting its path.
    /// Node ids are assigned in pre-order.
    pub fn from_records(
        records: &[AttackNodeRecord],
        scale: &RatingScale,
    ) -> Result<Self, ValidationError> {
        let mut builder = TreeBuilder::new();

        // (record, parent, position among its siblings)
        let mut stack: Vec<(&AttackNodeRecord, Option<NodeId>, usize)> = records
            .iter()
            .enumerate()
            .rev()
            .map(|(i, r)| (r, None, i))
            .collect();

        while let Some((record, parent, position)) = stack.pop() {
            let node = record.to_node(parent.is_none(), scale).map_err(|e| {
                let path = match parent {
                    Some(p) => builder.path_of(p).child(segment(record, "subpaths", position)),
                    None => NodePath::root(segment(record, "attack_paths", position)),
                };
                e.with_path(path)
            })?;
            let id = builder.add_node(node);
            if let Some(parent) = parent {
                builder.attach(parent, id)?;
            }

            for (i, child) in record.subpaths.iter().enumerate().rev() {
                stack.push((child, Some(id), i));
            }
        }

        builder.build()
    }

    pub fn node(&self, id: NodeId) -> &AttackNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.0]
    }

    /// Roots in declaration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children[id.0].is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_empty()).count()
    }

    /// Ancestors of `id` followed by `id` itself, root first.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        ancestry(&self.parents, id)
    }

    /// Name path of `id`, root first.
    pub fn path_of(&self, id: NodeId) -> NodePath {
        names_path(&self.nodes, &self.parents, id)
    }

    /// All nodes with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AttackNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// BLAKE3 digest (hex) of the validated tree.
    ///
    /// Hashes nodes in id order: parent, name, technique, ratings, steps.
    /// Strings are length-prefixed. The same tree read from YAML or JSON
    /// has the same digest, and no step recurses on depth.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.nodes.len() as u64).to_le_bytes());

        for (id, node) in self.iter() {
            let parent = self.parent(id).map_or(u64::MAX, |p| p.0 as u64);
            hasher.update(&parent.to_le_bytes());
            hash_str(&mut hasher, node.name());
            match node.technique() {
                Some(technique) => {
                    hasher.update(&[1]);
                    hash_str(&mut hasher, technique);
                }
                None => {
                    hasher.update(&[0]);
                }
            }
            let ratings = node.ratings();
            hasher.update(&[
                ratings.severity,
                ratings.feasibility,
                ratings.expertise,
                u8::from(node.is_organizational()),
            ]);
            hasher.update(&(node.steps().len() as u64).to_le_bytes());
            for step in node.steps() {
                hash_str(&mut hasher, &step.source);
                hash_str(&mut hasher, &step.destination);
                hash_str(&mut hasher, &step.action);
            }
        }

        hasher.finalize().to_hex().to_string()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Incremental tree construction from already-validated nodes.
///
/// `attach` rejects a second parent, self-links, and links that would
/// close a cycle, so [`TreeBuilder::build`] always yields a forest.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<AttackNode>,
    children: Vec<Vec<NodeId>>,
    parents: Vec<Option<NodeId>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: AttackNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.children.push(Vec::new());
        self.parents.push(None);
        id
    }

    /// Name path of an added node, root first.
    pub fn path_of(&self, id: NodeId) -> NodePath {
        names_path(&self.nodes, &self.parents, id)
    }

    /// Append `child` to the end of `parent`'s child list.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), ValidationError> {
        for id in [parent, child] {
            if id.0 >= self.nodes.len() {
                return Err(ValidationError::UnknownNode { index: id.0 });
            }
        }

        let child_path = || self.path_of(parent).child(self.nodes[child.0].name());

        if self.parents[child.0].is_some() {
            return Err(ValidationError::MultipleParents { path: child_path() });
        }

        // Since every node has at most one parent, a cycle exists exactly
        // when `child` is already an ancestor of `parent`.
        if ancestry(&self.parents, parent).contains(&child) {
            return Err(ValidationError::Cycle { path: child_path() });
        }

        if self.nodes[child.0].is_organizational() {
            return Err(ValidationError::MissingRatings { path: child_path() });
        }

        self.parents[child.0] = Some(parent);
        self.children[parent.0].push(child);
        Ok(())
    }

    pub fn build(self) -> Result<AttackTree, ValidationError> {
        if self.nodes.is_empty() {
            return Err(ValidationError::EmptyTree);
        }

        let roots = self
            .parents
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| NodeId(i))
            .collect();

        Ok(AttackTree {
            nodes: self.nodes,
            children: self.children,
            parents: self.parents,
            roots,
        })
    }
}

fn segment(record: &AttackNodeRecord, field: &str, position: usize) -> String {
    if record.name.trim().is_empty() {
        format!("{field}[{position}]")
    } else {
        record.name.clone()
    }
}

fn ancestry(parents: &[Option<NodeId>], id: NodeId) -> Vec<NodeId> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(parent) = parents[current.0] {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    chain
}

fn names_path(nodes: &[AttackNode], parents: &[Option<NodeId>], id: NodeId) -> NodePath {
    let mut path = NodePath::default();
    for ancestor in ancestry(parents, id) {
        path = path.child(nodes[ancestor.0].name());
    }
    path
}
