//! Merkle node types for artifact file trees
//!
//! A node is either a FILE leaf (its hash is the hash of the file's raw
//! bytes) or a DIRECTORY (its hash derives from the canonical encoding
//! of its children, see [`crate::graph::hasher`]). Trees are immutable
//! after construction; re-verification always recomputes from the stored
//! tree rather than trusting cached validity.

use crate::error::GraphError;
use crate::graph::hasher;
use crate::graph::path::normalize_node_path;
use crate::hash::{ContentHash, HashAlgorithm};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Conventional path of an artifact's root directory node.
pub const ROOT_PATH: &str = ".";

/// File node representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub content_hash: ContentHash,
    pub size: u64,
}

/// Directory node representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub path: String,
    pub content_hash: ContentHash,
    pub children: Vec<MerkleNode>,
}

/// Merkle node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MerkleNode {
    File(FileNode),
    Directory(DirectoryNode),
}

impl FileNode {
    /// Create a file node with a declared content hash.
    pub fn new(
        path: &str,
        content_hash: ContentHash,
        size: u64,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            path: normalize_node_path(path)?,
            content_hash,
            size,
        })
    }
}

impl DirectoryNode {
    /// Create a directory node, deriving its hash from the children.
    ///
    /// Children are stored sorted by path; sibling paths must be unique.
    /// An empty child list is a valid (empty) directory.
    pub fn new(
        path: &str,
        children: Vec<MerkleNode>,
        algorithm: HashAlgorithm,
    ) -> Result<Self, GraphError> {
        let path = if path == ROOT_PATH {
            ROOT_PATH.to_string()
        } else {
            normalize_node_path(path)?
        };

        let mut seen = BTreeSet::new();
        for child in &children {
            if !seen.insert(child.path().to_string()) {
                return Err(GraphError::DuplicateChild(child.path().to_string()));
            }
        }

        let mut children = children;
        children.sort_by(|a, b| a.path().as_bytes().cmp(b.path().as_bytes()));

        let content_hash = hasher::compute_directory_hash(&children, algorithm);

        Ok(Self {
            path,
            content_hash,
            children,
        })
    }

    /// Create the artifact root directory node.
    pub fn root(
        children: Vec<MerkleNode>,
        algorithm: HashAlgorithm,
    ) -> Result<Self, GraphError> {
        Self::new(ROOT_PATH, children, algorithm)
    }
}

impl MerkleNode {
    pub fn path(&self) -> &str {
        match self {
            MerkleNode::File(f) => &f.path,
            MerkleNode::Directory(d) => &d.path,
        }
    }

    pub fn content_hash(&self) -> &ContentHash {
        match self {
            MerkleNode::File(f) => &f.content_hash,
            MerkleNode::Directory(d) => &d.content_hash,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, MerkleNode::File(_))
    }

    /// Children of this node. Files have none.
    pub fn children(&self) -> &[MerkleNode] {
        match self {
            MerkleNode::File(_) => &[],
            MerkleNode::Directory(d) => &d.children,
        }
    }

    /// Locate a node by its artifact-relative path.
    ///
    /// Walks the tree from this node, descending into the child whose
    /// path prefixes the target. Returns `None` if no node matches.
    pub fn find(&self, target: &str) -> Option<&MerkleNode> {
        if self.path() == target {
            return Some(self);
        }
        for child in self.children() {
            if child.path() == target {
                return Some(child);
            }
            let is_prefix = target.len() > child.path().len()
                && target.starts_with(child.path())
                && target.as_bytes()[child.path().len()] == b'/';
            if is_prefix {
                return child.find(target);
            }
        }
        None
    }
}
