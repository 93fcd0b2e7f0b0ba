//! Artifact Merkle Graph
//!
//! Models an artifact version's file/directory structure as a Merkle
//! hash tree. The root node's hash is the artifact's single integrity
//! fingerprint; signatures attach to that root over time. Graphs are
//! never structurally mutated after creation — only the signature list
//! grows.

pub mod builder;
pub mod hasher;
pub mod node;
pub mod path;
pub mod walker;

pub use builder::{GraphBuilder, IngestReport};
pub use node::{DirectoryNode, FileNode, MerkleNode};

use crate::error::GraphError;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};

/// A cryptographic signature over a content hash, bound to a signer key.
///
/// `value` holds the hex-encoded signature bytes; `content_hash` is the
/// hash that was signed — normally the root of the graph the signature
/// is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub value: String,
    pub algorithm: String,
    pub content_hash: ContentHash,
    pub key_id: String,
}

/// One Merkle graph per artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleGraph {
    pub artifact_id: String,
    pub root: MerkleNode,
    pub signatures: Vec<Signature>,
}

impl MerkleGraph {
    /// Create a graph for an artifact with an empty signature list.
    pub fn new(artifact_id: impl Into<String>, root: MerkleNode) -> Result<Self, GraphError> {
        let artifact_id = artifact_id.into();
        if artifact_id.trim().is_empty() {
            return Err(GraphError::BlankArtifactId);
        }
        Ok(Self {
            artifact_id,
            root,
            signatures: Vec::new(),
        })
    }

    /// The artifact's integrity fingerprint.
    pub fn root_hash(&self) -> &ContentHash {
        self.root.content_hash()
    }

    /// Locate a node by artifact-relative path.
    pub fn find_node(&self, path: &str) -> Option<&MerkleNode> {
        self.root.find(path)
    }

    /// Recompute every directory hash and compare to the stored tree.
    pub fn verify_structure(&self) -> bool {
        hasher::verify_structure(&self.root)
    }

    /// Return a copy of this graph with one more signature appended.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }
}
