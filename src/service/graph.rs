//! Graph lifecycle coordination
//!
//! Thin delegation over the repository port. The contract matters more
//! than the code: duplicate artifacts and stale-root signatures surface
//! as their own error kinds (the repository enforces both), and absent
//! lookups are `None`, never errors.

use crate::error::ServiceError;
use crate::graph::{MerkleGraph, MerkleNode, Signature};
use crate::hash::ContentHash;
use crate::repository::MerkleGraphRepository;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct MerkleGraphService {
    repository: Arc<dyn MerkleGraphRepository>,
}

impl MerkleGraphService {
    pub fn new(repository: Arc<dyn MerkleGraphRepository>) -> Self {
        Self { repository }
    }

    /// Create and persist a graph for an artifact version.
    ///
    /// The graph starts with an empty signature list. Fails with
    /// [`crate::error::RepositoryError::DuplicateArtifact`] if the
    /// artifact already has a graph.
    #[instrument(skip(self, root))]
    pub async fn create_graph(
        &self,
        artifact_id: &str,
        root: MerkleNode,
    ) -> Result<MerkleGraph, ServiceError> {
        let graph = MerkleGraph::new(artifact_id, root)?;
        let saved = self.repository.save(graph).await?;
        debug!(root_hash = %saved.root_hash(), "Created graph");
        Ok(saved)
    }

    /// Attach a signature to an artifact's graph.
    ///
    /// The repository validates that the signature covers the graph's
    /// current root hash before accepting it.
    #[instrument(skip(self, signature), fields(key_id = %signature.key_id))]
    pub async fn add_signature(
        &self,
        artifact_id: &str,
        signature: Signature,
    ) -> Result<MerkleGraph, ServiceError> {
        Ok(self.repository.add_signature(artifact_id, signature).await?)
    }

    /// Structural validity of the stored tree (hashes recomputed
    /// bottom-up).
    pub async fn verify_graph(&self, artifact_id: &str) -> Result<bool, ServiceError> {
        Ok(self.repository.verify_graph_structure(artifact_id).await?)
    }

    pub async fn find_by_artifact_id(
        &self,
        artifact_id: &str,
    ) -> Result<Option<MerkleGraph>, ServiceError> {
        Ok(self.repository.find_by_artifact_id(artifact_id).await?)
    }

    pub async fn find_by_root_hash(
        &self,
        root_hash: &ContentHash,
    ) -> Result<Option<MerkleGraph>, ServiceError> {
        Ok(self.repository.find_by_root_hash(root_hash).await?)
    }

    pub async fn find_by_signature_key_id(
        &self,
        key_id: &str,
    ) -> Result<Vec<MerkleGraph>, ServiceError> {
        Ok(self.repository.find_by_signature_key_id(key_id).await?)
    }
}
