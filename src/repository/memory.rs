//! In-memory reference repository
//!
//! Backs the graph port with a `HashMap` behind a `parking_lot` RwLock.
//! Signature appends take the write lock, which serializes concurrent
//! `add_signature` calls for the same artifact — no append is lost.
//! Locks are never held across an await point.

use crate::error::RepositoryError;
use crate::graph::{MerkleGraph, Signature};
use crate::hash::ContentHash;
use crate::repository::{check_signature_root, MerkleGraphRepository};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Reference implementation of [`MerkleGraphRepository`].
#[derive(Default)]
pub struct InMemoryGraphRepository {
    graphs: RwLock<HashMap<String, MerkleGraph>>,
}

impl InMemoryGraphRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MerkleGraphRepository for InMemoryGraphRepository {
    async fn save(&self, graph: MerkleGraph) -> Result<MerkleGraph, RepositoryError> {
        let mut graphs = self.graphs.write();
        if graphs.contains_key(&graph.artifact_id) {
            return Err(RepositoryError::DuplicateArtifact(graph.artifact_id));
        }
        graphs.insert(graph.artifact_id.clone(), graph.clone());
        Ok(graph)
    }

    async fn add_signature(
        &self,
        artifact_id: &str,
        signature: Signature,
    ) -> Result<MerkleGraph, RepositoryError> {
        let mut graphs = self.graphs.write();
        let graph = graphs
            .get_mut(artifact_id)
            .ok_or_else(|| RepositoryError::GraphNotFound(artifact_id.to_string()))?;
        check_signature_root(graph, &signature)?;
        graph.signatures.push(signature);
        Ok(graph.clone())
    }

    async fn verify_graph_structure(
        &self,
        artifact_id: &str,
    ) -> Result<bool, RepositoryError> {
        let graphs = self.graphs.read();
        let graph = graphs
            .get(artifact_id)
            .ok_or_else(|| RepositoryError::GraphNotFound(artifact_id.to_string()))?;
        Ok(graph.verify_structure())
    }

    async fn find_by_artifact_id(
        &self,
        artifact_id: &str,
    ) -> Result<Option<MerkleGraph>, RepositoryError> {
        Ok(self.graphs.read().get(artifact_id).cloned())
    }

    async fn find_by_root_hash(
        &self,
        root_hash: &ContentHash,
    ) -> Result<Option<MerkleGraph>, RepositoryError> {
        let graphs = self.graphs.read();
        let mut matches: Vec<&MerkleGraph> = graphs
            .values()
            .filter(|g| g.root_hash() == root_hash)
            .collect();
        // Deterministic winner when several artifacts share content.
        matches.sort_by(|a, b| a.artifact_id.cmp(&b.artifact_id));
        Ok(matches.first().map(|g| (*g).clone()))
    }

    async fn find_by_signature_key_id(
        &self,
        key_id: &str,
    ) -> Result<Vec<MerkleGraph>, RepositoryError> {
        let graphs = self.graphs.read();
        let mut matches: Vec<MerkleGraph> = graphs
            .values()
            .filter(|g| g.signatures.iter().any(|s| s.key_id == key_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.artifact_id.cmp(&b.artifact_id));
        Ok(matches)
    }
}
