//! Artifact verification
//!
//! The core integrity algorithm: full-artifact verification (structure
//! plus every attached signature) and single-node content verification
//! (tamper and bit-rot detection). Each call is a fresh deterministic
//! computation over the stored tree — no cached validity is trusted.
//!
//! Outcomes follow a strict split: a determinate "invalid" is
//! `Ok(false)` plus exactly one emitted event; an indeterminate fault
//! (I/O, backend, timeout) is `Err` and emits nothing. Events fire only
//! at terminal decision points, so cancellation at any await leaves no
//! side effects.

use crate::cas::ContentAddressableStore;
use crate::crypto::CryptographicService;
use crate::error::VerifyError;
use crate::events::{
    EventPublisher, MerkleGraphVerifiedEvent, MerkleVerificationFailedEvent,
    TamperingDetectedEvent, VerificationEvent,
};
use crate::graph::MerkleGraph;
use crate::hash::ContentHash;
use crate::repository::MerkleGraphRepository;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Failure reason reported when the stored tree's hashes do not recompute.
pub const INVALID_STRUCTURE_REASON: &str = "Invalid Merkle graph structure";
/// Failure reason reported when any attached signature fails verification.
pub const INVALID_SIGNATURE_REASON: &str = "Invalid signature";

pub struct MerkleVerificationService {
    repository: Arc<dyn MerkleGraphRepository>,
    store: Arc<dyn ContentAddressableStore>,
    crypto: Arc<dyn CryptographicService>,
    publisher: Arc<dyn EventPublisher>,
    timeout: Option<Duration>,
}

impl MerkleVerificationService {
    pub fn new(
        repository: Arc<dyn MerkleGraphRepository>,
        store: Arc<dyn ContentAddressableStore>,
        crypto: Arc<dyn CryptographicService>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            store,
            crypto,
            publisher,
            timeout: None,
        }
    }

    /// Bound repository, store, and crypto calls by a timeout.
    ///
    /// An elapsed timeout is an indeterminate [`VerifyError::Timeout`],
    /// never a `false` verification result.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Verify an artifact's structure and all attached signatures.
    ///
    /// A graph with zero signatures verifies on structure alone. One
    /// invalid signature fails the whole artifact — no partial trust.
    #[instrument(skip(self))]
    pub async fn verify_artifact(&self, artifact_id: &str) -> Result<bool, VerifyError> {
        let graph = self.lookup(artifact_id).await?;
        let root_hash = graph.root_hash().clone();

        let structural = self
            .bounded(
                "structural verification",
                self.repository.verify_graph_structure(artifact_id),
            )
            .await??;
        if !structural {
            self.emit(VerificationEvent::VerificationFailed(
                MerkleVerificationFailedEvent {
                    artifact_id: artifact_id.to_string(),
                    root_hash,
                    reason: INVALID_STRUCTURE_REASON.to_string(),
                },
            ));
            return Ok(false);
        }

        let mut verified_signatures = Vec::with_capacity(graph.signatures.len());
        for signature in &graph.signatures {
            let valid = self
                .bounded(
                    "signature verification",
                    self.crypto.verify(signature, &root_hash, None),
                )
                .await??;
            if !valid {
                self.emit(VerificationEvent::VerificationFailed(
                    MerkleVerificationFailedEvent {
                        artifact_id: artifact_id.to_string(),
                        root_hash,
                        reason: INVALID_SIGNATURE_REASON.to_string(),
                    },
                ));
                return Ok(false);
            }
            verified_signatures.push(signature.key_id.clone());
        }

        debug!(signatures = verified_signatures.len(), "Artifact verified");
        self.emit(VerificationEvent::GraphVerified(MerkleGraphVerifiedEvent {
            artifact_id: artifact_id.to_string(),
            root_hash,
            verified_signatures,
        }));
        Ok(true)
    }

    /// Verify that the stored bytes for one node still match its
    /// declared hash.
    ///
    /// The store is addressed by hash, but nothing prevents a backend
    /// bug, disk corruption, or a hostile backend from returning other
    /// bytes. The recomputation here is the last line of defense and is
    /// never skipped because the store reported "found".
    #[instrument(skip(self))]
    pub async fn verify_artifact_content(
        &self,
        artifact_id: &str,
        path: &str,
    ) -> Result<bool, VerifyError> {
        let graph = self.lookup(artifact_id).await?;
        let node = graph
            .find_node(path)
            .ok_or_else(|| VerifyError::PathNotFound {
                artifact_id: artifact_id.to_string(),
                path: path.to_string(),
            })?;
        let expected = node.content_hash().clone();

        let bytes = self
            .bounded("content retrieval", self.store.retrieve(&expected))
            .await??;
        let actual = ContentHash::of_bytes(expected.algorithm(), &bytes);

        if actual == expected {
            return Ok(true);
        }

        warn!(path, expected = %expected, actual = %actual, "Content does not match declared hash");
        self.emit(VerificationEvent::TamperingDetected(TamperingDetectedEvent {
            artifact_id: artifact_id.to_string(),
            node_path: path.to_string(),
            expected_hash: expected,
            actual_hash: actual,
        }));
        Ok(false)
    }

    async fn lookup(&self, artifact_id: &str) -> Result<MerkleGraph, VerifyError> {
        self.bounded(
            "graph lookup",
            self.repository.find_by_artifact_id(artifact_id),
        )
        .await??
        .ok_or_else(|| VerifyError::ArtifactNotFound(artifact_id.to_string()))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, VerifyError> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| VerifyError::Timeout { operation }),
            None => Ok(fut.await),
        }
    }

    /// Fire-and-observe: a failed publish is logged, never propagated.
    fn emit(&self, event: VerificationEvent) {
        if let Err(e) = self.publisher.publish(event) {
            warn!(error = %e, "Failed to publish verification event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::FsContentStore;
    use crate::crypto::Ed25519CryptoService;
    use crate::events::EventBus;
    use crate::graph::{DirectoryNode, FileNode, MerkleNode};
    use crate::hash::HashAlgorithm;
    use crate::repository::InMemoryGraphRepository;
    use tempfile::TempDir;

    async fn fixture(temp_dir: &TempDir) -> (MerkleVerificationService, Arc<InMemoryGraphRepository>, Arc<FsContentStore>, Arc<Ed25519CryptoService>, std::sync::mpsc::Receiver<crate::events::EventEnvelope>) {
        let repository = Arc::new(InMemoryGraphRepository::new());
        let store = Arc::new(
            FsContentStore::open(temp_dir.path(), HashAlgorithm::Sha256)
                .await
                .unwrap(),
        );
        let crypto = Arc::new(Ed25519CryptoService::new());
        let (bus, receiver) = EventBus::new_pair();
        let service = MerkleVerificationService::new(
            repository.clone(),
            store.clone(),
            crypto.clone(),
            Arc::new(bus),
        );
        (service, repository, store, crypto, receiver)
    }

    async fn publish_file_graph(
        repository: &InMemoryGraphRepository,
        store: &FsContentStore,
        artifact_id: &str,
        content: &[u8],
    ) -> MerkleGraph {
        let hash = store.store(content).await.unwrap();
        let file =
            MerkleNode::File(FileNode::new("file.txt", hash, content.len() as u64).unwrap());
        let root =
            MerkleNode::Directory(DirectoryNode::root(vec![file], HashAlgorithm::Sha256).unwrap());
        let graph = MerkleGraph::new(artifact_id, root).unwrap();
        repository.save(graph.clone()).await.unwrap();
        graph
    }

    #[tokio::test]
    async fn test_unknown_artifact_is_not_found_and_silent() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _, _, _, receiver) = fixture(&temp_dir).await;

        let result = service.verify_artifact("unknown-id").await;
        assert!(matches!(result, Err(VerifyError::ArtifactNotFound(_))));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsigned_valid_artifact_verifies() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repository, store, _, receiver) = fixture(&temp_dir).await;
        publish_file_graph(&repository, &store, "a", b"bytes").await;

        assert!(service.verify_artifact("a").await.unwrap());
        let envelope = receiver.try_recv().unwrap();
        assert!(matches!(
            envelope.event,
            VerificationEvent::GraphVerified(_)
        ));
    }

    #[tokio::test]
    async fn test_content_verification_matches() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repository, store, _, receiver) = fixture(&temp_dir).await;
        publish_file_graph(&repository, &store, "a", b"bytes").await;

        assert!(service.verify_artifact_content("a", "file.txt").await.unwrap());
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_content_verification_unknown_path() {
        let temp_dir = TempDir::new().unwrap();
        let (service, repository, store, _, _) = fixture(&temp_dir).await;
        publish_file_graph(&repository, &store, "a", b"bytes").await;

        let result = service.verify_artifact_content("a", "missing.txt").await;
        assert!(matches!(result, Err(VerifyError::PathNotFound { .. })));
    }
}
