//! Integration tests for content tamper detection
//!
//! The store is addressed by hash, but nothing prevents a backend bug,
//! disk corruption, or a hostile backend from returning bytes that do
//! not match the requested key. These tests pin down that
//! `verify_artifact_content` recomputes independently and never trusts
//! the store's own "found" status.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use veritree::cas::{ContentAddressableStore, FsContentStore};
use veritree::crypto::Ed25519CryptoService;
use veritree::error::{StorageError, VerifyError};
use veritree::events::{EventBus, EventEnvelope, VerificationEvent};
use veritree::graph::{DirectoryNode, FileNode, MerkleNode};
use veritree::hash::{ContentHash, HashAlgorithm};
use veritree::repository::{InMemoryGraphRepository, MerkleGraphRepository};
use veritree::service::MerkleVerificationService;

/// A store that reports "found" for every hash but returns whatever
/// bytes it was configured with — a stand-in for a hostile or corrupted
/// backend.
struct LyingStore {
    algorithm: HashAlgorithm,
    served: Vec<u8>,
}

#[async_trait]
impl ContentAddressableStore for LyingStore {
    fn calculate_hash(&self, bytes: &[u8]) -> ContentHash {
        ContentHash::of_bytes(self.algorithm, bytes)
    }
    async fn store(&self, bytes: &[u8]) -> Result<ContentHash, StorageError> {
        Ok(self.calculate_hash(bytes))
    }
    async fn retrieve(&self, _hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        Ok(self.served.clone())
    }
    async fn exists(&self, _hash: &ContentHash) -> bool {
        true
    }
    async fn delete(&self, _hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(true)
    }
}

async fn publish_single_file_graph(
    repository: &InMemoryGraphRepository,
    content: &[u8],
) -> ContentHash {
    let hash = ContentHash::of_bytes(HashAlgorithm::Sha256, content);
    let file = MerkleNode::File(FileNode::new("file.txt", hash.clone(), content.len() as u64).unwrap());
    let root = MerkleNode::Directory(
        DirectoryNode::root(vec![file], HashAlgorithm::Sha256).unwrap(),
    );
    let graph = veritree::graph::MerkleGraph::new("artifact", root).unwrap();
    repository.save(graph).await.unwrap();
    hash
}

fn verifier_over(
    repository: Arc<InMemoryGraphRepository>,
    store: Arc<dyn ContentAddressableStore>,
) -> (MerkleVerificationService, std::sync::mpsc::Receiver<EventEnvelope>) {
    let (bus, events) = EventBus::new_pair();
    let service = MerkleVerificationService::new(
        repository,
        store,
        Arc::new(Ed25519CryptoService::new()),
        Arc::new(bus),
    );
    (service, events)
}

/// Store returns exactly the bytes matching the declared hash
#[tokio::test]
async fn test_matching_content_verifies() {
    let temp_dir = TempDir::new().unwrap();
    let repository = Arc::new(InMemoryGraphRepository::new());
    let store = Arc::new(
        FsContentStore::open(temp_dir.path(), HashAlgorithm::Sha256)
            .await
            .unwrap(),
    );

    store.store(b"original content").await.unwrap();
    publish_single_file_graph(&repository, b"original content").await;

    let (verifier, events) = verifier_over(repository, store);
    assert!(verifier
        .verify_artifact_content("artifact", "file.txt")
        .await
        .unwrap());
    assert!(events.try_recv().is_err());
}

/// Store reports "found" but serves different bytes: tampering detected
#[tokio::test]
async fn test_substituted_content_detected() {
    let repository = Arc::new(InMemoryGraphRepository::new());
    let declared = publish_single_file_graph(&repository, b"original content").await;

    let store = Arc::new(LyingStore {
        algorithm: HashAlgorithm::Sha256,
        served: b"modified content".to_vec(),
    });

    let (verifier, events) = verifier_over(repository, store);
    assert!(!verifier
        .verify_artifact_content("artifact", "file.txt")
        .await
        .unwrap());

    let envelope = events.try_recv().unwrap();
    match envelope.event {
        VerificationEvent::TamperingDetected(e) => {
            assert_eq!(e.artifact_id, "artifact");
            assert_eq!(e.node_path, "file.txt");
            assert_eq!(e.expected_hash, declared);
            assert_eq!(
                e.actual_hash,
                ContentHash::of_bytes(HashAlgorithm::Sha256, b"modified content")
            );
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

/// On-disk bit-rot under the real filesystem store is caught
#[tokio::test]
async fn test_bit_rot_on_disk_detected() {
    let temp_dir = TempDir::new().unwrap();
    let repository = Arc::new(InMemoryGraphRepository::new());
    let store = Arc::new(
        FsContentStore::open(temp_dir.path(), HashAlgorithm::Sha256)
            .await
            .unwrap(),
    );

    let hash = store.store(b"pristine bytes").await.unwrap();
    publish_single_file_graph(&repository, b"pristine bytes").await;

    // Flip the stored object behind the store's back.
    let hex = hash.value();
    let object_path = temp_dir
        .path()
        .join("objects")
        .join(&hex[0..2])
        .join(&hex[2..4])
        .join(hex);
    std::fs::write(&object_path, b"rotted  bytes!").unwrap();

    let (verifier, events) = verifier_over(repository, store);
    assert!(!verifier
        .verify_artifact_content("artifact", "file.txt")
        .await
        .unwrap());
    let envelope = events.try_recv().unwrap();
    assert!(matches!(
        envelope.event,
        VerificationEvent::TamperingDetected(_)
    ));
}

/// A path absent from the tree is NotFound, distinct from tampering
#[tokio::test]
async fn test_missing_path_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let repository = Arc::new(InMemoryGraphRepository::new());
    let store = Arc::new(
        FsContentStore::open(temp_dir.path(), HashAlgorithm::Sha256)
            .await
            .unwrap(),
    );
    store.store(b"content").await.unwrap();
    publish_single_file_graph(&repository, b"content").await;

    let (verifier, events) = verifier_over(repository, store);
    let result = verifier.verify_artifact_content("artifact", "no-such-file").await;
    assert!(matches!(result, Err(VerifyError::PathNotFound { .. })));
    assert!(events.try_recv().is_err());
}

/// A blob missing from the store is an indeterminate storage fault,
/// not a tamper verdict
#[tokio::test]
async fn test_missing_blob_is_indeterminate() {
    let temp_dir = TempDir::new().unwrap();
    let repository = Arc::new(InMemoryGraphRepository::new());
    let store = Arc::new(
        FsContentStore::open(temp_dir.path(), HashAlgorithm::Sha256)
            .await
            .unwrap(),
    );
    // Graph declares the hash, but the bytes were never stored.
    publish_single_file_graph(&repository, b"content").await;

    let (verifier, events) = verifier_over(repository, store);
    let result = verifier.verify_artifact_content("artifact", "file.txt").await;
    assert!(matches!(
        result,
        Err(VerifyError::Storage(StorageError::NotFound(_)))
    ));
    assert!(events.try_recv().is_err());
}

/// Tamper detection in a nested tree reports the tampered node's path
#[tokio::test]
async fn test_nested_node_path_reported() {
    let repository = Arc::new(InMemoryGraphRepository::new());

    let content_hash = ContentHash::of_bytes(HashAlgorithm::Sha256, b"inner bytes");
    let file = MerkleNode::File(
        FileNode::new("lib/inner.jar", content_hash, 11).unwrap(),
    );
    let lib = MerkleNode::Directory(
        DirectoryNode::new("lib", vec![file], HashAlgorithm::Sha256).unwrap(),
    );
    let root = MerkleNode::Directory(
        DirectoryNode::root(vec![lib], HashAlgorithm::Sha256).unwrap(),
    );
    let graph = veritree::graph::MerkleGraph::new("nested", root).unwrap();
    repository.save(graph).await.unwrap();

    let store = Arc::new(LyingStore {
        algorithm: HashAlgorithm::Sha256,
        served: b"swapped bytes".to_vec(),
    });
    let (verifier, events) = verifier_over(repository, store);

    assert!(!verifier
        .verify_artifact_content("nested", "lib/inner.jar")
        .await
        .unwrap());
    let envelope = events.try_recv().unwrap();
    match envelope.event {
        VerificationEvent::TamperingDetected(e) => {
            assert_eq!(e.node_path, "lib/inner.jar");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
