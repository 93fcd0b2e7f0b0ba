//! Sled-backed graph repository
//!
//! Durable implementation of the graph port. Graphs are bincode records
//! keyed by artifact id; root-hash and signer lookups go through
//! prefix-keyed secondary index entries in the same tree. Signature
//! appends use a compare-and-swap loop, so concurrent appends for one
//! artifact serialize without a process-wide lock.

use crate::error::RepositoryError;
use crate::graph::{MerkleGraph, Signature};
use crate::hash::ContentHash;
use crate::repository::{check_signature_root, MerkleGraphRepository};
use async_trait::async_trait;
use std::path::Path;

/// Durable implementation of [`MerkleGraphRepository`] on sled.
pub struct SledGraphRepository {
    db: sled::Db,
}

fn backend(e: sled::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<MerkleGraph, RepositoryError> {
    bincode::deserialize(bytes).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn encode(graph: &MerkleGraph) -> Result<Vec<u8>, RepositoryError> {
    bincode::serialize(graph).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn graph_key(artifact_id: &str) -> Vec<u8> {
    let mut key = b"graph:".to_vec();
    key.extend_from_slice(artifact_id.as_bytes());
    key
}

fn root_key(root_hash: &ContentHash) -> Vec<u8> {
    let mut key = b"root:".to_vec();
    key.extend_from_slice(root_hash.algorithm().as_str().as_bytes());
    key.push(b':');
    key.extend_from_slice(root_hash.value().as_bytes());
    key
}

/// Signer index keys use a NUL separator so a key id that is a prefix
/// of another can never alias its entries.
fn signer_prefix(key_id: &str) -> Vec<u8> {
    let mut key = b"signer:".to_vec();
    key.extend_from_slice(key_id.as_bytes());
    key.push(0);
    key
}

fn signer_key(key_id: &str, artifact_id: &str) -> Vec<u8> {
    let mut key = signer_prefix(key_id);
    key.extend_from_slice(artifact_id.as_bytes());
    key
}

impl SledGraphRepository {
    /// Open (or create) a repository at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let db = sled::open(path).map_err(backend)?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), RepositoryError> {
        self.db.flush().map_err(backend)?;
        Ok(())
    }

    fn load(&self, artifact_id: &str) -> Result<Option<MerkleGraph>, RepositoryError> {
        match self.db.get(graph_key(artifact_id)).map_err(backend)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MerkleGraphRepository for SledGraphRepository {
    async fn save(&self, graph: MerkleGraph) -> Result<MerkleGraph, RepositoryError> {
        let key = graph_key(&graph.artifact_id);
        let bytes = encode(&graph)?;

        // Compare-and-swap against absence enforces one graph per
        // artifact even under concurrent publishes.
        let swapped = self
            .db
            .compare_and_swap(&key, None as Option<&[u8]>, Some(bytes))
            .map_err(backend)?;
        if swapped.is_err() {
            return Err(RepositoryError::DuplicateArtifact(graph.artifact_id));
        }

        // First writer wins the root index slot; ties share content.
        let _ = self
            .db
            .compare_and_swap(
                root_key(graph.root_hash()),
                None as Option<&[u8]>,
                Some(graph.artifact_id.as_bytes()),
            )
            .map_err(backend)?;

        for signature in &graph.signatures {
            self.db
                .insert(
                    signer_key(&signature.key_id, &graph.artifact_id),
                    graph.artifact_id.as_bytes(),
                )
                .map_err(backend)?;
        }

        Ok(graph)
    }

    async fn add_signature(
        &self,
        artifact_id: &str,
        signature: Signature,
    ) -> Result<MerkleGraph, RepositoryError> {
        let key = graph_key(artifact_id);
        loop {
            let current = self
                .db
                .get(&key)
                .map_err(backend)?
                .ok_or_else(|| RepositoryError::GraphNotFound(artifact_id.to_string()))?;

            let mut graph = decode(&current)?;
            check_signature_root(&graph, &signature)?;
            graph.signatures.push(signature.clone());
            let updated = encode(&graph)?;

            let swapped = self
                .db
                .compare_and_swap(&key, Some(&current), Some(updated))
                .map_err(backend)?;
            if swapped.is_ok() {
                self.db
                    .insert(
                        signer_key(&signature.key_id, artifact_id),
                        artifact_id.as_bytes(),
                    )
                    .map_err(backend)?;
                return Ok(graph);
            }
            // Lost the race to a concurrent append; reread and retry.
        }
    }

    async fn verify_graph_structure(
        &self,
        artifact_id: &str,
    ) -> Result<bool, RepositoryError> {
        let graph = self
            .load(artifact_id)?
            .ok_or_else(|| RepositoryError::GraphNotFound(artifact_id.to_string()))?;
        Ok(graph.verify_structure())
    }

    async fn find_by_artifact_id(
        &self,
        artifact_id: &str,
    ) -> Result<Option<MerkleGraph>, RepositoryError> {
        self.load(artifact_id)
    }

    async fn find_by_root_hash(
        &self,
        root_hash: &ContentHash,
    ) -> Result<Option<MerkleGraph>, RepositoryError> {
        match self.db.get(root_key(root_hash)).map_err(backend)? {
            Some(id_bytes) => {
                let artifact_id = String::from_utf8_lossy(&id_bytes).to_string();
                self.load(&artifact_id)
            }
            None => Ok(None),
        }
    }

    async fn find_by_signature_key_id(
        &self,
        key_id: &str,
    ) -> Result<Vec<MerkleGraph>, RepositoryError> {
        let mut graphs = Vec::new();
        for item in self.db.scan_prefix(signer_prefix(key_id)) {
            let (_, id_bytes) = item.map_err(backend)?;
            let artifact_id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(graph) = self.load(&artifact_id)? {
                graphs.push(graph);
            }
        }
        graphs.sort_by(|a, b| a.artifact_id.cmp(&b.artifact_id));
        Ok(graphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DirectoryNode, FileNode, MerkleNode};
    use crate::hash::HashAlgorithm;
    use tempfile::TempDir;

    fn sample_graph(artifact_id: &str, content: &[u8]) -> MerkleGraph {
        let hash = ContentHash::of_bytes(HashAlgorithm::Sha256, content);
        let file = MerkleNode::File(FileNode::new("file.txt", hash, content.len() as u64).unwrap());
        let root =
            MerkleNode::Directory(DirectoryNode::root(vec![file], HashAlgorithm::Sha256).unwrap());
        MerkleGraph::new(artifact_id, root).unwrap()
    }

    fn signature_over(hash: &ContentHash, key_id: &str) -> Signature {
        Signature {
            value: "ab".repeat(64),
            algorithm: "ed25519".to_string(),
            content_hash: hash.clone(),
            key_id: key_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let graph = sample_graph("a", b"1");
        {
            let repo = SledGraphRepository::open(temp_dir.path()).unwrap();
            repo.save(graph.clone()).await.unwrap();
            repo.flush().unwrap();
        }

        // Reopen from disk.
        let repo = SledGraphRepository::open(temp_dir.path()).unwrap();
        let found = repo.find_by_artifact_id("a").await.unwrap().unwrap();
        assert_eq!(found, graph);
    }

    #[tokio::test]
    async fn test_duplicate_artifact_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SledGraphRepository::open(temp_dir.path()).unwrap();
        repo.save(sample_graph("a", b"1")).await.unwrap();
        let result = repo.save(sample_graph("a", b"2")).await;
        assert!(matches!(result, Err(RepositoryError::DuplicateArtifact(_))));
    }

    #[tokio::test]
    async fn test_add_signature_and_indexes() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SledGraphRepository::open(temp_dir.path()).unwrap();

        let graph = sample_graph("a", b"1");
        let root_hash = graph.root_hash().clone();
        repo.save(graph).await.unwrap();

        let updated = repo
            .add_signature("a", signature_over(&root_hash, "release-key"))
            .await
            .unwrap();
        assert_eq!(updated.signatures.len(), 1);

        let by_root = repo.find_by_root_hash(&root_hash).await.unwrap().unwrap();
        assert_eq!(by_root.artifact_id, "a");

        let by_signer = repo.find_by_signature_key_id("release-key").await.unwrap();
        assert_eq!(by_signer.len(), 1);
        assert_eq!(by_signer[0].signatures.len(), 1);
    }

    #[tokio::test]
    async fn test_add_signature_rejects_stale_root() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SledGraphRepository::open(temp_dir.path()).unwrap();
        repo.save(sample_graph("a", b"1")).await.unwrap();

        let stale = ContentHash::of_bytes(HashAlgorithm::Sha256, b"stale");
        let result = repo.add_signature("a", signature_over(&stale, "k")).await;
        assert!(matches!(
            result,
            Err(RepositoryError::SignatureRootMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_signer_prefix_does_not_alias() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SledGraphRepository::open(temp_dir.path()).unwrap();

        let graph_a = sample_graph("a", b"1");
        let root_a = graph_a.root_hash().clone();
        repo.save(graph_a).await.unwrap();
        repo.add_signature("a", signature_over(&root_a, "key"))
            .await
            .unwrap();

        let graph_b = sample_graph("b", b"2");
        let root_b = graph_b.root_hash().clone();
        repo.save(graph_b).await.unwrap();
        repo.add_signature("b", signature_over(&root_b, "key-2"))
            .await
            .unwrap();

        // "key" must not pick up "key-2" entries.
        let signed = repo.find_by_signature_key_id("key").await.unwrap();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].artifact_id, "a");
    }

    #[tokio::test]
    async fn test_verify_graph_structure_missing() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SledGraphRepository::open(temp_dir.path()).unwrap();
        let result = repo.verify_graph_structure("ghost").await;
        assert!(matches!(result, Err(RepositoryError::GraphNotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_signature_appends_are_all_kept() {
        use std::sync::Arc;

        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(SledGraphRepository::open(temp_dir.path()).unwrap());
        let graph = sample_graph("a", b"1");
        let root_hash = graph.root_hash().clone();
        repo.save(graph).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = Arc::clone(&repo);
            let root_hash = root_hash.clone();
            handles.push(tokio::spawn(async move {
                repo.add_signature("a", signature_over(&root_hash, &format!("key-{i}")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let graph = repo.find_by_artifact_id("a").await.unwrap().unwrap();
        assert_eq!(graph.signatures.len(), 8);
    }
}
