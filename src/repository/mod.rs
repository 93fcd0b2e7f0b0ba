//! Merkle Graph Repository
//!
//! Persistence port for artifact graphs: save-once semantics per
//! artifact id, signature appends validated against the current root
//! hash, structural re-verification, and lookups by artifact, root hash,
//! or signer. Two implementations ship with the crate: an in-memory
//! reference ([`InMemoryGraphRepository`]) and a sled-backed durable
//! store ([`SledGraphRepository`]).

pub mod memory;
pub mod persistence;

pub use memory::InMemoryGraphRepository;
pub use persistence::SledGraphRepository;

use crate::error::RepositoryError;
use crate::graph::{MerkleGraph, Signature};
use crate::hash::ContentHash;
use async_trait::async_trait;

/// Port for graph persistence.
///
/// Implementations enforce two boundary rules so no caller can skip
/// them: an artifact id maps to at most one graph, and a signature is
/// accepted only when it covers the graph's current root hash.
/// Concurrent `add_signature` calls for one artifact must be serialized
/// (lock or compare-and-swap) so no append is lost.
#[async_trait]
pub trait MerkleGraphRepository: Send + Sync {
    /// Persist a new graph. Fails with [`RepositoryError::DuplicateArtifact`]
    /// if the artifact already has one.
    async fn save(&self, graph: MerkleGraph) -> Result<MerkleGraph, RepositoryError>;

    /// Append a signature to an artifact's graph.
    ///
    /// Rejects signatures whose `content_hash` is not the graph's root
    /// with [`RepositoryError::SignatureRootMismatch`].
    async fn add_signature(
        &self,
        artifact_id: &str,
        signature: Signature,
    ) -> Result<MerkleGraph, RepositoryError>;

    /// Recompute the stored tree's directory hashes bottom-up and
    /// report whether every stored hash matches.
    async fn verify_graph_structure(&self, artifact_id: &str)
        -> Result<bool, RepositoryError>;

    async fn find_by_artifact_id(
        &self,
        artifact_id: &str,
    ) -> Result<Option<MerkleGraph>, RepositoryError>;

    async fn find_by_root_hash(
        &self,
        root_hash: &ContentHash,
    ) -> Result<Option<MerkleGraph>, RepositoryError>;

    /// All graphs carrying a signature from the given key.
    async fn find_by_signature_key_id(
        &self,
        key_id: &str,
    ) -> Result<Vec<MerkleGraph>, RepositoryError>;
}

/// Shared boundary check for signature appends.
pub(crate) fn check_signature_root(
    graph: &MerkleGraph,
    signature: &Signature,
) -> Result<(), RepositoryError> {
    if &signature.content_hash != graph.root_hash() {
        return Err(RepositoryError::SignatureRootMismatch {
            signed: signature.content_hash.clone(),
            root: graph.root_hash().clone(),
        });
    }
    Ok(())
}
