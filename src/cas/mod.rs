//! Content-Addressable Store
//!
//! Durable blob storage keyed by content hash. Storing the same bytes
//! twice yields the same hash and writes nothing new; distinct artifacts
//! referencing identical content share a single stored object. The store
//! holds raw bytes only — artifact semantics (and the events that go
//! with them) live in the services above it.

pub mod filesystem;

pub use filesystem::FsContentStore;

use crate::error::StorageError;
use crate::hash::ContentHash;
use async_trait::async_trait;

/// Port for hash-keyed blob storage.
///
/// Implementations must guarantee that the bytes visible under a hash
/// `h` satisfied `hash(bytes) == h` at write time. They are not required
/// to re-validate on read; read-time mismatches are corruption and are
/// caught by the verification service, which recomputes independently.
#[async_trait]
pub trait ContentAddressableStore: Send + Sync {
    /// Hash bytes under the store's configured algorithm.
    ///
    /// Pure and deterministic; always matches the hash `store` produces
    /// for the same bytes.
    fn calculate_hash(&self, bytes: &[u8]) -> ContentHash;

    /// Store bytes, returning their content hash.
    ///
    /// Idempotent: if an object already exists under the hash, the hash
    /// is returned without rewriting.
    async fn store(&self, bytes: &[u8]) -> Result<ContentHash, StorageError>;

    /// Fetch the bytes stored under a hash.
    async fn retrieve(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError>;

    /// Whether an object exists under the hash.
    async fn exists(&self, hash: &ContentHash) -> bool;

    /// Delete the object under a hash.
    ///
    /// Idempotent: deleting an absent hash succeeds. Returns `true` when
    /// the object is gone afterwards.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
