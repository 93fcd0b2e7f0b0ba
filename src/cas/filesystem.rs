//! Filesystem-backed content store
//!
//! Objects live at paths derived from their hash:
//! `{root}/objects/{hex[0..2]}/{hex[2..4]}/{hex}`
//!
//! This structure:
//! - Enables content-addressed lookup without an index
//! - Bounds directory fan-out (256 entries per shard level)
//! - Supports deduplication (same hash = same path)
//!
//! Writes go to a temp file first and are atomically renamed into place,
//! so no partial object is ever visible under a final hash path.
//! Concurrent writers of the same hash race harmlessly: whichever rename
//! lands last installs byte-identical content.

use crate::cas::ContentAddressableStore;
use crate::error::StorageError;
use crate::hash::{ContentHash, HashAlgorithm};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, instrument, trace};

/// Content-addressed blob store on the local filesystem.
pub struct FsContentStore {
    root: PathBuf,
    algorithm: HashAlgorithm,
    temp_counter: AtomicU64,
}

impl FsContentStore {
    /// Open (or create) a store rooted at the given directory.
    pub async fn open<P: AsRef<Path>>(
        root: P,
        algorithm: HashAlgorithm,
    ) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("objects")).await?;
        Ok(Self {
            root,
            algorithm,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    /// Compute the filesystem path for a hash.
    ///
    /// The first two shard levels come from the digest prefix, keeping
    /// each directory's entry count bounded.
    fn object_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.value();
        self.objects_dir()
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex)
    }

    fn temp_path(&self, hash: &ContentHash) -> PathBuf {
        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}.{}.{}.tmp", hash.value(), std::process::id(), seq);
        self.objects_dir().join(name)
    }

    /// Remove now-empty shard directories after a delete.
    ///
    /// Walks from the deleted object's shard upward, stopping at the
    /// first non-empty directory or at the objects root (exclusive).
    async fn prune_shards(&self, object_path: &Path) {
        let objects_dir = self.objects_dir();
        let mut dir = object_path.parent();
        while let Some(current) = dir {
            if current == objects_dir {
                break;
            }
            let empty = match fs::read_dir(current).await {
                Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
                Err(_) => break,
            };
            if !empty {
                break;
            }
            if fs::remove_dir(current).await.is_err() {
                // A concurrent writer may have repopulated the shard.
                break;
            }
            trace!(dir = %current.display(), "Pruned empty shard directory");
            dir = current.parent();
        }
    }
}

#[async_trait]
impl ContentAddressableStore for FsContentStore {
    fn calculate_hash(&self, bytes: &[u8]) -> ContentHash {
        ContentHash::of_bytes(self.algorithm, bytes)
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn store(&self, bytes: &[u8]) -> Result<ContentHash, StorageError> {
        let hash = self.calculate_hash(bytes);
        let object_path = self.object_path(&hash);

        if fs::try_exists(&object_path).await.unwrap_or(false) {
            debug!(hash = %hash, "Object already stored, skipping write");
            return Ok(hash);
        }

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path(&hash);
        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(hash = %hash, path = %object_path.display(), "Stored object");
        Ok(hash)
    }

    async fn retrieve(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let object_path = self.object_path(hash);
        if !fs::try_exists(&object_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(hash.clone()));
        }
        Ok(fs::read(&object_path).await?)
    }

    async fn exists(&self, hash: &ContentHash) -> bool {
        fs::try_exists(self.object_path(hash)).await.unwrap_or(false)
    }

    #[instrument(skip(self), fields(hash = %hash))]
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        let object_path = self.object_path(hash);
        match fs::remove_file(&object_path).await {
            Ok(()) => {
                self.prune_shards(&object_path).await;
                debug!("Deleted object");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}
