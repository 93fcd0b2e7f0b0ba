//! Graph builder for ingesting uploaded artifact trees
//!
//! The upload pipeline's front half: walk a staging directory, store
//! every file's bytes in the content-addressable store, and assemble the
//! Merkle tree bottom-up. The resulting root node goes to
//! [`crate::service::MerkleGraphService::create_graph`].

use crate::cas::ContentAddressableStore;
use crate::error::IngestError;
use crate::graph::node::{DirectoryNode, FileNode, MerkleNode};
use crate::graph::path::normalize_node_path;
use crate::graph::walker::{Entry, Walker, WalkerConfig};
use crate::hash::HashAlgorithm;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Summary of one ingest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub file_count: usize,
    pub directory_count: usize,
    pub total_bytes: u64,
}

/// Builds a Merkle tree from a directory on disk.
pub struct GraphBuilder {
    root: PathBuf,
    walker_config: Option<WalkerConfig>,
    algorithm: HashAlgorithm,
}

impl GraphBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            walker_config: None,
            algorithm: HashAlgorithm::default(),
        }
    }

    /// Set walker config (ignore patterns, depth bound, symlink policy).
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = Some(config);
        self
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Walk the staging directory, store file bytes, and assemble the
    /// tree.
    ///
    /// Files are processed first (they have no dependencies), then
    /// directories deepest-first so every directory hash is derived
    /// after all of its children exist.
    #[instrument(skip(self, store), fields(root = %self.root.display()))]
    pub async fn build(
        &self,
        store: &dyn ContentAddressableStore,
    ) -> Result<(MerkleNode, IngestReport), IngestError> {
        let start = Instant::now();
        let canonical_root = dunce::canonicalize(&self.root)
            .map_err(|e| IngestError::InvalidRoot(format!("{}: {e}", self.root.display())))?;

        let walker = match &self.walker_config {
            Some(config) => Walker::with_config(canonical_root.clone(), config.clone()),
            None => Walker::new(canonical_root.clone()),
        };
        let entries = walker.walk()?;

        let mut files = Vec::new();
        let mut directories = Vec::new();
        for entry in entries {
            match entry {
                Entry::File { path, size } => files.push((path, size)),
                Entry::Directory { path } => directories.push(path),
            }
        }

        // children_of maps a directory's relative path ("" for the
        // root) to the nodes assembled under it so far.
        let mut children_of: HashMap<String, Vec<MerkleNode>> = HashMap::new();
        let mut report = IngestReport {
            file_count: files.len(),
            directory_count: directories.len(),
            total_bytes: 0,
        };

        for (file_path, size) in files {
            let rel = relative_node_path(&canonical_root, &file_path)?;
            let content = tokio::fs::read(&file_path).await?;
            report.total_bytes += content.len() as u64;
            let content_hash = store.store(&content).await?;
            debug!(path = %rel, hash = %content_hash, "Ingested file");

            let node = MerkleNode::File(FileNode::new(&rel, content_hash, size)?);
            children_of.entry(parent_of(&rel)).or_default().push(node);
        }

        // Deepest first, so each directory's children are complete
        // before its own hash is derived.
        directories.sort_by_key(|path| std::cmp::Reverse(path.components().count()));
        for dir_path in directories {
            let rel = relative_node_path(&canonical_root, &dir_path)?;
            let children = children_of.remove(&rel).unwrap_or_default();
            let node =
                MerkleNode::Directory(DirectoryNode::new(&rel, children, self.algorithm)?);
            children_of.entry(parent_of(&rel)).or_default().push(node);
        }

        let root_children = children_of.remove("").unwrap_or_default();
        let root = MerkleNode::Directory(DirectoryNode::root(root_children, self.algorithm)?);

        info!(
            files = report.file_count,
            directories = report.directory_count,
            bytes = report.total_bytes,
            root_hash = %root.content_hash(),
            duration_ms = start.elapsed().as_millis(),
            "Ingest completed"
        );
        Ok((root, report))
    }
}

/// Artifact-relative, normalized node path for a filesystem entry.
fn relative_node_path(root: &Path, path: &Path) -> Result<String, IngestError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| IngestError::InvalidRoot(format!("{} escapes the root", path.display())))?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(normalize_node_path(&joined)?)
}

/// Relative path of a node's parent directory; "" means the root.
fn parent_of(rel: &str) -> String {
    match rel.rfind('/') {
        Some(idx) => rel[..idx].to_string(),
        None => String::new(),
    }
}
