//! Filesystem walker for ingesting upload staging directories

use crate::error::IngestError;
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone)]
pub enum Entry {
    /// A file entry with its path and size
    File { path: PathBuf, size: u64 },
    /// A directory entry with its path
    Directory { path: PathBuf },
}

/// Walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// Entry names to skip (e.g. VCS droppings in a staging directory)
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: vec![".git".to_string(), ".DS_Store".to_string()],
            max_depth: None,
        }
    }
}

/// Recursive walker over an upload staging directory.
///
/// Symlinks and special files are skipped: an artifact's content tree is
/// regular files and directories only.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|name| self.config.ignore_patterns.iter().any(|p| p == name))
            .unwrap_or(false)
    }

    /// Walk the tree, returning files and directories below the root.
    pub fn walk(&self) -> Result<Vec<Entry>, IngestError> {
        let mut walk = WalkDir::new(&self.root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walk = walk.max_depth(depth);
        }

        let mut entries = Vec::new();
        for entry in walk.into_iter().filter_entry(|e| !self.is_ignored(e)) {
            let entry = entry.map_err(|e| IngestError::InvalidRoot(e.to_string()))?;
            if entry.path() == self.root {
                continue;
            }
            if entry.file_type().is_dir() {
                entries.push(Entry::Directory {
                    path: entry.into_path(),
                });
            } else if entry.file_type().is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                entries.push(Entry::File {
                    path: entry.into_path(),
                    size,
                });
            }
        }
        Ok(entries)
    }
}
