//! Artifact-relative path normalization utilities
//!
//! Node paths are logical, POSIX-style paths relative to the artifact
//! root ("lib/core.jar", not "/var/data/..."). They participate in the
//! canonical child encoding, so two uploads of the same tree must settle
//! on byte-identical paths.

use crate::error::GraphError;
use unicode_normalization::UnicodeNormalization;

/// Normalize and validate a node path for deterministic hashing
///
/// This function:
/// 1. Normalizes Unicode to NFC
/// 2. Removes trailing slashes
/// 3. Rejects absolute paths, backslashes, `.`/`..` segments, and
///    control bytes that would collide with the canonical encoding
pub fn normalize_node_path(path: &str) -> Result<String, GraphError> {
    let normalized: String = path.nfc().collect();

    let mut result = normalized;
    while result.ends_with('/') {
        result.pop();
    }

    if result.is_empty() {
        return Err(GraphError::EmptyPath);
    }
    if result.starts_with('/') {
        return Err(GraphError::InvalidPath(format!(
            "path must be relative: {}",
            result
        )));
    }
    if result.contains('\\') {
        return Err(GraphError::InvalidPath(format!(
            "path must use '/' separators: {}",
            result
        )));
    }
    if result.contains('\0') || result.contains('\n') {
        return Err(GraphError::InvalidPath(
            "path contains control characters".to_string(),
        ));
    }
    for segment in result.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(GraphError::InvalidPath(format!(
                "path contains empty or dot segment: {}",
                result
            )));
        }
    }

    Ok(result)
}

/// Split a normalized path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
}
