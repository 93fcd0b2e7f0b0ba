//! Directory hash derivation and structural verification
//!
//! A directory's hash is the hash of the canonical encoding of its
//! children: `(path, digest)` pairs sorted by path ascending (byte-wise,
//! independent of insertion order), each written as `path NUL hex LF`.
//! Neither delimiter can appear in a validated node path, so the
//! encoding is injective.

use crate::graph::node::MerkleNode;
use crate::hash::{ContentHash, HashAlgorithm};

/// Canonical byte encoding of a child list.
///
/// Sorting happens here, not at the call site, so the digest never
/// depends on the order children were appended.
pub fn canonical_encoding(children: &[MerkleNode]) -> Vec<u8> {
    let mut pairs: Vec<(&str, &str)> = children
        .iter()
        .map(|child| (child.path(), child.content_hash().value()))
        .collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let mut encoding = Vec::new();
    for (path, digest) in pairs {
        encoding.extend_from_slice(path.as_bytes());
        encoding.push(0);
        encoding.extend_from_slice(digest.as_bytes());
        encoding.push(b'\n');
    }
    encoding
}

/// Derive a directory's hash from its children.
pub fn compute_directory_hash(
    children: &[MerkleNode],
    algorithm: HashAlgorithm,
) -> ContentHash {
    ContentHash::of_bytes(algorithm, &canonical_encoding(children))
}

/// Recompute every directory hash bottom-up and compare to the stored
/// hashes.
///
/// Returns `true` iff each directory node's stored hash equals its
/// recomputed hash, recursively, root included. File leaves are
/// authoritative at this level; whether their bytes still match is the
/// content-verification path's concern.
pub fn verify_structure(node: &MerkleNode) -> bool {
    match node {
        MerkleNode::File(_) => true,
        MerkleNode::Directory(dir) => {
            let expected = compute_directory_hash(&dir.children, dir.content_hash.algorithm());
            if expected != dir.content_hash {
                return false;
            }
            dir.children.iter().all(verify_structure)
        }
    }
}
