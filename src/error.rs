//! Error types for the veritree integrity core.
//!
//! Validation outcomes (structural mismatch, invalid signature, tampered
//! content) are not errors — they surface as `Ok(false)` plus a domain
//! event. These enums cover everything else: malformed inputs and
//! indeterminate infrastructure faults, kept distinct per layer so
//! callers can tell "proven invalid" from "could not determine."

use crate::hash::ContentHash;
use thiserror::Error;

/// Digest construction and parsing errors
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Digest value is blank")]
    BlankDigest,

    #[error("Digest is not lowercase hex: {0}")]
    InvalidHex(String),

    #[error("Digest length {actual} does not match {algorithm} (expected {expected})")]
    WrongLength {
        algorithm: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Content-addressable store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(ContentHash),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },

    #[error("Invalid digest: {0}")]
    Hash(#[from] HashError),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Merkle model invariant violations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Node path is empty")]
    EmptyPath,

    #[error("Invalid node path: {0}")]
    InvalidPath(String),

    #[error("Duplicate child path among siblings: {0}")]
    DuplicateChild(String),

    #[error("Blank artifact id")]
    BlankArtifactId,

    #[error("Invalid digest: {0}")]
    Hash(#[from] HashError),
}

/// Graph repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Graph not found for artifact: {0}")]
    GraphNotFound(String),

    #[error("Graph already exists for artifact: {0}")]
    DuplicateArtifact(String),

    #[error("Signature is over {signed}, graph root is {root}")]
    SignatureRootMismatch {
        signed: ContentHash,
        root: ContentHash,
    },

    #[error("Graph serialization failed: {0}")]
    Serialization(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// Cryptographic service errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Unknown key id: {0}")]
    UnknownKeyId(String),

    #[error("Malformed key material: {0}")]
    MalformedKey(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Crypto backend error: {0}")]
    Backend(String),
}

/// Verification service errors
///
/// All variants are indeterminate outcomes: the artifact could not be
/// checked. A determinate "invalid" is reported as `Ok(false)`.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("No graph found for artifact: {0}")]
    ArtifactNotFound(String),

    #[error("Path {path} not found in artifact {artifact_id}")]
    PathNotFound { artifact_id: String, path: String },

    #[error("Storage fault: {0}")]
    Storage(#[from] StorageError),

    #[error("Repository fault: {0}")]
    Repository(RepositoryError),

    #[error("Crypto fault: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Timed out during {operation}")]
    Timeout { operation: &'static str },
}

impl From<RepositoryError> for VerifyError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::GraphNotFound(artifact_id) => {
                VerifyError::ArtifactNotFound(artifact_id)
            }
            other => VerifyError::Repository(other),
        }
    }
}

/// Graph ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid ingest root: {0}")]
    InvalidRoot(String),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Storage fault: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Graph service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}
