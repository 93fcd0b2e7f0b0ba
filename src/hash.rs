//! Content hashing primitives.
//!
//! `ContentHash` is the leaf value type of the whole crate: an
//! `(algorithm, lowercase-hex digest)` pair with structural equality.
//! Digests are computed with SHA-256 by default; BLAKE3 is available for
//! callers that prefer it. Both produce 256-bit digests, so a hex value
//! is always 64 characters.

use crate::error::HashError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Canonical lowercase name, as stored alongside digests.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha-256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Expected hex digest length for this algorithm.
    pub fn digest_hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Blake3 => 64,
        }
    }

    /// Hash raw bytes, returning the lowercase hex digest.
    pub fn digest_hex(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize().as_bytes())
            }
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha-256" | "sha256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(HashError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest: algorithm plus lowercase hex value.
///
/// Equality is structural. Instances are immutable; they are created by
/// hashing bytes ([`ContentHash::of_bytes`]) or parsed and validated from
/// stored form ([`ContentHash::new`]).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    value: String,
}

impl ContentHash {
    /// Validate and wrap an existing digest value.
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(HashError::BlankDigest);
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(HashError::InvalidHex(value));
        }
        if value.len() != algorithm.digest_hex_len() {
            return Err(HashError::WrongLength {
                algorithm: algorithm.as_str().to_string(),
                expected: algorithm.digest_hex_len(),
                actual: value.len(),
            });
        }
        Ok(Self { algorithm, value })
    }

    /// Hash raw bytes under the given algorithm.
    pub fn of_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: algorithm.digest_hex(bytes),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Lowercase hex digest value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Decode the hex value into raw digest bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Infallible: `new`/`of_bytes` guarantee valid even-length hex.
        hex::decode(&self.value).unwrap_or_default()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}:{}...)", self.algorithm, &self.value[..8])
    }
}

#[derive(Serialize, Deserialize)]
struct ContentHashRepr {
    algorithm: String,
    value: String,
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ContentHashRepr {
            algorithm: self.algorithm.as_str().to_string(),
            value: self.value.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ContentHashRepr::deserialize(deserializer)?;
        let algorithm = repr.algorithm.parse().map_err(serde::de::Error::custom)?;
        ContentHash::new(algorithm, repr.value).map_err(serde::de::Error::custom)
    }
}
