//! Cryptographic Service
//!
//! Port for signing and verifying content hashes, plus an Ed25519
//! reference implementation backed by an in-process keyring. The
//! verification service consumes the port only — any signing backend
//! (HSM, KMS, remote signer) can stand in behind it.
//!
//! Outcome split: a signature that parses but fails verification — or
//! was made over a different hash — is *provably invalid* and reported
//! as `Ok(false)`. Missing or malformed key material means the check
//! could not run at all and is reported as `Err`.

use crate::error::CryptoError;
use crate::graph::Signature;
use crate::hash::ContentHash;
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

/// Signature algorithm name used by the reference implementation.
pub const ED25519: &str = "ed25519";

/// Public key material supplied by a caller for verification.
///
/// When absent, implementations resolve the key from the signature's
/// `key_id` (e.g. a trusted-key registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub algorithm: String,
    /// Hex-encoded public key bytes.
    pub public_key: String,
}

/// Port for asymmetric signing and verification over content hashes.
#[async_trait]
pub trait CryptographicService: Send + Sync {
    /// Sign a content hash with the key registered under `key_id`.
    async fn sign(
        &self,
        content_hash: &ContentHash,
        key_id: &str,
    ) -> Result<Signature, CryptoError>;

    /// Verify a signature over a content hash.
    ///
    /// Returns `Ok(false)` for a signature that is provably invalid and
    /// `Err` when verification could not be performed.
    async fn verify(
        &self,
        signature: &Signature,
        content_hash: &ContentHash,
        key_material: Option<&KeyMaterial>,
    ) -> Result<bool, CryptoError>;
}

/// Ed25519 implementation with an in-process keyring.
///
/// Signing keys and trusted verifying keys are both indexed by `key_id`.
/// Signatures are hex-encoded; the signed message is the raw digest
/// bytes of the content hash.
pub struct Ed25519CryptoService {
    signing_keys: RwLock<HashMap<String, SigningKey>>,
    trusted_keys: RwLock<HashMap<String, VerifyingKey>>,
}

impl Ed25519CryptoService {
    pub fn new() -> Self {
        Self {
            signing_keys: RwLock::new(HashMap::new()),
            trusted_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Generate a key pair under `key_id`, returning the public key hex.
    ///
    /// The verifying half is registered as trusted so signatures made
    /// with the new key verify without explicit key material.
    pub fn generate_key(&self, key_id: &str) -> String {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();
        let public_hex = hex::encode(verifying_key.to_bytes());

        self.signing_keys
            .write()
            .insert(key_id.to_string(), signing_key);
        self.trusted_keys
            .write()
            .insert(key_id.to_string(), verifying_key);
        public_hex
    }

    /// Register a trusted verifying key from hex-encoded bytes.
    pub fn register_verifying_key(
        &self,
        key_id: &str,
        public_key_hex: &str,
    ) -> Result<(), CryptoError> {
        let key = parse_verifying_key(public_key_hex)?;
        self.trusted_keys.write().insert(key_id.to_string(), key);
        Ok(())
    }

    fn resolve_verifying_key(
        &self,
        key_id: &str,
        key_material: Option<&KeyMaterial>,
    ) -> Result<VerifyingKey, CryptoError> {
        match key_material {
            Some(material) => {
                if !material.algorithm.eq_ignore_ascii_case(ED25519) {
                    return Err(CryptoError::UnsupportedAlgorithm(
                        material.algorithm.clone(),
                    ));
                }
                parse_verifying_key(&material.public_key)
            }
            None => self
                .trusted_keys
                .read()
                .get(key_id)
                .copied()
                .ok_or_else(|| CryptoError::UnknownKeyId(key_id.to_string())),
        }
    }
}

impl Default for Ed25519CryptoService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ed25519CryptoService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.debug_struct("Ed25519CryptoService")
            .field("signing_keys", &self.signing_keys.read().len())
            .field("trusted_keys", &self.trusted_keys.read().len())
            .finish()
    }
}

fn parse_verifying_key(public_key_hex: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(public_key_hex.trim())
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CryptoError::MalformedKey("public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&arr).map_err(|e| CryptoError::MalformedKey(e.to_string()))
}

#[async_trait]
impl CryptographicService for Ed25519CryptoService {
    async fn sign(
        &self,
        content_hash: &ContentHash,
        key_id: &str,
    ) -> Result<Signature, CryptoError> {
        let keys = self.signing_keys.read();
        let signing_key = keys
            .get(key_id)
            .ok_or_else(|| CryptoError::UnknownKeyId(key_id.to_string()))?;
        let sig = signing_key.sign(&content_hash.to_bytes());
        Ok(Signature {
            value: hex::encode(sig.to_bytes()),
            algorithm: ED25519.to_string(),
            content_hash: content_hash.clone(),
            key_id: key_id.to_string(),
        })
    }

    async fn verify(
        &self,
        signature: &Signature,
        content_hash: &ContentHash,
        key_material: Option<&KeyMaterial>,
    ) -> Result<bool, CryptoError> {
        if !signature.algorithm.eq_ignore_ascii_case(ED25519) {
            return Err(CryptoError::UnsupportedAlgorithm(
                signature.algorithm.clone(),
            ));
        }

        // A signature over some other hash can never endorse this one.
        if &signature.content_hash != content_hash {
            return Ok(false);
        }

        let verifying_key = self.resolve_verifying_key(&signature.key_id, key_material)?;

        let sig_bytes = match hex::decode(&signature.value) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        let sig_arr: [u8; 64] = match sig_bytes.try_into() {
            Ok(arr) => arr,
            Err(_) => return Ok(false),
        };
        let sig = ed25519_dalek::Signature::from_bytes(&sig_arr);

        Ok(verifying_key
            .verify(&content_hash.to_bytes(), &sig)
            .is_ok())
    }
}
