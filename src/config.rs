//! Configuration System
//!
//! TOML-backed configuration for the store, repository, and logging,
//! with defaulted fields and environment variable overrides
//! (`VERITREE_STORE_ROOT`, `VERITREE_HASH_ALGORITHM`,
//! `VERITREE_REPOSITORY_ROOT`).

use crate::error::ConfigError;
use crate::hash::HashAlgorithm;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeritreeConfig {
    /// Content store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Graph repository settings
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Content-addressable store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store root directory
    #[serde(default = "default_store_root")]
    pub root: PathBuf,

    /// Digest algorithm: sha-256 (default) or blake3
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

/// Graph repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Sled database directory
    #[serde(default = "default_repository_root")]
    pub root: PathBuf,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_repository_root() -> PathBuf {
    PathBuf::from("data/graphs")
}

fn default_algorithm() -> String {
    HashAlgorithm::default().as_str().to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
            algorithm: default_algorithm(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: default_repository_root(),
        }
    }
}

impl StoreConfig {
    /// Parse the configured algorithm name.
    pub fn algorithm(&self) -> Result<HashAlgorithm, ConfigError> {
        self.algorithm
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{e}")))
    }
}

impl VeritreeConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: VeritreeConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus env overrides, for installs without a config file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("VERITREE_STORE_ROOT") {
            self.store.root = PathBuf::from(root);
        }
        if let Ok(algorithm) = std::env::var("VERITREE_HASH_ALGORITHM") {
            self.store.algorithm = algorithm;
        }
        if let Ok(root) = std::env::var("VERITREE_REPOSITORY_ROOT") {
            self.repository.root = PathBuf::from(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VeritreeConfig::default();
        assert_eq!(config.store.root, PathBuf::from("data/store"));
        assert_eq!(config.store.algorithm, "sha-256");
        assert_eq!(config.store.algorithm().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(config.repository.root, PathBuf::from("data/graphs"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let raw = r#"
            [store]
            algorithm = "blake3"
        "#;
        let config: VeritreeConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.store.algorithm().unwrap(), HashAlgorithm::Blake3);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.store.root, PathBuf::from("data/store"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_algorithm_rejected() {
        let config = StoreConfig {
            root: PathBuf::from("."),
            algorithm: "md5".to_string(),
        };
        assert!(config.algorithm().is_err());
    }
}
