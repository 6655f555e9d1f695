//! Configuration for the mesh client
//!
//! Loaded from a TOML file; every field has a default so an empty file is a
//! valid mainnet configuration.
//!
//! ```toml
//! cluster = "devnet"
//! commitment = "finalized"
//! keypair_path = "~/.config/solana/id.json"
//! timeout_secs = 60
//! ```

use crate::constants::{
    DEFAULT_MULTISIG_PROGRAM_ID, DEVNET_ENDPOINT, LOCALNET_ENDPOINT, MAINNET_ENDPOINT,
};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    #[default]
    Mainnet,
    Devnet,
    Localnet,
    /// Only `rpc_url`; no built-in endpoint
    Custom,
}

impl Cluster {
    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            Cluster::Mainnet => Some(MAINNET_ENDPOINT),
            Cluster::Devnet => Some(DEVNET_ENDPOINT),
            Cluster::Localnet => Some(LOCALNET_ENDPOINT),
            Cluster::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub cluster: Cluster,

    /// Explicit endpoint; overrides the cluster's
    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default)]
    pub commitment: Commitment,

    /// Base58 mesh program id; the public deployment when unset
    #[serde(default)]
    pub program_id: Option<String>,

    /// Wallet file (JSON array of 64 bytes, or the raw 64 bytes)
    #[serde(default)]
    pub keypair_path: Option<String>,

    /// RPC request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::default(),
            rpc_url: None,
            commitment: Commitment::default(),
            program_id: None,
            keypair_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MeshConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Io(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse TOML: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;
        self.program_id()?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved RPC endpoint: `rpc_url` if set, else the cluster default
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let url = match (&self.rpc_url, self.cluster.default_endpoint()) {
            (Some(url), _) => url.trim().to_string(),
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(ConfigError::Validation(
                    "cluster \"custom\" requires rpc_url".to_string(),
                ))
            }
        };
        if url.is_empty() {
            return Err(ConfigError::Validation("rpc_url is empty".to_string()));
        }
        Ok(url)
    }

    pub fn program_id(&self) -> Result<Pubkey, ConfigError> {
        match &self.program_id {
            None => Ok(DEFAULT_MULTISIG_PROGRAM_ID),
            Some(raw) => Pubkey::from_str(raw.trim()).map_err(|e| {
                ConfigError::Validation(format!("Invalid program_id {:?}: {}", raw, e))
            }),
        }
    }

    pub fn commitment_config(&self) -> CommitmentConfig {
        self.commitment.into()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_is_mainnet() {
        let config = MeshConfig::from_toml_str("").unwrap();
        assert_eq!(config, MeshConfig::default());
        assert_eq!(config.endpoint().unwrap(), MAINNET_ENDPOINT);
        assert_eq!(config.program_id().unwrap(), DEFAULT_MULTISIG_PROGRAM_ID);
        assert_eq!(config.commitment_config(), CommitmentConfig::confirmed());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rpc_url_overrides_cluster() {
        let config = MeshConfig::from_toml_str(
            r#"
            cluster = "devnet"
            rpc_url = "http://127.0.0.1:9999"
            commitment = "finalized"
            "#,
        )
        .unwrap();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.endpoint().unwrap(), "http://127.0.0.1:9999");
        assert_eq!(config.commitment_config(), CommitmentConfig::finalized());
    }

    #[test]
    fn test_custom_cluster_requires_url() {
        let config = MeshConfig::from_toml_str(r#"cluster = "custom""#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_program_id_rejected() {
        let config = MeshConfig {
            program_id: Some("not-a-key".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.program_id(), Err(ConfigError::Validation(_))));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_rpc_url_rejected() {
        let config = MeshConfig {
            rpc_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_cluster_is_parse_error() {
        let err = MeshConfig::from_toml_str(r#"cluster = "testnet-9""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cluster = \"localnet\"").unwrap();
        writeln!(file, "timeout_secs = 5").unwrap();

        let config = MeshConfig::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint().unwrap(), LOCALNET_ENDPOINT);
        assert_eq!(config.timeout_secs, 5);

        let missing = MeshConfig::from_file("/nonexistent/mesh.toml");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
