//! Wallet loading for the RPC transport

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Payer identity used by the RPC transport to sign submissions
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    /// Load a keypair file: a JSON array of 64 bytes (solana CLI format) or
    /// the raw 64 bytes. A leading `~/` resolves against `$HOME`.
    pub fn from_file(path: &str) -> Result<Self> {
        let resolved = expand_home(path);
        let keypair_bytes = std::fs::read(&resolved)
            .with_context(|| format!("Failed to read keypair file: {}", resolved.display()))?;
        let keypair = keypair_from_bytes(&keypair_bytes)?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Fresh random keypair, for read-only sessions that never submit
    pub fn ephemeral() -> Self {
        Self::from_keypair(Keypair::new())
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("pubkey", &self.pubkey()).finish()
    }
}

fn keypair_from_bytes(keypair_bytes: &[u8]) -> Result<Keypair> {
    let raw: Vec<u8> = if keypair_bytes.len() == 64 {
        keypair_bytes.to_vec()
    } else {
        serde_json::from_slice(keypair_bytes).context("Failed to parse keypair JSON")?
    };
    if raw.len() != 64 {
        anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", raw.len());
    }
    if raw.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(raw.as_slice()).context("Invalid keypair bytes")
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_json_keypair() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let wallet = Wallet::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_load_raw_keypair() {
        let keypair = Keypair::new();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&keypair.to_bytes()).unwrap();

        let wallet = Wallet::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_reject_zero_and_short_keys() {
        assert!(keypair_from_bytes(&[0u8; 64]).is_err());
        assert!(keypair_from_bytes(b"[1,2,3]").is_err());
        assert!(keypair_from_bytes(b"not json").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Wallet::from_file("/nonexistent/id.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read keypair file"));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/tmp/id.json"), PathBuf::from("/tmp/id.json"));
        assert_eq!(expand_home("id.json"), PathBuf::from("id.json"));
    }
}
