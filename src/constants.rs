//! Program ids, cluster endpoints and PDA seed tags for the mesh program

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Mesh multisig program deployed on mainnet-beta and devnet
pub const DEFAULT_MULTISIG_PROGRAM_ID: Pubkey =
    pubkey!("SMPLVC8MxZ5Bf5EfF7PaMiTCxoBAcmkbM2vkrvMK8ho");

pub const MAINNET_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";
pub const DEVNET_ENDPOINT: &str = "https://api.devnet.solana.com";
pub const LOCALNET_ENDPOINT: &str = "http://localhost:8899";

/// Seed tags used by the mesh program for every PDA.
///
/// Layout is always `[SEED_PREFIX, parent, index_le?, role_tag]`.
pub mod seeds {
    pub const SEED_PREFIX: &[u8] = b"squad";
    pub const SEED_MULTISIG: &[u8] = b"multisig";
    pub const SEED_TRANSACTION: &[u8] = b"transaction";
    pub const SEED_INSTRUCTION: &[u8] = b"instruction";
    pub const SEED_AUTHORITY: &[u8] = b"authority";
    pub const SEED_IX_AUTHORITY: &[u8] = b"ix_authority";
}
