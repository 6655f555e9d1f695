//! Deterministic PDA derivation for the mesh program
//!
//! Every mesh account lives at a program-derived address built from the
//! seed list `["squad", parent, index_le, role_tag]`. The index segment is
//! fixed-width and little-endian, and its width depends on the role:
//!
//! | Role            | Parent      | Index width |
//! |-----------------|-------------|-------------|
//! | multisig        | create key  | none        |
//! | transaction     | multisig    | 4 bytes     |
//! | instruction     | transaction | 1 byte      |
//! | authority       | multisig    | 4 bytes     |
//! | ix_authority    | transaction | 4 bytes     |
//!
//! The program re-derives these addresses on chain, so a wrong width does not
//! fail there; it silently produces a different account. Indices are
//! therefore range-checked here and rejected with [`AddressError::Encoding`].

use crate::constants::seeds::{
    SEED_AUTHORITY, SEED_INSTRUCTION, SEED_IX_AUTHORITY, SEED_MULTISIG, SEED_PREFIX,
    SEED_TRANSACTION,
};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use thiserror::Error;

/// The kind of account an address is derived for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRole {
    Multisig,
    Transaction,
    Instruction,
    Authority,
    IxAuthority,
}

impl AddressRole {
    /// Closing seed tag for this role
    pub fn seed_tag(self) -> &'static [u8] {
        match self {
            Self::Multisig => SEED_MULTISIG,
            Self::Transaction => SEED_TRANSACTION,
            Self::Instruction => SEED_INSTRUCTION,
            Self::Authority => SEED_AUTHORITY,
            Self::IxAuthority => SEED_IX_AUTHORITY,
        }
    }

    /// Width in bytes of the index segment, `None` when the role has no index
    pub fn index_width(self) -> Option<usize> {
        match self {
            Self::Multisig => None,
            // mirrors the u8 instruction_index field of MsInstruction
            Self::Instruction => Some(1),
            Self::Transaction | Self::Authority | Self::IxAuthority => Some(4),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Multisig => "multisig",
            Self::Transaction => "transaction",
            Self::Instruction => "instruction",
            Self::Authority => "authority",
            Self::IxAuthority => "ix_authority",
        }
    }
}

impl fmt::Display for AddressRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building PDA seeds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The index cannot be represented in the role's fixed-width seed
    #[error("index {index} does not fit the {width}-byte {role} seed")]
    Encoding {
        role: AddressRole,
        index: u64,
        width: usize,
    },
}

impl AddressError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
        }
    }
}

/// Encode `index` little-endian in the fixed width declared for `role`
pub fn encode_index(role: AddressRole, index: u64) -> Result<Vec<u8>, AddressError> {
    let overflow = |width| AddressError::Encoding { role, index, width };
    match role.index_width() {
        Some(1) => u8::try_from(index)
            .map(|v| vec![v])
            .map_err(|_| overflow(1)),
        Some(4) => u32::try_from(index)
            .map(|v| v.to_le_bytes().to_vec())
            .map_err(|_| overflow(4)),
        // roles without an index segment accept nothing but zero
        _ => Err(overflow(0)),
    }
}

/// Ordered seed segments for a PDA of `role` under `parent`.
///
/// `index` is ignored for [`AddressRole::Multisig`].
pub fn seed_segments(
    role: AddressRole,
    parent: &Pubkey,
    index: u64,
) -> Result<Vec<Vec<u8>>, AddressError> {
    let mut segments = Vec::with_capacity(4);
    segments.push(SEED_PREFIX.to_vec());
    segments.push(parent.to_bytes().to_vec());
    if role.index_width().is_some() {
        segments.push(encode_index(role, index)?);
    }
    segments.push(role.seed_tag().to_vec());
    Ok(segments)
}

/// Derive `(address, bump)` for `role` under `parent`
pub fn derive_address(
    role: AddressRole,
    parent: &Pubkey,
    index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), AddressError> {
    let segments = seed_segments(role, parent, index)?;
    let seeds: Vec<&[u8]> = segments.iter().map(Vec::as_slice).collect();
    Ok(Pubkey::find_program_address(&seeds, program_id))
}

/// Multisig PDA seeded by its create key. Total: never fails.
pub fn get_ms_pda(create_key: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_PREFIX, create_key.as_ref(), SEED_MULTISIG],
        program_id,
    )
}

/// Transaction PDA for the `transaction_index`-th transaction of a multisig
pub fn get_tx_pda(
    multisig: &Pubkey,
    transaction_index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), AddressError> {
    derive_address(AddressRole::Transaction, multisig, transaction_index, program_id)
}

/// Inner-instruction PDA at 1-based position `instruction_index` of a transaction
pub fn get_ix_pda(
    transaction: &Pubkey,
    instruction_index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), AddressError> {
    derive_address(AddressRole::Instruction, transaction, instruction_index, program_id)
}

/// Default authority (vault) PDA of a multisig
pub fn get_authority_pda(
    multisig: &Pubkey,
    authority_index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), AddressError> {
    derive_address(AddressRole::Authority, multisig, authority_index, program_id)
}

/// Per-instruction custom authority PDA, keyed by the transaction
pub fn get_ix_authority_pda(
    transaction: &Pubkey,
    authority_index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), AddressError> {
    derive_address(AddressRole::IxAuthority, transaction, authority_index, program_id)
}
