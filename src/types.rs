//! Mesh program account layouts and the value objects shared by the builder
//!
//! Account structs mirror the program's Borsh layout field-for-field; they are
//! read-only snapshots from this crate's point of view.

use crate::instructions::sighash;
use crate::tx_builder::errors::TransactionBuilderError;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use thiserror::Error;

/// Which derived signer executes an inner instruction.
///
/// Serialized as a one-byte Borsh variant tag (`Default = 0`, `Custom = 1`).
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorityKind {
    /// `["squad", multisig, index, "authority"]`
    #[default]
    Default,
    /// `["squad", transaction, index, "ix_authority"]`
    Custom,
}

/// Authority metadata attached to one pending inner instruction.
///
/// A `Custom` descriptor always carries both index and bump; the bump is the
/// one the caller derived and is passed through untouched, because it is what
/// the program checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthorityDescriptor {
    index: Option<u32>,
    bump: Option<u8>,
    kind: Option<AuthorityKind>,
}

impl AuthorityDescriptor {
    /// Validating constructor for arbitrary combinations
    pub fn new(
        index: Option<u32>,
        bump: Option<u8>,
        kind: Option<AuthorityKind>,
    ) -> Result<Self, TransactionBuilderError> {
        let descriptor = Self { index, bump, kind };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// No index, no bump, kind left unset (serializes as `Default`)
    pub fn default_authority() -> Self {
        Self::default()
    }

    /// Default authority with an explicit index and bump
    pub fn with_default_kind(index: u32, bump: u8) -> Self {
        Self {
            index: Some(index),
            bump: Some(bump),
            kind: Some(AuthorityKind::Default),
        }
    }

    /// Per-instruction custom authority; see [`crate::address::get_ix_authority_pda`]
    pub fn custom(index: u32, bump: u8) -> Self {
        Self {
            index: Some(index),
            bump: Some(bump),
            kind: Some(AuthorityKind::Custom),
        }
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn bump(&self) -> Option<u8> {
        self.bump
    }

    pub fn kind(&self) -> Option<AuthorityKind> {
        self.kind
    }

    /// Kind as it goes on the wire: unset means `Default`
    pub fn resolved_kind(&self) -> AuthorityKind {
        self.kind.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), TransactionBuilderError> {
        if self.resolved_kind() == AuthorityKind::Custom
            && (self.index.is_none() || self.bump.is_none())
        {
            return Err(TransactionBuilderError::InvalidAuthority(format!(
                "custom authority requires index and bump (index={:?}, bump={:?})",
                self.index, self.bump
            )));
        }
        Ok(())
    }
}

/// An inner instruction waiting to be wrapped by `add_instruction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub instruction: Instruction,
    pub authority: AuthorityDescriptor,
}

impl PendingOperation {
    pub fn new(instruction: Instruction, authority: AuthorityDescriptor) -> Self {
        Self {
            instruction,
            authority,
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&AccountMeta> for MsAccountMeta {
    fn from(meta: &AccountMeta) -> Self {
        Self {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

impl From<&MsAccountMeta> for AccountMeta {
    fn from(meta: &MsAccountMeta) -> Self {
        Self {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

/// Wire form of an inner instruction as accepted by `add_instruction`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct IncomingInstruction {
    pub program_id: Pubkey,
    pub keys: Vec<MsAccountMeta>,
    pub data: Vec<u8>,
}

impl From<&Instruction> for IncomingInstruction {
    fn from(ix: &Instruction) -> Self {
        Self {
            program_id: ix.program_id,
            keys: ix.accounts.iter().map(MsAccountMeta::from).collect(),
            data: ix.data.clone(),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MsTransactionStatus {
    #[default]
    Draft,
    Active,
    ExecuteReady,
    Executed,
    Rejected,
    Cancelled,
}

/// `Ms` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Ms {
    pub threshold: u16,
    pub authority_index: u16,
    /// Number of transactions ever created; only the program increments it.
    pub transaction_index: u32,
    pub ms_change_index: u32,
    pub bump: u8,
    pub create_key: Pubkey,
    pub allow_external_execute: bool,
    pub keys: Vec<Pubkey>,
    pub external_authority: Pubkey,
}

/// `MsTransaction` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct MsTransaction {
    pub creator: Pubkey,
    pub ms: Pubkey,
    pub transaction_index: u32,
    pub authority_index: u32,
    pub authority_bump: u8,
    pub status: MsTransactionStatus,
    /// Number of inner instructions attached so far
    pub instruction_index: u8,
    pub bump: u8,
    pub approved: Vec<Pubkey>,
    pub rejected: Vec<Pubkey>,
    pub cancelled: Vec<Pubkey>,
    pub executed_index: u8,
}

/// `MsInstruction` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct MsInstruction {
    pub program_id: Pubkey,
    pub keys: Vec<MsAccountMeta>,
    pub data: Vec<u8>,
    pub instruction_index: u8,
    pub bump: u8,
    pub authority_type: AuthorityKind,
    pub authority_index: Option<u32>,
    pub authority_bump: Option<u8>,
    pub executed: bool,
}

impl From<&MsInstruction> for Instruction {
    fn from(ix: &MsInstruction) -> Self {
        Instruction {
            program_id: ix.program_id,
            accounts: ix.keys.iter().map(AccountMeta::from).collect(),
            data: ix.data.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountDecodeError {
    #[error("account data too short ({len} bytes)")]
    TooShort { len: usize },

    #[error("discriminator mismatch for {name}: expected {expected:?}, found {found:?}")]
    Discriminator {
        name: &'static str,
        expected: [u8; 8],
        found: [u8; 8],
    },

    #[error("borsh decode failed for {name}: {reason}")]
    Borsh { name: &'static str, reason: String },
}

/// An Anchor account: 8-byte `sha256("account:<NAME>")` prefix + Borsh body
pub trait AnchorAccount: BorshSerialize + BorshDeserialize + Sized {
    const NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        sighash("account", Self::NAME)
    }

    /// Decode raw account data. Trailing allocation padding is ignored.
    fn try_from_account_data(data: &[u8]) -> Result<Self, AccountDecodeError> {
        if data.len() < 8 {
            return Err(AccountDecodeError::TooShort { len: data.len() });
        }
        let mut found = [0u8; 8];
        found.copy_from_slice(&data[..8]);
        let expected = Self::discriminator();
        if found != expected {
            return Err(AccountDecodeError::Discriminator {
                name: Self::NAME,
                expected,
                found,
            });
        }
        let mut body = &data[8..];
        Self::deserialize(&mut body).map_err(|e| AccountDecodeError::Borsh {
            name: Self::NAME,
            reason: e.to_string(),
        })
    }

    /// Inverse of [`AnchorAccount::try_from_account_data`], used by fixtures
    fn to_account_data(&self) -> Vec<u8> {
        let mut data = Self::discriminator().to_vec();
        // writing into a Vec cannot fail
        let _ = borsh::to_writer(&mut data, self);
        data
    }
}

impl AnchorAccount for Ms {
    const NAME: &'static str = "Ms";
}

impl AnchorAccount for MsTransaction {
    const NAME: &'static str = "MsTransaction";
}

impl AnchorAccount for MsInstruction {
    const NAME: &'static str = "MsInstruction";
}

/// Snapshot of a multisig as last fetched, held by a builder.
///
/// Two builders made from the same snapshot predict the same transaction
/// address; refresh via `SquadsMesh::get_multisig` before a new proposal if an
/// earlier one may have landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigRef {
    pub address: Pubkey,
    pub state: Ms,
}

impl MultisigRef {
    pub fn new(address: Pubkey, state: Ms) -> Self {
        Self { address, state }
    }

    pub fn transaction_index(&self) -> u32 {
        self.state.transaction_index
    }

    pub fn threshold(&self) -> u16 {
        self.state.threshold
    }

    pub fn members(&self) -> &[Pubkey] {
        &self.state.keys
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAccount {
    pub address: Pubkey,
    pub state: MsTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionAccount {
    pub address: Pubkey,
    pub state: MsInstruction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_kind_wire_tag() {
        assert_eq!(borsh::to_vec(&AuthorityKind::Default).unwrap(), vec![0]);
        assert_eq!(borsh::to_vec(&AuthorityKind::Custom).unwrap(), vec![1]);
    }

    #[test]
    fn test_descriptor_defaults() {
        let d = AuthorityDescriptor::default_authority();
        assert_eq!(d.index(), None);
        assert_eq!(d.bump(), None);
        assert_eq!(d.kind(), None);
        assert_eq!(d.resolved_kind(), AuthorityKind::Default);
    }

    #[test]
    fn test_custom_descriptor_requires_index_and_bump() {
        let err = AuthorityDescriptor::new(Some(1), None, Some(AuthorityKind::Custom)).unwrap_err();
        assert!(matches!(err, TransactionBuilderError::InvalidAuthority(_)));
        assert!(AuthorityDescriptor::new(None, None, Some(AuthorityKind::Custom)).is_err());

        let ok = AuthorityDescriptor::new(Some(1), Some(254), Some(AuthorityKind::Custom)).unwrap();
        assert_eq!(ok, AuthorityDescriptor::custom(1, 254));
    }

    #[test]
    fn test_default_descriptor_allows_missing_fields() {
        assert!(AuthorityDescriptor::new(None, None, Some(AuthorityKind::Default)).is_ok());
        assert!(AuthorityDescriptor::new(Some(2), None, None).is_ok());
    }

    #[test]
    fn test_ms_account_round_trip_with_padding() {
        let ms = Ms {
            threshold: 2,
            authority_index: 1,
            transaction_index: 5,
            keys: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            ..Default::default()
        };
        let mut data = ms.to_account_data();
        // program accounts are allocated larger than their content
        data.extend_from_slice(&[0u8; 64]);
        assert_eq!(Ms::try_from_account_data(&data).unwrap(), ms);
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let data = MsTransaction::default().to_account_data();
        let err = Ms::try_from_account_data(&data).unwrap_err();
        assert!(matches!(err, AccountDecodeError::Discriminator { name: "Ms", .. }));
        assert!(matches!(
            Ms::try_from_account_data(&[1, 2, 3]),
            Err(AccountDecodeError::TooShort { len: 3 })
        ));
    }

    #[test]
    fn test_incoming_instruction_from_instruction() {
        let program_id = Pubkey::new_unique();
        let signer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            program_id,
            &[9, 8, 7],
            vec![AccountMeta::new(signer, true), AccountMeta::new_readonly(program_id, false)],
        );
        let incoming = IncomingInstruction::from(&ix);
        assert_eq!(incoming.program_id, program_id);
        assert_eq!(incoming.data, vec![9, 8, 7]);
        assert!(incoming.keys[0].is_signer && incoming.keys[0].is_writable);
        assert!(!incoming.keys[1].is_signer && !incoming.keys[1].is_writable);
    }
}
