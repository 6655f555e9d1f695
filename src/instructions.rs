//! Instruction encoders for the mesh multisig program
//!
//! Every instruction is Anchor-encoded: `sha256("global:<name>")[..8]`
//! followed by the Borsh encoding of its arguments. Account order and
//! writable/signer flags follow the program IDL exactly; the program checks
//! both positionally.

use crate::types::{AuthorityDescriptor, AuthorityKind, IncomingInstruction};
use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

/// Instruction names as hashed into discriminators
pub mod names {
    pub const CREATE: &str = "create";
    pub const ADD_MEMBER: &str = "add_member";
    pub const REMOVE_MEMBER: &str = "remove_member";
    pub const REMOVE_MEMBER_AND_CHANGE_THRESHOLD: &str = "remove_member_and_change_threshold";
    pub const ADD_MEMBER_AND_CHANGE_THRESHOLD: &str = "add_member_and_change_threshold";
    pub const CHANGE_THRESHOLD: &str = "change_threshold";
    pub const ADD_AUTHORITY: &str = "add_authority";
    pub const SET_EXTERNAL_EXECUTE: &str = "set_external_execute";
    pub const CREATE_TRANSACTION: &str = "create_transaction";
    pub const ACTIVATE_TRANSACTION: &str = "activate_transaction";
    pub const ADD_INSTRUCTION: &str = "add_instruction";
    pub const APPROVE_TRANSACTION: &str = "approve_transaction";
    pub const REJECT_TRANSACTION: &str = "reject_transaction";
    pub const CANCEL_TRANSACTION: &str = "cancel_transaction";
    pub const EXECUTE_TRANSACTION: &str = "execute_transaction";
    pub const EXECUTE_INSTRUCTION: &str = "execute_instruction";
    pub const CHANGE_EXTERNAL_AUTHORITY: &str = "change_external_authority";
}

/// First 8 bytes of `sha256("<namespace>:<name>")`
pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// Instruction discriminator for `name`
pub fn discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// True if `ix` targets `program_id` and carries the discriminator of `name`
pub fn is_instruction(ix: &Instruction, program_id: &Pubkey, name: &str) -> bool {
    ix.program_id == *program_id && ix.data.len() >= 8 && ix.data[..8] == discriminator(name)
}

fn encode<T: BorshSerialize>(name: &str, args: &T) -> Vec<u8> {
    let mut data = discriminator(name).to_vec();
    // serializing into a Vec is infallible
    let _ = borsh::to_writer(&mut data, args);
    data
}

#[derive(BorshSerialize)]
struct CreateArgs<'a> {
    external_authority: Pubkey,
    threshold: u16,
    create_key: Pubkey,
    members: &'a [Pubkey],
}

#[derive(BorshSerialize)]
struct AddInstructionArgs<'a> {
    incoming_instruction: &'a IncomingInstruction,
    authority_index: Option<u32>,
    authority_bump: Option<u8>,
    authority_type: AuthorityKind,
}

/// Arguments of the multisig `create` instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMultisigParams {
    pub external_authority: Pubkey,
    pub threshold: u16,
    pub create_key: Pubkey,
    pub members: Vec<Pubkey>,
}

pub fn create(
    program_id: &Pubkey,
    multisig: &Pubkey,
    creator: &Pubkey,
    params: &CreateMultisigParams,
) -> Instruction {
    let args = CreateArgs {
        external_authority: params.external_authority,
        threshold: params.threshold,
        create_key: params.create_key,
        members: &params.members,
    };
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*multisig, false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(names::CREATE, &args),
    }
}

/// Accounts shared by the external-authority config instructions
fn external_authority_accounts(
    multisig: &Pubkey,
    external_authority: &Pubkey,
    with_rent: bool,
) -> Vec<AccountMeta> {
    let mut accounts = vec![
        AccountMeta::new(*multisig, false),
        AccountMeta::new(*external_authority, true),
    ];
    if with_rent {
        accounts.push(AccountMeta::new_readonly(sysvar::rent::id(), false));
        accounts.push(AccountMeta::new_readonly(system_program::id(), false));
    }
    accounts
}

pub fn add_member(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    new_member: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, true),
        data: encode(names::ADD_MEMBER, new_member),
    }
}

pub fn remove_member(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    old_member: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, false),
        data: encode(names::REMOVE_MEMBER, old_member),
    }
}

pub fn remove_member_and_change_threshold(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    old_member: &Pubkey,
    new_threshold: u16,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, false),
        data: encode(
            names::REMOVE_MEMBER_AND_CHANGE_THRESHOLD,
            &(*old_member, new_threshold),
        ),
    }
}

pub fn add_member_and_change_threshold(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    new_member: &Pubkey,
    new_threshold: u16,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, true),
        data: encode(
            names::ADD_MEMBER_AND_CHANGE_THRESHOLD,
            &(*new_member, new_threshold),
        ),
    }
}

pub fn change_threshold(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    new_threshold: u16,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, false),
        data: encode(names::CHANGE_THRESHOLD, &new_threshold),
    }
}

pub fn add_authority(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, false),
        data: discriminator(names::ADD_AUTHORITY).to_vec(),
    }
}

pub fn set_external_execute(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    setting: bool,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, false),
        data: encode(names::SET_EXTERNAL_EXECUTE, &setting),
    }
}

pub fn change_external_authority(
    program_id: &Pubkey,
    multisig: &Pubkey,
    external_authority: &Pubkey,
    new_authority: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: external_authority_accounts(multisig, external_authority, false),
        data: encode(names::CHANGE_EXTERNAL_AUTHORITY, new_authority),
    }
}

pub fn create_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    creator: &Pubkey,
    authority_index: u32,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*multisig, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(names::CREATE_TRANSACTION, &authority_index),
    }
}

pub fn activate_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    creator: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*multisig, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: discriminator(names::ACTIVATE_TRANSACTION).to_vec(),
    }
}

/// Wrap `inner` into an `add_instruction` at the given inner-instruction PDA.
///
/// An unset authority kind is sent as `Default`.
pub fn add_instruction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    instruction: &Pubkey,
    creator: &Pubkey,
    inner: &Instruction,
    authority: &AuthorityDescriptor,
) -> Instruction {
    let incoming = IncomingInstruction::from(inner);
    let args = AddInstructionArgs {
        incoming_instruction: &incoming,
        authority_index: authority.index(),
        authority_bump: authority.bump(),
        authority_type: authority.resolved_kind(),
    };
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*multisig, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new(*instruction, false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(names::ADD_INSTRUCTION, &args),
    }
}

fn vote_accounts(
    multisig: &Pubkey,
    multisig_writable: bool,
    transaction: &Pubkey,
    member: &Pubkey,
) -> Vec<AccountMeta> {
    let multisig = if multisig_writable {
        AccountMeta::new(*multisig, false)
    } else {
        AccountMeta::new_readonly(*multisig, false)
    };
    vec![
        multisig,
        AccountMeta::new(*transaction, false),
        AccountMeta::new(*member, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ]
}

pub fn approve_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    member: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vote_accounts(multisig, false, transaction, member),
        data: discriminator(names::APPROVE_TRANSACTION).to_vec(),
    }
}

pub fn reject_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    member: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vote_accounts(multisig, false, transaction, member),
        data: discriminator(names::REJECT_TRANSACTION).to_vec(),
    }
}

pub fn cancel_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    member: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vote_accounts(multisig, true, transaction, member),
        data: discriminator(names::CANCEL_TRANSACTION).to_vec(),
    }
}

/// `account_list[i]` indexes `remaining_accounts` for the i-th flattened key
pub fn execute_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    member: &Pubkey,
    account_list: &[u8],
    remaining_accounts: Vec<AccountMeta>,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*multisig, false),
        AccountMeta::new(*transaction, false),
        AccountMeta::new(*member, true),
    ];
    accounts.extend(remaining_accounts);
    Instruction {
        program_id: *program_id,
        accounts,
        data: encode(names::EXECUTE_TRANSACTION, &account_list),
    }
}

pub fn execute_instruction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    instruction: &Pubkey,
    member: &Pubkey,
    remaining_accounts: Vec<AccountMeta>,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*multisig, false),
        AccountMeta::new(*transaction, false),
        AccountMeta::new(*instruction, false),
        AccountMeta::new(*member, true),
    ];
    accounts.extend(remaining_accounts);
    Instruction {
        program_id: *program_id,
        accounts,
        data: discriminator(names::EXECUTE_INSTRUCTION).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MULTISIG_PROGRAM_ID;

    #[test]
    fn test_sighash_is_sha256_prefix() {
        let full = Sha256::digest(b"global:create_transaction");
        assert_eq!(discriminator(names::CREATE_TRANSACTION), full[..8]);
        assert_ne!(
            discriminator(names::CREATE_TRANSACTION),
            discriminator(names::ADD_INSTRUCTION)
        );
    }

    #[test]
    fn test_create_transaction_encoding() {
        let program_id = DEFAULT_MULTISIG_PROGRAM_ID;
        let (ms, tx, creator) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let ix = create_transaction(&program_id, &ms, &tx, &creator, 1);

        assert!(is_instruction(&ix, &program_id, names::CREATE_TRANSACTION));
        assert_eq!(ix.data[8..], [1, 0, 0, 0]);
        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, tx);
        assert!(ix.accounts[2].is_signer && ix.accounts[2].is_writable);
        assert_eq!(ix.accounts[3].pubkey, system_program::id());
    }

    #[test]
    fn test_add_instruction_default_authority_encoding() {
        let program_id = DEFAULT_MULTISIG_PROGRAM_ID;
        let inner_program = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let inner = Instruction::new_with_bytes(
            inner_program,
            &[0xAA, 0xBB],
            vec![AccountMeta::new(key, true)],
        );
        let ix = add_instruction(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &inner,
            &AuthorityDescriptor::default_authority(),
        );

        let mut expected = discriminator(names::ADD_INSTRUCTION).to_vec();
        expected.extend_from_slice(inner_program.as_ref());
        expected.extend_from_slice(&1u32.to_le_bytes()); // keys len
        expected.extend_from_slice(key.as_ref());
        expected.extend_from_slice(&[1, 1]); // is_signer, is_writable
        expected.extend_from_slice(&2u32.to_le_bytes()); // data len
        expected.extend_from_slice(&[0xAA, 0xBB]);
        expected.extend_from_slice(&[0, 0]); // authority_index, authority_bump: None
        expected.push(0); // AuthorityKind::Default
        assert_eq!(ix.data, expected);
        assert!(!ix.accounts[0].is_writable);
    }

    #[test]
    fn test_add_instruction_custom_authority_encoding() {
        let program_id = DEFAULT_MULTISIG_PROGRAM_ID;
        let inner = Instruction::new_with_bytes(Pubkey::new_unique(), &[], vec![]);
        let ix = add_instruction(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &inner,
            &AuthorityDescriptor::custom(3, 250),
        );
        let tail = &ix.data[ix.data.len() - 8..];
        assert_eq!(tail, &[1, 3, 0, 0, 0, 1, 250, 1]);
    }

    #[test]
    fn test_create_multisig_encoding() {
        let program_id = DEFAULT_MULTISIG_PROGRAM_ID;
        let members = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let params = CreateMultisigParams {
            external_authority: Pubkey::new_unique(),
            threshold: 2,
            create_key: Pubkey::new_unique(),
            members: members.clone(),
        };
        let ix = create(&program_id, &Pubkey::new_unique(), &Pubkey::new_unique(), &params);
        assert_eq!(ix.data.len(), 8 + 32 + 2 + 32 + 4 + 64);
        assert_eq!(ix.data[40..42], [2, 0]);
        assert_eq!(ix.data[74..78], [2, 0, 0, 0]);
        assert_eq!(ix.data[78..110], members[0].to_bytes());
    }

    #[test]
    fn test_execute_transaction_appends_remaining_accounts() {
        let program_id = DEFAULT_MULTISIG_PROGRAM_ID;
        let extra = AccountMeta::new_readonly(Pubkey::new_unique(), false);
        let ix = execute_transaction(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &[0, 1, 0],
            vec![extra.clone()],
        );
        assert_eq!(ix.accounts.len(), 4);
        assert_eq!(ix.accounts[3], extra);
        assert_eq!(ix.data[8..], [3, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_config_instructions_use_external_authority_signer() {
        let program_id = DEFAULT_MULTISIG_PROGRAM_ID;
        let (ms, ext) = (Pubkey::new_unique(), Pubkey::new_unique());
        let ix = add_member(&program_id, &ms, &ext, &Pubkey::new_unique());
        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[2].pubkey, sysvar::rent::id());

        let ix = change_threshold(&program_id, &ms, &ext, 3);
        assert_eq!(ix.accounts.len(), 2);
        assert_eq!(ix.data[8..], [3, 0]);

        let ix = set_external_execute(&program_id, &ms, &ext, true);
        assert_eq!(ix.data[8..], [1]);
    }
}
