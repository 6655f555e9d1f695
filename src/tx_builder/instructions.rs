//! Ordering validation for finalized proposal bundles
//!
//! The program validates inner-instruction positions sequentially, so a
//! bundle must look like:
//! 1. `create_transaction` (opens the transaction PDA)
//! 2. `add_instruction` for positions 1..N, ascending
//! 3. optionally one trailing `activate_transaction`

use crate::address::get_ix_pda;
use crate::instructions::{is_instruction, names};
use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

/// Account position of the transaction PDA in create/add/activate
const TRANSACTION_ACCOUNT: usize = 1;
/// Account position of the inner-instruction PDA in `add_instruction`
const INSTRUCTION_ACCOUNT: usize = 2;

/// Validate bundle ordering (debug/test only)
///
/// Compiled only with `debug_assertions`; release builds get a no-op.
#[cfg(debug_assertions)]
pub fn sanity_check_proposal_order(
    instructions: &[Instruction],
    transaction_pda: &Pubkey,
    program_id: &Pubkey,
) -> Result<(), TransactionBuilderError> {
    let Some((first, rest)) = instructions.split_first() else {
        return Err(TransactionBuilderError::invalid_order("Instruction list is empty"));
    };

    if !is_instruction(first, program_id, names::CREATE_TRANSACTION) {
        return Err(TransactionBuilderError::invalid_order(format!(
            "Proposal must start with create_transaction, got program_id: {}",
            first.program_id
        )));
    }
    check_account(first, TRANSACTION_ACCOUNT, transaction_pda, 0)?;

    let rest = match rest.split_last() {
        Some((last, body)) if is_instruction(last, program_id, names::ACTIVATE_TRANSACTION) => {
            check_account(last, TRANSACTION_ACCOUNT, transaction_pda, instructions.len() - 1)?;
            body
        }
        _ => rest,
    };

    for (offset, ix) in rest.iter().enumerate() {
        let position = offset + 1;
        if !is_instruction(ix, program_id, names::ADD_INSTRUCTION) {
            return Err(TransactionBuilderError::invalid_order(format!(
                "Expected add_instruction at position {}",
                position
            )));
        }
        check_account(ix, TRANSACTION_ACCOUNT, transaction_pda, position)?;
        let (expected, _) = get_ix_pda(transaction_pda, position as u64, program_id)?;
        check_account(ix, INSTRUCTION_ACCOUNT, &expected, position)?;
    }

    Ok(())
}

#[cfg(debug_assertions)]
fn check_account(
    ix: &Instruction,
    account: usize,
    expected: &Pubkey,
    position: usize,
) -> Result<(), TransactionBuilderError> {
    match ix.accounts.get(account) {
        Some(meta) if meta.pubkey == *expected => Ok(()),
        Some(meta) => Err(TransactionBuilderError::invalid_order(format!(
            "Instruction {} references {} where {} was expected",
            position, meta.pubkey, expected
        ))),
        None => Err(TransactionBuilderError::invalid_order(format!(
            "Instruction {} is missing account #{}",
            position, account
        ))),
    }
}

/// No-op version of sanity_check_proposal_order for release builds
#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_proposal_order(
    _instructions: &[Instruction],
    _transaction_pda: &Pubkey,
    _program_id: &Pubkey,
) -> Result<(), TransactionBuilderError> {
    Ok(())
}
