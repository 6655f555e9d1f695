//! Finalized proposal bundle

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

/// Result of `TransactionBuilder::finalize`.
///
/// `instructions` is `[create_transaction, add_instruction_1, ..., add_instruction_N]`
/// (plus a trailing `activate_transaction` when built with activation), ready
/// to be placed in a single transport transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedTransaction {
    pub instructions: Vec<Instruction>,
    /// Predicted address of the transaction account `create_transaction` opens
    pub transaction_pda: Pubkey,
}

impl FinalizedTransaction {
    pub fn new(instructions: Vec<Instruction>, transaction_pda: Pubkey) -> Self {
        Self {
            instructions,
            transaction_pda,
        }
    }

    pub fn into_parts(self) -> (Vec<Instruction>, Pubkey) {
        (self.instructions, self.transaction_pda)
    }
}
