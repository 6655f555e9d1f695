//! Core TransactionBuilder implementation
//!
//! A builder accumulates inner instructions for one multisig/authority pair
//! and turns them into a single proposal bundle:
//!
//! ```text
//! [create_transaction, add_instruction(1), ..., add_instruction(N)]
//! ```
//!
//! `with_*` methods never mutate: each returns a new builder owning its own
//! copy of the pending list, so earlier snapshots stay valid while another
//! branch keeps growing. `finalize` is the only mutating call and drains the
//! pending list of the instance it runs on.

use crate::address::{get_ix_pda, get_tx_pda};
use crate::instructions::{activate_transaction, add_instruction, create_transaction};
use crate::transport::{submit_instructions, Transport};
use crate::tx_builder::errors::TransactionBuilderError;
use crate::tx_builder::instructions::sanity_check_proposal_order;
use crate::tx_builder::output::FinalizedTransaction;
use crate::types::{AuthorityDescriptor, MultisigRef, PendingOperation};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBuilder {
    multisig: MultisigRef,
    authority_index: u32,
    program_id: Pubkey,
    creator: Pubkey,
    pending: Vec<PendingOperation>,
}

impl TransactionBuilder {
    /// `creator` is the identity that signs `create_transaction` and every
    /// `add_instruction`; it must match the payer used at submission.
    pub fn new(
        multisig: MultisigRef,
        authority_index: u32,
        program_id: Pubkey,
        creator: Pubkey,
    ) -> Self {
        Self {
            multisig,
            authority_index,
            program_id,
            creator,
            pending: Vec::new(),
        }
    }

    pub fn multisig(&self) -> &MultisigRef {
        &self.multisig
    }

    pub fn authority_index(&self) -> u32 {
        self.authority_index
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn creator(&self) -> &Pubkey {
        &self.creator
    }

    /// Pending operations in execution order
    pub fn pending(&self) -> &[PendingOperation] {
        &self.pending
    }

    fn clone_with(&self, appended: Vec<PendingOperation>) -> Self {
        let mut pending = Vec::with_capacity(self.pending.len() + appended.len());
        pending.extend(self.pending.iter().cloned());
        pending.extend(appended);
        Self {
            multisig: self.multisig.clone(),
            authority_index: self.authority_index,
            program_id: self.program_id,
            creator: self.creator,
            pending,
        }
    }

    /// Append one instruction; `None` authority means default kind, no index, no bump
    pub fn with_instruction(
        &self,
        instruction: Instruction,
        authority: Option<AuthorityDescriptor>,
    ) -> Self {
        self.clone_with(vec![PendingOperation::new(
            instruction,
            authority.unwrap_or_default(),
        )])
    }

    /// Append several instructions sharing one authority descriptor
    pub fn with_instructions_uniform_authority(
        &self,
        instructions: impl IntoIterator<Item = Instruction>,
        authority: Option<AuthorityDescriptor>,
    ) -> Self {
        let authority = authority.unwrap_or_default();
        self.clone_with(
            instructions
                .into_iter()
                .map(|ix| PendingOperation::new(ix, authority))
                .collect(),
        )
    }

    /// Append instructions matched 1:1 by position with `authorities`.
    ///
    /// Extra authorities are ignored; too few is an arity error and no new
    /// builder is produced.
    pub fn with_instructions_per_authority(
        &self,
        instructions: Vec<Instruction>,
        authorities: &[AuthorityDescriptor],
    ) -> Result<Self, TransactionBuilderError> {
        if authorities.len() < instructions.len() {
            return Err(TransactionBuilderError::arity(
                instructions.len(),
                authorities.len(),
            ));
        }
        Ok(self.clone_with(
            instructions
                .into_iter()
                .zip(authorities.iter().copied())
                .map(|(ix, authority)| PendingOperation::new(ix, authority))
                .collect(),
        ))
    }

    /// Address `finalize` will create: transaction `transaction_index + 1`
    /// of the held multisig snapshot.
    pub fn transaction_pda(&self) -> Result<Pubkey, TransactionBuilderError> {
        let next_index = u64::from(self.multisig.transaction_index()) + 1;
        let (transaction_pda, _) = get_tx_pda(&self.multisig.address, next_index, &self.program_id)?;
        Ok(transaction_pda)
    }

    /// Build `[create, add_1, ..., add_N]` and drain the pending list.
    ///
    /// Every address is derived before anything is cleared, so on error the
    /// pending list is untouched. Calling again without appending yields only
    /// the create instruction, for the same (now likely stale) address.
    pub fn finalize(&mut self) -> Result<FinalizedTransaction, TransactionBuilderError> {
        let transaction_pda = self.transaction_pda()?;

        let mut instructions = Vec::with_capacity(self.pending.len() + 1);
        instructions.push(create_transaction(
            &self.program_id,
            &self.multisig.address,
            &transaction_pda,
            &self.creator,
            self.authority_index,
        ));

        for (offset, op) in self.pending.iter().enumerate() {
            let position = offset as u64 + 1;
            let (instruction_pda, _) = get_ix_pda(&transaction_pda, position, &self.program_id)?;
            instructions.push(add_instruction(
                &self.program_id,
                &self.multisig.address,
                &transaction_pda,
                &instruction_pda,
                &self.creator,
                &op.instruction,
                &op.authority,
            ));
        }

        sanity_check_proposal_order(&instructions, &transaction_pda, &self.program_id)?;

        debug!(
            multisig = %self.multisig.address,
            transaction_pda = %transaction_pda,
            authority_index = self.authority_index,
            added = self.pending.len(),
            "Finalized proposal"
        );
        self.pending.clear();
        Ok(FinalizedTransaction::new(instructions, transaction_pda))
    }

    /// `finalize` followed by `activate_transaction`, so the proposal is open
    /// for voting as soon as the bundle lands.
    pub fn finalize_with_activation(
        &mut self,
    ) -> Result<FinalizedTransaction, TransactionBuilderError> {
        let mut finalized = self.finalize()?;
        finalized.instructions.push(activate_transaction(
            &self.program_id,
            &self.multisig.address,
            &finalized.transaction_pda,
            &self.creator,
        ));
        Ok(finalized)
    }

    /// Finalize, then submit the bundle as one transaction and wait for it.
    ///
    /// The pending list is drained even if submission fails; rebuild from a
    /// refreshed multisig snapshot before trying again.
    pub async fn execute_and_confirm<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<FinalizedTransaction, TransactionBuilderError> {
        let finalized = self.finalize()?;
        let signature =
            submit_instructions(transport, &finalized.instructions, None, &[]).await?;
        info!(
            signature = %signature,
            transaction_pda = %finalized.transaction_pda,
            "Proposal submitted"
        );
        Ok(finalized)
    }
}
