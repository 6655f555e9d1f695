//! `SquadsMesh` client: account reads, instruction construction and
//! submit-and-refetch lifecycle calls over a [`Transport`].
//!
//! Every async lifecycle call submits exactly one transport transaction and
//! then re-reads the account it changed. Nothing is retried; program
//! rejections come back as [`TransportError::ProtocolRejection`] with the
//! program's own error code.

use crate::address::{self, AddressError, AddressRole};
use crate::config::{ConfigError, MeshConfig};
use crate::constants::{
    DEFAULT_MULTISIG_PROGRAM_ID, DEVNET_ENDPOINT, LOCALNET_ENDPOINT, MAINNET_ENDPOINT,
};
use crate::instructions::{self, CreateMultisigParams};
use crate::transport::{submit_instructions, RpcTransport, Transport, TransportError};
use crate::tx_builder::{TransactionBuilder, TransactionBuilderError};
use crate::types::{
    AccountDecodeError, AnchorAccount, AuthorityDescriptor, InstructionAccount, Ms,
    MsInstruction, MsTransaction, MultisigRef, TransactionAccount,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Largest `remaining_accounts` list a one-byte `account_list` entry can index
pub const MAX_EXECUTION_ACCOUNTS: usize = 256;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Builder(#[from] TransactionBuilderError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Failed to decode account {address}: {source}")]
    AccountDecode {
        address: Pubkey,
        #[source]
        source: AccountDecodeError,
    },

    #[error("execute_transaction needs {count} unique accounts, at most 256 fit")]
    AccountListOverflow { count: usize },
}

impl MeshError {
    pub fn category(&self) -> &'static str {
        match self {
            MeshError::Address(_) => "encoding",
            MeshError::Builder(e) => e.category(),
            MeshError::Transport(_) => "transport",
            MeshError::Config(_) => "config",
            MeshError::AccountNotFound(_) => "not_found",
            MeshError::AccountDecode { .. } => "decode",
            MeshError::AccountListOverflow { .. } => "overflow",
        }
    }

    /// Program error code when the chain rejected a submission
    pub fn program_error_code(&self) -> Option<u32> {
        match self {
            MeshError::Transport(e) => e.program_error_code(),
            MeshError::Builder(TransactionBuilderError::Transport(e)) => e.program_error_code(),
            _ => None,
        }
    }
}

/// Connection options for the cluster constructors
#[derive(Debug, Clone)]
pub struct MeshOptions {
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
    pub timeout: Duration,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::confirmed(),
            program_id: DEFAULT_MULTISIG_PROGRAM_ID,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Remaining accounts and `account_list` for `execute_transaction`.
///
/// Each inner instruction contributes `[instruction_pda (w), program_id,
/// keys...]`, signer flags cleared. Entries are deduplicated by
/// `(pubkey, is_writable)` in first-seen order; `account_list[i]` is the
/// position of the i-th contributed entry in the returned accounts.
pub fn execution_accounts(
    instructions: &[InstructionAccount],
) -> Result<(Vec<u8>, Vec<AccountMeta>), MeshError> {
    let mut account_list = Vec::new();
    let mut remaining: Vec<AccountMeta> = Vec::new();
    let mut positions: HashMap<(Pubkey, bool), u8> = HashMap::new();

    for ix in instructions {
        let entries = std::iter::once((ix.address, true))
            .chain(std::iter::once((ix.state.program_id, false)))
            .chain(ix.state.keys.iter().map(|k| (k.pubkey, k.is_writable)));

        for (pubkey, is_writable) in entries {
            let position = match positions.get(&(pubkey, is_writable)) {
                Some(position) => *position,
                None => {
                    let position = u8::try_from(remaining.len()).map_err(|_| {
                        MeshError::AccountListOverflow {
                            count: remaining.len() + 1,
                        }
                    })?;
                    positions.insert((pubkey, is_writable), position);
                    remaining.push(AccountMeta {
                        pubkey,
                        is_signer: false,
                        is_writable,
                    });
                    position
                }
            };
            account_list.push(position);
        }
    }

    Ok((account_list, remaining))
}

/// Remaining accounts for `execute_instruction`: `[program_id, keys...]`, none signing
pub fn instruction_accounts(instruction: &MsInstruction) -> Vec<AccountMeta> {
    let mut accounts = Vec::with_capacity(instruction.keys.len() + 1);
    accounts.push(AccountMeta::new_readonly(instruction.program_id, false));
    accounts.extend(instruction.keys.iter().map(|k| AccountMeta {
        pubkey: k.pubkey,
        is_signer: false,
        is_writable: k.is_writable,
    }));
    accounts
}

#[derive(Clone)]
pub struct SquadsMesh {
    transport: Arc<dyn Transport>,
    program_id: Pubkey,
}

impl std::fmt::Debug for SquadsMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquadsMesh")
            .field("program_id", &self.program_id)
            .field("payer", &self.transport.payer())
            .finish()
    }
}

impl SquadsMesh {
    pub fn new(transport: Arc<dyn Transport>, program_id: Pubkey) -> Self {
        Self {
            transport,
            program_id,
        }
    }

    /// Client over JSON-RPC at `url`, signing as `payer`
    pub fn endpoint(url: impl Into<String>, payer: Arc<Keypair>, options: MeshOptions) -> Self {
        let transport = RpcTransport::new(url.into(), options.commitment, options.timeout, payer);
        Self::new(Arc::new(transport), options.program_id)
    }

    pub fn mainnet(payer: Arc<Keypair>, options: MeshOptions) -> Self {
        Self::endpoint(MAINNET_ENDPOINT, payer, options)
    }

    pub fn devnet(payer: Arc<Keypair>, options: MeshOptions) -> Self {
        Self::endpoint(DEVNET_ENDPOINT, payer, options)
    }

    pub fn localnet(payer: Arc<Keypair>, options: MeshOptions) -> Self {
        Self::endpoint(LOCALNET_ENDPOINT, payer, options)
    }

    pub fn from_config(config: &MeshConfig, payer: Arc<Keypair>) -> Result<Self, MeshError> {
        config.validate()?;
        let options = MeshOptions {
            commitment: config.commitment_config(),
            program_id: config.program_id()?,
            timeout: config.timeout(),
        };
        Ok(Self::endpoint(config.endpoint()?, payer, options))
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Identity that creates, votes and pays unless told otherwise
    pub fn payer(&self) -> Pubkey {
        self.transport.payer()
    }

    async fn fetch_account<A: AnchorAccount>(&self, address: &Pubkey) -> Result<A, MeshError> {
        let data = self
            .transport
            .get_account_data(address)
            .await?
            .ok_or(MeshError::AccountNotFound(*address))?;
        A::try_from_account_data(&data).map_err(|source| MeshError::AccountDecode {
            address: *address,
            source,
        })
    }

    /// Missing or undecodable accounts come back as `None`
    async fn fetch_accounts<A: AnchorAccount>(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<A>>, MeshError> {
        let data = self.transport.get_multiple_account_data(addresses).await?;
        Ok(data
            .into_iter()
            .map(|d| d.and_then(|bytes| A::try_from_account_data(&bytes).ok()))
            .collect())
    }

    pub async fn get_multisig(&self, address: &Pubkey) -> Result<MultisigRef, MeshError> {
        let state: Ms = self.fetch_account(address).await?;
        Ok(MultisigRef::new(*address, state))
    }

    pub async fn get_multisigs(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<MultisigRef>>, MeshError> {
        let states = self.fetch_accounts::<Ms>(addresses).await?;
        Ok(addresses
            .iter()
            .zip(states)
            .map(|(address, state)| state.map(|s| MultisigRef::new(*address, s)))
            .collect())
    }

    pub async fn get_transaction(&self, address: &Pubkey) -> Result<TransactionAccount, MeshError> {
        let state: MsTransaction = self.fetch_account(address).await?;
        Ok(TransactionAccount {
            address: *address,
            state,
        })
    }

    pub async fn get_transactions(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<TransactionAccount>>, MeshError> {
        let states = self.fetch_accounts::<MsTransaction>(addresses).await?;
        Ok(addresses
            .iter()
            .zip(states)
            .map(|(address, state)| {
                state.map(|state| TransactionAccount {
                    address: *address,
                    state,
                })
            })
            .collect())
    }

    pub async fn get_instruction(&self, address: &Pubkey) -> Result<InstructionAccount, MeshError> {
        let state: MsInstruction = self.fetch_account(address).await?;
        Ok(InstructionAccount {
            address: *address,
            state,
        })
    }

    pub async fn get_instructions(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<InstructionAccount>>, MeshError> {
        let states = self.fetch_accounts::<MsInstruction>(addresses).await?;
        Ok(addresses
            .iter()
            .zip(states)
            .map(|(address, state)| {
                state.map(|state| InstructionAccount {
                    address: *address,
                    state,
                })
            })
            .collect())
    }

    /// Index the next `create_transaction` on this multisig will use
    pub async fn get_next_transaction_index(&self, multisig: &Pubkey) -> Result<u64, MeshError> {
        let ms = self.get_multisig(multisig).await?;
        next_index(AddressRole::Transaction, u64::from(ms.transaction_index()))
    }

    /// Position the next `add_instruction` on this transaction will use
    pub async fn get_next_instruction_index(&self, transaction: &Pubkey) -> Result<u64, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        next_index(AddressRole::Instruction, u64::from(tx.state.instruction_index))
    }

    pub fn get_authority_pda(
        &self,
        multisig: &Pubkey,
        authority_index: u32,
    ) -> Result<Pubkey, MeshError> {
        let (pda, _) = address::get_authority_pda(multisig, u64::from(authority_index), &self.program_id)?;
        Ok(pda)
    }

    /// Builder over a freshly fetched snapshot of `multisig`, creating as the payer
    pub async fn get_transaction_builder(
        &self,
        multisig: &Pubkey,
        authority_index: u32,
    ) -> Result<TransactionBuilder, MeshError> {
        let ms = self.get_multisig(multisig).await?;
        debug!(
            multisig = %multisig,
            transaction_index = ms.transaction_index(),
            authority_index,
            "Fetched multisig for builder"
        );
        Ok(TransactionBuilder::new(
            ms,
            authority_index,
            self.program_id,
            self.transport.payer(),
        ))
    }

    async fn submit(&self, instruction: Instruction) -> Result<(), MeshError> {
        submit_instructions(self.transport.as_ref(), &[instruction], None, &[]).await?;
        Ok(())
    }

    pub fn build_create_multisig(
        &self,
        external_authority: Pubkey,
        threshold: u16,
        create_key: Pubkey,
        members: Vec<Pubkey>,
    ) -> (Instruction, Pubkey) {
        let (multisig, _) = address::get_ms_pda(&create_key, &self.program_id);
        let params = CreateMultisigParams {
            external_authority,
            threshold,
            create_key,
            members,
        };
        let ix = instructions::create(&self.program_id, &multisig, &self.transport.payer(), &params);
        (ix, multisig)
    }

    pub async fn create_multisig(
        &self,
        external_authority: Pubkey,
        threshold: u16,
        create_key: Pubkey,
        members: Vec<Pubkey>,
    ) -> Result<MultisigRef, MeshError> {
        let (ix, multisig) =
            self.build_create_multisig(external_authority, threshold, create_key, members);
        self.submit(ix).await?;
        info!(multisig = %multisig, threshold, "Multisig created");
        self.get_multisig(&multisig).await
    }

    pub fn build_create_transaction(
        &self,
        multisig: &Pubkey,
        authority_index: u32,
        transaction_index: u64,
    ) -> Result<(Instruction, Pubkey), MeshError> {
        let (transaction, _) = address::get_tx_pda(multisig, transaction_index, &self.program_id)?;
        let ix = instructions::create_transaction(
            &self.program_id,
            multisig,
            &transaction,
            &self.transport.payer(),
            authority_index,
        );
        Ok((ix, transaction))
    }

    pub async fn create_transaction(
        &self,
        multisig: &Pubkey,
        authority_index: u32,
    ) -> Result<TransactionAccount, MeshError> {
        let index = self.get_next_transaction_index(multisig).await?;
        let (ix, transaction) = self.build_create_transaction(multisig, authority_index, index)?;
        self.submit(ix).await?;
        info!(transaction = %transaction, index, "Transaction created");
        self.get_transaction(&transaction).await
    }

    pub fn build_add_instruction(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
        instruction: &Instruction,
        instruction_index: u64,
        authority: AuthorityDescriptor,
    ) -> Result<(Instruction, Pubkey), MeshError> {
        authority.validate()?;
        let (instruction_pda, _) = address::get_ix_pda(transaction, instruction_index, &self.program_id)?;
        let ix = instructions::add_instruction(
            &self.program_id,
            multisig,
            transaction,
            &instruction_pda,
            &self.transport.payer(),
            instruction,
            &authority,
        );
        Ok((ix, instruction_pda))
    }

    pub async fn add_instruction(
        &self,
        transaction: &Pubkey,
        instruction: &Instruction,
        authority: AuthorityDescriptor,
    ) -> Result<InstructionAccount, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        let index = self.get_next_instruction_index(transaction).await?;
        let (ix, instruction_pda) =
            self.build_add_instruction(&tx.state.ms, transaction, instruction, index, authority)?;
        self.submit(ix).await?;
        info!(instruction = %instruction_pda, index, "Instruction added");
        self.get_instruction(&instruction_pda).await
    }

    pub fn build_activate_transaction(&self, multisig: &Pubkey, transaction: &Pubkey) -> Instruction {
        instructions::activate_transaction(
            &self.program_id,
            multisig,
            transaction,
            &self.transport.payer(),
        )
    }

    pub async fn activate_transaction(
        &self,
        transaction: &Pubkey,
    ) -> Result<TransactionAccount, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        self.submit(self.build_activate_transaction(&tx.state.ms, transaction))
            .await?;
        info!(transaction = %transaction, "Transaction activated");
        self.get_transaction(transaction).await
    }

    pub fn build_approve_transaction(&self, multisig: &Pubkey, transaction: &Pubkey) -> Instruction {
        instructions::approve_transaction(
            &self.program_id,
            multisig,
            transaction,
            &self.transport.payer(),
        )
    }

    pub async fn approve_transaction(
        &self,
        transaction: &Pubkey,
    ) -> Result<TransactionAccount, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        self.submit(self.build_approve_transaction(&tx.state.ms, transaction))
            .await?;
        info!(transaction = %transaction, "Transaction approved");
        self.get_transaction(transaction).await
    }

    pub fn build_reject_transaction(&self, multisig: &Pubkey, transaction: &Pubkey) -> Instruction {
        instructions::reject_transaction(
            &self.program_id,
            multisig,
            transaction,
            &self.transport.payer(),
        )
    }

    pub async fn reject_transaction(
        &self,
        transaction: &Pubkey,
    ) -> Result<TransactionAccount, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        self.submit(self.build_reject_transaction(&tx.state.ms, transaction))
            .await?;
        info!(transaction = %transaction, "Transaction rejected");
        self.get_transaction(transaction).await
    }

    pub fn build_cancel_transaction(&self, multisig: &Pubkey, transaction: &Pubkey) -> Instruction {
        instructions::cancel_transaction(
            &self.program_id,
            multisig,
            transaction,
            &self.transport.payer(),
        )
    }

    pub async fn cancel_transaction(
        &self,
        transaction: &Pubkey,
    ) -> Result<TransactionAccount, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        self.submit(self.build_cancel_transaction(&tx.state.ms, transaction))
            .await?;
        info!(transaction = %transaction, "Transaction cancelled");
        self.get_transaction(transaction).await
    }

    /// Load the transaction and its inner instructions 1..=instruction_index
    /// and assemble `execute_transaction` for `member` (the payer when `None`).
    pub async fn build_execute_transaction(
        &self,
        transaction: &Pubkey,
        member: Option<Pubkey>,
    ) -> Result<Instruction, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        let mut addresses = Vec::with_capacity(usize::from(tx.state.instruction_index));
        for position in 1..=tx.state.instruction_index {
            let (pda, _) = address::get_ix_pda(transaction, u64::from(position), &self.program_id)?;
            addresses.push(pda);
        }

        let fetched = self.get_instructions(&addresses).await?;
        let mut inner = Vec::with_capacity(fetched.len());
        for (address, account) in addresses.iter().zip(fetched) {
            inner.push(account.ok_or(MeshError::AccountNotFound(*address))?);
        }

        let (account_list, remaining) = execution_accounts(&inner)?;
        debug!(
            transaction = %transaction,
            instructions = inner.len(),
            unique_accounts = remaining.len(),
            "Assembled execute_transaction accounts"
        );
        let member = member.unwrap_or_else(|| self.transport.payer());
        Ok(instructions::execute_transaction(
            &self.program_id,
            &tx.state.ms,
            transaction,
            &member,
            &account_list,
            remaining,
        ))
    }

    /// Execute every inner instruction in one go. `fee_payer` signs as the
    /// executing member; `signers` are extra signatures it may need.
    pub async fn execute_transaction(
        &self,
        transaction: &Pubkey,
        fee_payer: Option<Pubkey>,
        signers: &[&dyn Signer],
    ) -> Result<TransactionAccount, MeshError> {
        let ix = self.build_execute_transaction(transaction, fee_payer).await?;
        submit_instructions(self.transport.as_ref(), &[ix], fee_payer, signers).await?;
        info!(transaction = %transaction, "Transaction executed");
        self.get_transaction(transaction).await
    }

    pub async fn build_execute_instruction(
        &self,
        transaction: &Pubkey,
        instruction: &Pubkey,
    ) -> Result<Instruction, MeshError> {
        let tx = self.get_transaction(transaction).await?;
        let ix = self.get_instruction(instruction).await?;
        Ok(instructions::execute_instruction(
            &self.program_id,
            &tx.state.ms,
            transaction,
            instruction,
            &self.transport.payer(),
            instruction_accounts(&ix.state),
        ))
    }

    /// Execute a single inner instruction
    pub async fn execute_instruction(
        &self,
        transaction: &Pubkey,
        instruction: &Pubkey,
    ) -> Result<InstructionAccount, MeshError> {
        let ix = self.build_execute_instruction(transaction, instruction).await?;
        self.submit(ix).await?;
        info!(instruction = %instruction, "Instruction executed");
        self.get_instruction(instruction).await
    }
}

/// `current + 1`, provided it still fits the role's seed width
fn next_index(role: AddressRole, current: u64) -> Result<u64, MeshError> {
    let next = current + 1;
    address::encode_index(role, next)?;
    Ok(next)
}
