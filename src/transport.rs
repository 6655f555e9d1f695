//! Transport collaborator: account reads and atomic submission
//!
//! The mesh program owns all validation; this layer only moves bytes. Errors
//! are classified once (program rejection vs. RPC failure) and then passed
//! through unchanged. No retries, no timeouts beyond the client's own.

use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{Instruction, InstructionError},
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Largest batch `getMultipleAccounts` accepts
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Transport-level error types
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network or RPC server failure
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The transaction reached the chain and a program refused it.
    ///
    /// `code` is the custom program error code when one was returned; it is
    /// surfaced as-is.
    #[error("Program rejected transaction (code: {code:?}): {message}")]
    ProtocolRejection { code: Option<u32>, message: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl TransportError {
    /// Check if this error is transient
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Rpc(_) => true,
            TransportError::Timeout(_) => true,
            TransportError::ProtocolRejection { .. } => false,
            TransportError::Signing(_) => false,
        }
    }

    /// Custom program error code, if the program returned one
    pub fn program_error_code(&self) -> Option<u32> {
        match self {
            TransportError::ProtocolRejection { code, .. } => *code,
            _ => None,
        }
    }

    /// Classify a solana client error
    pub fn from_client_error(err: ClientError) -> Self {
        if let Some(tx_err) = err.get_transaction_error() {
            let code = match &tx_err {
                TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
                _ => None,
            };
            return TransportError::ProtocolRejection {
                code,
                message: tx_err.to_string(),
            };
        }

        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            TransportError::Timeout(message)
        } else {
            TransportError::Rpc(message)
        }
    }
}

impl From<ClientError> for TransportError {
    fn from(err: ClientError) -> Self {
        Self::from_client_error(err)
    }
}

/// Everything the mesh client needs from the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identity that pays for and signs submitted transactions
    fn payer(&self) -> Pubkey;

    async fn latest_blockhash(&self) -> Result<Hash, TransportError>;

    async fn block_height(&self) -> Result<u64, TransportError>;

    /// Sign as payer (when required), submit and wait for confirmation.
    ///
    /// Signatures already present on `transaction` are kept.
    async fn send_and_confirm(
        &self,
        transaction: Transaction,
        last_valid_block_height: u64,
    ) -> Result<Signature, TransportError>;

    /// Raw account data, `None` if the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError>;

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, TransportError> {
        let mut out = Vec::with_capacity(addresses.len());
        for address in addresses {
            out.push(self.get_account_data(address).await?);
        }
        Ok(out)
    }
}

/// Put `instructions` into one transaction and submit it atomically.
///
/// `fee_payer` defaults to the transport payer. `signers` partially sign
/// before the transport adds the payer signature.
pub async fn submit_instructions<T: Transport + ?Sized>(
    transport: &T,
    instructions: &[Instruction],
    fee_payer: Option<Pubkey>,
    signers: &[&dyn Signer],
) -> Result<Signature, TransportError> {
    let blockhash = transport.latest_blockhash().await?;
    let last_valid_block_height = transport.block_height().await?;
    let fee_payer = fee_payer.unwrap_or_else(|| transport.payer());

    let message = Message::new_with_blockhash(instructions, Some(&fee_payer), &blockhash);
    let mut transaction = Transaction::new_unsigned(message);
    if !signers.is_empty() {
        transaction
            .try_partial_sign(signers, blockhash)
            .map_err(|e| TransportError::Signing(e.to_string()))?;
    }

    let signature = transport
        .send_and_confirm(transaction, last_valid_block_height)
        .await?;
    info!(
        signature = %signature,
        fee_payer = %fee_payer,
        instructions = instructions.len(),
        "Transaction confirmed"
    );
    Ok(signature)
}

/// [`Transport`] over the solana JSON-RPC client
pub struct RpcTransport {
    rpc: RpcClient,
    payer: Arc<Keypair>,
}

impl RpcTransport {
    pub fn new(
        url: String,
        commitment: CommitmentConfig,
        timeout: Duration,
        payer: Arc<Keypair>,
    ) -> Self {
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(url, timeout, commitment),
            payer,
        }
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

impl std::fmt::Debug for RpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcTransport")
            .field("url", &self.rpc.url())
            .field("payer", &self.payer.pubkey())
            .finish()
    }
}

#[async_trait]
impl Transport for RpcTransport {
    fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn latest_blockhash(&self) -> Result<Hash, TransportError> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn block_height(&self) -> Result<u64, TransportError> {
        Ok(self.rpc.get_block_height().await?)
    }

    async fn send_and_confirm(
        &self,
        mut transaction: Transaction,
        last_valid_block_height: u64,
    ) -> Result<Signature, TransportError> {
        let payer = self.payer.pubkey();
        let required = usize::from(transaction.message.header.num_required_signatures);
        let payer_required = transaction
            .message
            .account_keys
            .iter()
            .take(required)
            .any(|key| *key == payer);

        if payer_required {
            let blockhash = transaction.message.recent_blockhash;
            transaction
                .try_partial_sign(&[self.payer.as_ref()], blockhash)
                .map_err(|e| TransportError::Signing(e.to_string()))?;
        }
        if !transaction.is_signed() {
            return Err(TransportError::Signing(
                "transaction is missing required signatures".to_string(),
            ));
        }

        debug!(
            endpoint = %self.rpc.url(),
            last_valid_block_height,
            "Submitting transaction"
        );
        Ok(self.rpc.send_and_confirm_transaction(&transaction).await?)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, TransportError> {
        let mut out = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let accounts = self.rpc.get_multiple_accounts(chunk).await?;
            out.extend(accounts.into_iter().map(|a| a.map(|account| account.data)));
        }
        Ok(out)
    }
}
