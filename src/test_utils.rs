//! Test Utilities Module
//!
//! In-memory stand-in for the network so builders and the mesh client can be
//! exercised deterministically.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::transport::{Transport, TransportError};
use crate::types::AnchorAccount;
use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock Transport for testing
///
/// Accounts live in a map the test populates up front; submitted
/// transactions are recorded instead of sent. Submissions do not change
/// account state.
#[derive(Clone)]
pub struct MockTransport {
    payer: Arc<Keypair>,

    /// Account data by address
    pub accounts: Arc<Mutex<HashMap<Pubkey, Vec<u8>>>>,

    /// Every transaction passed to `send_and_confirm`, in order
    pub sent: Arc<Mutex<Vec<Transaction>>>,

    /// When set, `send_and_confirm` returns this error
    pub send_failure: Arc<Mutex<Option<TransportError>>>,

    /// Value returned by `block_height`
    pub block_height: u64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            payer: Arc::new(Keypair::new()),
            accounts: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            send_failure: Arc::new(Mutex::new(None)),
            block_height: 1_000,
        }
    }

    pub fn payer_keypair(&self) -> Arc<Keypair> {
        self.payer.clone()
    }

    /// Store raw account data
    pub async fn set_account_data(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().await.insert(address, data);
    }

    /// Store an Anchor account (discriminator + Borsh body)
    pub async fn set_account<A: AnchorAccount>(&self, address: Pubkey, account: &A) {
        self.set_account_data(address, account.to_account_data()).await;
    }

    pub async fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().await.remove(address);
    }

    /// Make every following submission fail with `error`
    pub async fn fail_sends_with(&self, error: TransportError) {
        *self.send_failure.lock().await = Some(error);
    }

    pub async fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn latest_blockhash(&self) -> Result<Hash, TransportError> {
        Ok(Hash::new_from_array([7u8; 32]))
    }

    async fn block_height(&self) -> Result<u64, TransportError> {
        Ok(self.block_height)
    }

    async fn send_and_confirm(
        &self,
        mut transaction: Transaction,
        _last_valid_block_height: u64,
    ) -> Result<Signature, TransportError> {
        if let Some(error) = self.send_failure.lock().await.clone() {
            return Err(error);
        }

        let payer = self.payer.pubkey();
        let required = usize::from(transaction.message.header.num_required_signatures);
        if transaction.message.account_keys.iter().take(required).any(|k| *k == payer) {
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

        let signature = transaction.signatures[0];
        self.sent.lock().await.push(transaction);
        Ok(signature)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.accounts.lock().await.get(address).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::submit_instructions;
    use crate::types::Ms;
    use solana_sdk::instruction::{AccountMeta, Instruction};

    #[tokio::test]
    async fn test_mock_transport_accounts() {
        let transport = MockTransport::new();
        let address = Pubkey::new_unique();
        assert_eq!(transport.get_account_data(&address).await.unwrap(), None);

        transport.set_account(address, &Ms::default()).await;
        let data = transport.get_account_data(&address).await.unwrap().unwrap();
        assert_eq!(Ms::try_from_account_data(&data).unwrap(), Ms::default());

        let many = transport
            .get_multiple_account_data(&[address, Pubkey::new_unique()])
            .await
            .unwrap();
        assert!(many[0].is_some());
        assert!(many[1].is_none());
    }

    #[tokio::test]
    async fn test_mock_transport_records_and_fails() {
        let transport = MockTransport::new();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(transport.payer(), true)],
        );

        submit_instructions(&transport, &[ix.clone()], None, &[]).await.unwrap();
        assert_eq!(transport.sent_count().await, 1);

        transport
            .fail_sends_with(TransportError::Rpc("connection refused".into()))
            .await;
        let result = submit_instructions(&transport, &[ix], None, &[]).await;
        assert!(matches!(result, Err(TransportError::Rpc(_))));
        assert_eq!(transport.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_transport_requires_extra_signers() {
        let transport = MockTransport::new();
        let other = Keypair::new();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(other.pubkey(), true)],
        );

        let unsigned = submit_instructions(&transport, &[ix.clone()], None, &[]).await;
        assert!(matches!(unsigned, Err(TransportError::Signing(_))));

        let signed = submit_instructions(&transport, &[ix], None, &[&other]).await;
        assert!(signed.is_ok());
    }
}
