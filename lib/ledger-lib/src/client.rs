//! Read/submit contract of a ledger node.
//!
//! Commands never talk to [`RpcClient`] directly, they go through
//! [`LedgerClient`] so that the whole workflow can run against an in-memory
//! ledger in tests.

use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    account::Account, hash::Hash, message::Message, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// `Ok(None)` when nothing is stored at `pubkey`.
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ClientError>;

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ClientError>;

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ClientError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError>;

    async fn get_fee_for_message(&self, message: &Message) -> Result<u64, ClientError>;

    /// Request an airdrop and wait until it is confirmed.
    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, ClientError>;

    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, ClientError>;
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ClientError> {
        Ok(self
            .get_account_with_commitment(pubkey, self.commitment())
            .await?
            .value)
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ClientError> {
        RpcClient::get_balance(self, pubkey).await
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ClientError> {
        RpcClient::get_minimum_balance_for_rent_exemption(self, data_len).await
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        RpcClient::get_latest_blockhash(self).await
    }

    async fn get_fee_for_message(&self, message: &Message) -> Result<u64, ClientError> {
        RpcClient::get_fee_for_message(self, message).await
    }

    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, ClientError> {
        let signature = RpcClient::request_airdrop(self, pubkey, lamports).await?;
        self.poll_for_signature(&signature).await?;
        Ok(signature)
    }

    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, ClientError> {
        tracing::trace!("submitting transaction");
        RpcClient::send_and_confirm_transaction(self, tx).await
    }
}
