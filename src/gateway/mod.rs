pub mod codec;
pub mod models;
pub mod solana;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use crate::error::RelayResult;
pub use models::*;

/// Ledger gateway - everything the relay reads from or writes to the chain
///
/// Implementations must return fresh state on every call; handlers rely on
/// re-reading to reconcile ambiguous transaction outcomes.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn get_stake_manager(&self, address: &Pubkey) -> RelayResult<StakeManagerView>;

    async fn get_stack(&self, address: &Pubkey) -> RelayResult<StackView>;

    async fn get_stake_activation(&self, address: &Pubkey) -> RelayResult<StakeActivationState>;

    /// Fails with `GatewayError::AccountNotFound` once the account is closed
    async fn get_stake_delegation(&self, address: &Pubkey) -> RelayResult<DelegationInfo>;

    async fn get_minimum_delegation(&self) -> RelayResult<u64>;

    async fn get_current_epoch(&self) -> RelayResult<u64>;

    async fn get_latest_blockhash(&self) -> RelayResult<Hash>;

    async fn token_account_exists(&self, address: &Pubkey) -> RelayResult<bool>;

    async fn send_transaction(&self, transaction: &Transaction) -> RelayResult<Signature>;

    async fn get_transaction_status(&self, signature: &Signature) -> RelayResult<TransactionState>;
}
