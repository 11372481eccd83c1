use async_trait::async_trait;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::CommitmentConfig,
};
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_stake_interface::stake_history::StakeHistory;
use tracing::{debug, info};

use crate::{
    error::{GatewayError, RelayResult},
    gateway::{
        codec, DelegationInfo, LedgerGateway, StackView, StakeActivationState, StakeManagerView,
        TransactionState,
    },
    program::STAKE_HISTORY_SYSVAR_ID,
};

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
    /// Epoch from which the reduced warmup/cooldown rate applies; `None` keeps the legacy rate
    pub new_rate_activation_epoch: Option<u64>,
}

impl SolanaConfig {
    pub fn new(rpc_url: String, program_id: Pubkey) -> Self {
        Self {
            rpc_url,
            commitment: CommitmentConfig::confirmed(),
            program_id,
            new_rate_activation_epoch: Some(0),
        }
    }
}

/// Ledger gateway backed by a Solana JSON-RPC endpoint
pub struct SolanaGateway {
    config: SolanaConfig,
    client: RpcClient,
}

impl SolanaGateway {
    pub fn new(config: SolanaConfig) -> Self {
        let client = RpcClient::new_with_commitment(config.rpc_url.clone(), config.commitment);
        info!(rpc_url = %config.rpc_url, program_id = %config.program_id, "Solana gateway initialized");

        Self { config, client }
    }

    async fn get_account(&self, address: &Pubkey) -> RelayResult<Account> {
        let response = self
            .client
            .get_account_with_commitment(address, self.config.commitment)
            .await
            .map_err(GatewayError::from)?;

        response
            .value
            .ok_or_else(|| GatewayError::AccountNotFound(*address).into())
    }

    /// Fetch an account that must be owned by the LSD program
    async fn get_program_account(&self, address: &Pubkey) -> RelayResult<Account> {
        let account = self.get_account(address).await?;
        if account.owner != self.config.program_id {
            return Err(GatewayError::Decode {
                address: *address,
                message: format!("owned by {} instead of {}", account.owner, self.config.program_id),
            }
            .into());
        }
        Ok(account)
    }

    async fn get_stake_history(&self) -> RelayResult<StakeHistory> {
        let account = self.get_account(&STAKE_HISTORY_SYSVAR_ID).await?;
        codec::decode_stake_history(&STAKE_HISTORY_SYSVAR_ID, &account.data)
    }
}

/// Map a signature status (error, reached `confirmed`) onto the relay's view
pub fn transaction_state(status: Option<(Option<String>, bool)>) -> TransactionState {
    match status {
        None => TransactionState::Pending,
        Some((Some(reason), _)) => TransactionState::Failed(reason),
        Some((None, true)) => TransactionState::Success,
        Some((None, false)) => TransactionState::Pending,
    }
}

#[async_trait]
impl LedgerGateway for SolanaGateway {
    async fn get_stake_manager(&self, address: &Pubkey) -> RelayResult<StakeManagerView> {
        let account = self.get_program_account(address).await?;
        codec::decode_stake_manager(address, &account.data)
    }

    async fn get_stack(&self, address: &Pubkey) -> RelayResult<StackView> {
        let account = self.get_program_account(address).await?;
        codec::decode_stack(address, &account.data)
    }

    async fn get_stake_activation(&self, address: &Pubkey) -> RelayResult<StakeActivationState> {
        let account = self.get_account(address).await?;
        let stake = codec::decode_stake_account(address, &account.data)?;
        let epoch = self.get_current_epoch().await?;
        let history = self.get_stake_history().await?;

        let state = codec::activation_state(
            stake.as_ref().map(|s| &s.delegation),
            epoch,
            &history,
            self.config.new_rate_activation_epoch,
        );
        debug!(%address, epoch, ?state, "stake activation");
        Ok(state)
    }

    async fn get_stake_delegation(&self, address: &Pubkey) -> RelayResult<DelegationInfo> {
        let account = self.get_account(address).await?;
        let stake = codec::decode_stake_account(address, &account.data)?.ok_or_else(|| {
            GatewayError::Decode {
                address: *address,
                message: "stake account is not delegated".to_string(),
            }
        })?;

        Ok(DelegationInfo {
            voter: stake.delegation.voter_pubkey,
            credits_observed: stake.credits_observed,
            lamports: account.lamports,
            stake: stake.delegation.stake,
        })
    }

    async fn get_minimum_delegation(&self) -> RelayResult<u64> {
        Ok(self
            .client
            .get_stake_minimum_delegation()
            .await
            .map_err(GatewayError::from)?)
    }

    async fn get_current_epoch(&self) -> RelayResult<u64> {
        let epoch_info = self
            .client
            .get_epoch_info_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(GatewayError::from)?;
        Ok(epoch_info.epoch)
    }

    async fn get_latest_blockhash(&self) -> RelayResult<Hash> {
        let (blockhash, _) = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await
            .map_err(|e| GatewayError::Blockhash(e.to_string()))?;
        Ok(blockhash)
    }

    async fn token_account_exists(&self, address: &Pubkey) -> RelayResult<bool> {
        match self.get_account(address).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_account_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RelayResult<Signature> {
        let signature = self
            .client
            .send_transaction(transaction)
            .await
            .map_err(|e| GatewayError::Submit(e.to_string()))?;
        Ok(signature)
    }

    async fn get_transaction_status(&self, signature: &Signature) -> RelayResult<TransactionState> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(GatewayError::from)?;

        let state = transaction_state(response.value.into_iter().next().flatten().map(|status| {
            let landed = status.satisfies_commitment(CommitmentConfig::confirmed());
            (status.err.map(|err| err.to_string()), landed)
        }));
        debug!(%signature, ?state, "transaction status");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_signature_is_pending() {
        assert_eq!(transaction_state(None), TransactionState::Pending);
    }

    #[test]
    fn test_processed_but_unconfirmed_is_pending() {
        assert_eq!(transaction_state(Some((None, false))), TransactionState::Pending);
    }

    #[test]
    fn test_confirmed_without_error_is_success() {
        assert_eq!(transaction_state(Some((None, true))), TransactionState::Success);
    }

    #[test]
    fn test_error_is_failed_at_any_commitment() {
        let reason = "Error processing Instruction 0: custom program error: 0x1773".to_string();
        for landed in [false, true] {
            assert_eq!(
                transaction_state(Some((Some(reason.clone()), landed))),
                TransactionState::Failed(reason.clone())
            );
        }
    }
}
