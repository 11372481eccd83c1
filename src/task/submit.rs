use std::time::Duration;

use solana_sdk::{
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tracing::debug;

use crate::{
    error::{GatewayError, RelayError, RelayResult},
    gateway::TransactionState,
    task::HandlerContext,
};

/// Bounded confirmation polling: fixed interval, fixed attempt ceiling
#[derive(Debug, Clone, Copy)]
pub struct ConfirmPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6),
            max_attempts: 50,
        }
    }
}

/// Result of waiting on a submitted transaction
#[derive(Debug)]
pub enum Confirmation {
    Confirmed,
    /// Polling ran out before the ledger reported a status; the caller has to
    /// check the effect itself. Carries the error to surface if it is not observed.
    Unknown(RelayError),
}

impl HandlerContext {
    pub fn fee_payer_pubkey(&self) -> Pubkey {
        self.fee_payer.pubkey()
    }

    /// Sign with the fee payer plus `extra_signers` against a fresh blockhash and submit
    pub async fn send(&self, instructions: &[Instruction], extra_signers: &[&Keypair]) -> RelayResult<Signature> {
        let blockhash = self.gateway.get_latest_blockhash().await?;

        let mut signers: Vec<&Keypair> = Vec::with_capacity(extra_signers.len() + 1);
        signers.push(self.fee_payer.as_ref());
        signers.extend_from_slice(extra_signers);

        let message = Message::new(instructions, Some(&self.fee_payer.pubkey()));
        let mut transaction = Transaction::new_unsigned(message);
        transaction
            .try_sign(signers.as_slice(), blockhash)
            .map_err(|e| GatewayError::Submit(format!("signing failed: {}", e)))?;

        self.gateway.send_transaction(&transaction).await
    }

    /// Poll the transaction status until it lands, fails, or the attempt budget runs out
    pub async fn confirm(&self, signature: &Signature) -> RelayResult<Confirmation> {
        let mut attempts = 0u32;
        loop {
            if attempts >= self.confirm.max_attempts {
                let err = GatewayError::ConfirmationExhausted {
                    signature: signature.to_string(),
                    attempts,
                };
                return Ok(Confirmation::Unknown(err.into()));
            }

            match self.gateway.get_transaction_status(signature).await {
                Ok(TransactionState::Success) => return Ok(Confirmation::Confirmed),
                Ok(TransactionState::Failed(reason)) => {
                    return Err(GatewayError::OnChain {
                        signature: signature.to_string(),
                        reason,
                    }
                    .into());
                }
                Ok(TransactionState::Pending) => {
                    debug!(%signature, attempts, "tx not confirmed yet");
                }
                Err(e) => {
                    debug!(%signature, error = %e, "query tx failed");
                }
            }

            attempts += 1;
            tokio::time::sleep(self.confirm.interval).await;
        }
    }
}
