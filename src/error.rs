use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Top-level error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Fee payer {0} not found in keystore")]
    FeePayerMissing(String),

    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Stake manager {stake_manager} is in an unexpected state: {reason}")]
    InvalidState { stake_manager: Pubkey, reason: String },

    #[error("Handler {name} failed: {source}")]
    Handler {
        name: &'static str,
        #[source]
        source: Box<RelayError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while talking to the ledger
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Failed to decode account {address}: {message}")]
    Decode { address: Pubkey, message: String },

    #[error("Failed to get blockhash: {0}")]
    Blockhash(String),

    #[error("Send failed: {0}")]
    Submit(String),

    #[error("Transaction {signature} not confirmed after {attempts} attempts")]
    ConfirmationExhausted { signature: String, attempts: u32 },

    #[error("Transaction {signature} failed on chain: {reason}")]
    OnChain { signature: String, reason: String },
}

impl From<solana_client::client_error::ClientError> for GatewayError {
    fn from(error: solana_client::client_error::ClientError) -> Self {
        GatewayError::Rpc(error.to_string())
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        RelayError::Config(error.to_string())
    }
}

impl RelayError {
    /// True when the error only means the transaction status is unknown
    pub fn is_confirmation_exhausted(&self) -> bool {
        match self {
            RelayError::Gateway(GatewayError::ConfirmationExhausted { .. }) => true,
            RelayError::Handler { source, .. } => source.is_confirmation_exhausted(),
            _ => false,
        }
    }

    /// True when the error reports a missing account
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, RelayError::Gateway(GatewayError::AccountNotFound(_)))
    }
}

/// Result type alias for the relay
pub type RelayResult<T> = Result<T, RelayError>;
