use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tokio::time::Duration;

use crate::{
    error::{RelayError, RelayResult},
    task::{ConfirmPolicy, SchedulerConfig},
};

pub const CONFIG_PATH_ENV: &str = "LSD_RELAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";
const ENV_PREFIX: &str = "LSD_RELAY";

/// Raw relay configuration as read from the config file and environment
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub endpoint_list: Vec<String>,
    pub keystore_path: String,
    pub lsd_program_id: String,
    pub stack_address: String,
    /// Manage only this stake manager; when unset every entrusted one is managed
    #[serde(default)]
    pub stake_manager_address: Option<String>,
    pub fee_payer_account: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory receiving the daily-rotated `relay.*` log files
    #[serde(default = "default_log_file_path")]
    pub log_file_path: String,
    #[serde(default = "default_round_interval_secs")]
    pub round_interval_secs: u64,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_confirm_interval_secs")]
    pub confirm_interval_secs: u64,
    #[serde(default = "default_confirm_max_attempts")]
    pub confirm_max_attempts: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file_path() -> String {
    "./log_data".to_string()
}

fn default_round_interval_secs() -> u64 {
    30
}

fn default_retry_interval_secs() -> u64 {
    6
}

fn default_max_consecutive_failures() -> u32 {
    200
}

fn default_confirm_interval_secs() -> u64 {
    6
}

fn default_confirm_max_attempts() -> u32 {
    50
}

/// Validated configuration the relay runs with
#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub stack: Pubkey,
    pub stake_manager: Option<Pubkey>,
    pub fee_payer: Pubkey,
    pub keystore_path: PathBuf,
    pub scheduler: SchedulerConfig,
    pub confirm: ConfirmPolicy,
}

impl Config {
    /// Load the file at `path`, overridden by `LSD_RELAY__*` environment variables
    pub fn load(path: &Path) -> RelayResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading overrides from `env` instead of the process
    /// environment when given
    fn load_with_env(path: &Path, env: Option<config::Map<String, String>>) -> RelayResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("endpoint_list")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> RelayResult<Settings> {
        let rpc_url = self
            .endpoint_list
            .iter()
            .map(|endpoint| endpoint.trim())
            .find(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| RelayError::Config("endpoint_list must contain at least one endpoint".to_string()))?
            .to_string();

        if self.max_consecutive_failures == 0 {
            return Err(RelayError::Config("max_consecutive_failures must be at least 1".to_string()));
        }
        if self.confirm_max_attempts == 0 {
            return Err(RelayError::Config("confirm_max_attempts must be at least 1".to_string()));
        }

        let stake_manager = self
            .stake_manager_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(|address| parse_pubkey("stake_manager_address", address))
            .transpose()?;

        Ok(Settings {
            rpc_url,
            program_id: parse_pubkey("lsd_program_id", &self.lsd_program_id)?,
            stack: parse_pubkey("stack_address", &self.stack_address)?,
            stake_manager,
            fee_payer: parse_pubkey("fee_payer_account", &self.fee_payer_account)?,
            keystore_path: PathBuf::from(&self.keystore_path),
            scheduler: SchedulerConfig {
                round_interval: Duration::from_secs(self.round_interval_secs),
                retry_interval: Duration::from_secs(self.retry_interval_secs),
                max_consecutive_failures: self.max_consecutive_failures,
            },
            confirm: ConfirmPolicy {
                interval: Duration::from_secs(self.confirm_interval_secs),
                max_attempts: self.confirm_max_attempts,
            },
        })
    }
}

fn parse_pubkey(field: &'static str, value: &str) -> RelayResult<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| RelayError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}
