//! Account decoding for the LSD program and the native stake program.
//!
//! LSD accounts are Anchor accounts: an 8-byte discriminator followed by the
//! borsh encoding of the account struct. Stake accounts and the stake history
//! sysvar use the stake program's bincode layouts.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use solana_stake_interface::{
    stake_history::StakeHistory,
    state::{Delegation, Stake, StakeStateV2},
};

use crate::error::{GatewayError, RelayResult};
use crate::gateway::models::{EraProcessData, StackView, StakeActivationState, StakeManagerView};

pub const DISCRIMINATOR_LEN: usize = 8;

/// Anchor discriminator: first 8 bytes of sha256("<namespace>:<name>")
pub fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default)]
pub struct EraRateRecord {
    pub era: u64,
    pub rate: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default)]
pub struct EraProcessDataRecord {
    pub need_bond: u64,
    pub need_unbond: u64,
    pub old_active: u64,
    pub new_active: u64,
    pub pending_stake_accounts: Vec<[u8; 32]>,
}

/// On-chain layout of the `StakeManager` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default)]
pub struct StakeManagerRecord {
    pub admin: [u8; 32],
    pub balancer: [u8; 32],
    pub stack: [u8; 32],
    pub lsd_token_mint: [u8; 32],
    pub pool_seed_bump: u8,
    pub rent_exempt_for_pool_acc: u64,
    pub min_stake_amount: u64,
    pub platform_fee_commission: u64,
    pub stack_fee_commission: u64,
    pub rate_change_limit: u64,
    pub stake_accounts_len_limit: u64,
    pub split_accounts_len_limit: u64,
    pub unbonding_duration: u64,
    pub latest_era: u64,
    pub rate: u64,
    pub era_bond: u64,
    pub era_unbond: u64,
    pub active: u64,
    pub total_platform_fee: u64,
    pub validators: Vec<[u8; 32]>,
    pub stake_accounts: Vec<[u8; 32]>,
    pub split_accounts: Vec<[u8; 32]>,
    pub era_rates: Vec<EraRateRecord>,
    pub era_process_data: EraProcessDataRecord,
}

/// On-chain layout of the `Stack` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default)]
pub struct StackRecord {
    pub admin: [u8; 32],
    pub stack_fee_commission: u64,
    pub entrusted_stake_managers: Vec<[u8; 32]>,
}

fn keys(raw: Vec<[u8; 32]>) -> Vec<Pubkey> {
    raw.into_iter().map(Pubkey::new_from_array).collect()
}

fn decode_anchor<T: BorshDeserialize>(address: &Pubkey, name: &str, data: &[u8]) -> RelayResult<T> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(GatewayError::Decode {
            address: *address,
            message: format!("account data too short: {} bytes", data.len()),
        }
        .into());
    }
    if data[..DISCRIMINATOR_LEN] != discriminator("account", name) {
        return Err(GatewayError::Decode {
            address: *address,
            message: format!("not a {} account", name),
        }
        .into());
    }

    // Anchor accounts may carry trailing padding, so read without requiring EOF
    let mut body = &data[DISCRIMINATOR_LEN..];
    T::deserialize(&mut body).map_err(|e| {
        GatewayError::Decode {
            address: *address,
            message: e.to_string(),
        }
        .into()
    })
}

pub fn decode_stake_manager(address: &Pubkey, data: &[u8]) -> RelayResult<StakeManagerView> {
    let record: StakeManagerRecord = decode_anchor(address, "StakeManager", data)?;

    Ok(StakeManagerView {
        admin: Pubkey::new_from_array(record.admin),
        stack: Pubkey::new_from_array(record.stack),
        lsd_token_mint: Pubkey::new_from_array(record.lsd_token_mint),
        platform_fee_commission: record.platform_fee_commission,
        latest_era: record.latest_era,
        rate: record.rate,
        era_bond: record.era_bond,
        era_unbond: record.era_unbond,
        active: record.active,
        validators: keys(record.validators),
        stake_accounts: keys(record.stake_accounts),
        split_accounts: keys(record.split_accounts),
        era_process_data: EraProcessData {
            need_bond: record.era_process_data.need_bond,
            need_unbond: record.era_process_data.need_unbond,
            old_active: record.era_process_data.old_active,
            new_active: record.era_process_data.new_active,
            pending_stake_accounts: keys(record.era_process_data.pending_stake_accounts),
        },
    })
}

pub fn decode_stack(address: &Pubkey, data: &[u8]) -> RelayResult<StackView> {
    let record: StackRecord = decode_anchor(address, "Stack", data)?;

    Ok(StackView {
        admin: Pubkey::new_from_array(record.admin),
        entrusted_stake_managers: keys(record.entrusted_stake_managers),
    })
}

/// Decode a stake account; `None` when the account holds no delegation
pub fn decode_stake_account(address: &Pubkey, data: &[u8]) -> RelayResult<Option<Stake>> {
    let state: StakeStateV2 = bincode::deserialize(data).map_err(|e| GatewayError::Decode {
        address: *address,
        message: format!("invalid stake account: {}", e),
    })?;
    Ok(state.stake())
}

/// Decode the `SysvarStakeHistory` account
pub fn decode_stake_history(address: &Pubkey, data: &[u8]) -> RelayResult<StakeHistory> {
    bincode::deserialize(data).map_err(|e| {
        GatewayError::Decode {
            address: *address,
            message: format!("invalid stake history: {}", e),
        }
        .into()
    })
}

/// Activation state at `current_epoch`, with warmup and cooldown limited by the
/// cluster stake history.
///
/// Inactive only once no stake is effective or cooling down; Active only once nothing
/// is still warming up.
pub fn activation_state(
    delegation: Option<&Delegation>,
    current_epoch: u64,
    history: &StakeHistory,
    new_rate_activation_epoch: Option<u64>,
) -> StakeActivationState {
    let Some(delegation) = delegation else {
        return StakeActivationState::Inactive;
    };

    let status = delegation.stake_activating_and_deactivating(current_epoch, history, new_rate_activation_epoch);
    if status.deactivating > 0 {
        StakeActivationState::Deactivating
    } else if status.activating > 0 {
        StakeActivationState::Activating
    } else if status.effective > 0 {
        StakeActivationState::Active
    } else {
        StakeActivationState::Inactive
    }
}
