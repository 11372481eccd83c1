//! Read-only stake manager report for operators.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::{
    error::RelayResult,
    gateway::{EraProcessData, LedgerGateway, StakeManagerView},
    program,
};

#[derive(Debug, Clone, Serialize)]
pub struct EraProcessDataReport {
    pub need_bond: u64,
    pub need_unbond: u64,
    pub old_active: u64,
    pub new_active: u64,
    pub pending_stake_accounts: Vec<String>,
}

/// Stake manager state plus its derived stake pool, with addresses in base58
#[derive(Debug, Clone, Serialize)]
pub struct StakeManagerReport {
    pub lsd_program_id: String,
    pub stake_manager: String,
    pub stake_pool: String,
    pub admin: String,
    pub stack: String,
    pub lsd_token_mint: String,
    pub platform_fee_commission: u64,
    pub latest_era: u64,
    pub rate: u64,
    pub era_bond: u64,
    pub era_unbond: u64,
    pub active: u64,
    pub validators: Vec<String>,
    pub stake_accounts: Vec<String>,
    pub split_accounts: Vec<String>,
    pub era_process_data: EraProcessDataReport,
}

fn base58(keys: &[Pubkey]) -> Vec<String> {
    keys.iter().map(Pubkey::to_string).collect()
}

impl From<&EraProcessData> for EraProcessDataReport {
    fn from(data: &EraProcessData) -> Self {
        Self {
            need_bond: data.need_bond,
            need_unbond: data.need_unbond,
            old_active: data.old_active,
            new_active: data.new_active,
            pending_stake_accounts: base58(&data.pending_stake_accounts),
        }
    }
}

impl StakeManagerReport {
    pub fn new(program_id: &Pubkey, stake_manager: &Pubkey, view: &StakeManagerView) -> Self {
        Self {
            lsd_program_id: program_id.to_string(),
            stake_manager: stake_manager.to_string(),
            stake_pool: program::stake_pool_address(program_id, stake_manager).to_string(),
            admin: view.admin.to_string(),
            stack: view.stack.to_string(),
            lsd_token_mint: view.lsd_token_mint.to_string(),
            platform_fee_commission: view.platform_fee_commission,
            latest_era: view.latest_era,
            rate: view.rate,
            era_bond: view.era_bond,
            era_unbond: view.era_unbond,
            active: view.active,
            validators: base58(&view.validators),
            stake_accounts: base58(&view.stake_accounts),
            split_accounts: base58(&view.split_accounts),
            era_process_data: (&view.era_process_data).into(),
        }
    }
}

/// Fetch one stake manager and describe it; submits nothing
pub async fn stake_manager_report(
    gateway: &dyn LedgerGateway,
    program_id: &Pubkey,
    stake_manager: &Pubkey,
) -> RelayResult<StakeManagerReport> {
    let view = gateway.get_stake_manager(stake_manager).await?;
    Ok(StakeManagerReport::new(program_id, stake_manager, &view))
}
