use solana_sdk::pubkey::Pubkey;

/// In-progress era bookkeeping embedded in a stake manager.
///
/// The program only ever populates one stage at a time: bond/unbond amounts first,
/// then the pending activation list, then the old/new active pair used for the rate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EraProcessData {
    pub need_bond: u64,
    pub need_unbond: u64,
    pub old_active: u64,
    pub new_active: u64,
    pub pending_stake_accounts: Vec<Pubkey>,
}

impl EraProcessData {
    /// No era stage is in flight
    pub fn is_empty(&self) -> bool {
        self.need_bond == 0
            && self.need_unbond == 0
            && self.new_active == 0
            && self.old_active == 0
            && self.pending_stake_accounts.is_empty()
    }

    pub fn need_bond(&self) -> bool {
        self.need_bond > 0
    }

    /// Bond amount too small to open a delegation with
    pub fn need_skip_bond(&self, min_delegation: u64) -> bool {
        self.need_bond > 0 && self.need_bond < min_delegation
    }

    pub fn need_unbond(&self) -> bool {
        self.need_unbond > 0
    }

    pub fn need_update_active(&self) -> bool {
        self.need_unbond == 0 && self.need_bond == 0 && !self.pending_stake_accounts.is_empty()
    }

    pub fn need_update_rate(&self) -> bool {
        self.need_unbond == 0
            && self.need_bond == 0
            && self.pending_stake_accounts.is_empty()
            && self.new_active != 0
            && self.old_active != 0
    }
}

/// Snapshot of a stake manager account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeManagerView {
    pub admin: Pubkey,
    pub stack: Pubkey,
    pub lsd_token_mint: Pubkey,
    pub platform_fee_commission: u64,
    pub latest_era: u64,
    pub rate: u64,
    pub era_bond: u64,
    pub era_unbond: u64,
    pub active: u64,
    pub validators: Vec<Pubkey>,
    pub stake_accounts: Vec<Pubkey>,
    pub split_accounts: Vec<Pubkey>,
    pub era_process_data: EraProcessData,
}

/// Snapshot of the parent stack account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackView {
    pub admin: Pubkey,
    pub entrusted_stake_managers: Vec<Pubkey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeActivationState {
    Active,
    Inactive,
    Activating,
    Deactivating,
}

/// Delegation details of a stake account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegationInfo {
    pub voter: Pubkey,
    pub credits_observed: u64,
    pub lamports: u64,
    pub stake: u64,
}

/// Status of a submitted transaction as last reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    Success,
    Failed(String),
}
