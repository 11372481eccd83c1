//! Scripted in-memory gateway used by the handler and scheduler tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use crate::{
    error::{GatewayError, RelayResult},
    gateway::{
        DelegationInfo, EraProcessData, LedgerGateway, StackView, StakeActivationState,
        StakeManagerView, TransactionState,
    },
};

/// How submitted transactions are reported back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Confirmed,
    /// Status never becomes known
    Lost,
    Reverted(String),
}

pub struct FakeState {
    pub epoch: u64,
    pub min_delegation: u64,
    pub stake_managers: HashMap<Pubkey, StakeManagerView>,
    pub stacks: HashMap<Pubkey, StackView>,
    pub activations: HashMap<Pubkey, StakeActivationState>,
    pub delegations: HashMap<Pubkey, DelegationInfo>,
    pub token_accounts: HashSet<Pubkey>,
    pub delivery: Delivery,
    pub fail_reads: bool,
    pub submitted: Vec<Transaction>,
    pub status_queries: usize,
}

type SubmitHook = Box<dyn FnMut(&mut FakeState, &Transaction) + Send>;

pub struct FakeGateway {
    state: Mutex<FakeState>,
    on_submit: Mutex<Option<SubmitHook>>,
}

pub fn stake_manager_view(era_process_data: EraProcessData) -> StakeManagerView {
    StakeManagerView {
        admin: Pubkey::new_unique(),
        stack: Pubkey::new_unique(),
        lsd_token_mint: Pubkey::new_unique(),
        platform_fee_commission: 100_000_000,
        latest_era: 600,
        rate: 1_000_000_000,
        era_bond: 0,
        era_unbond: 0,
        active: 10_000_000_000,
        validators: vec![Pubkey::new_unique()],
        stake_accounts: vec![],
        split_accounts: vec![],
        era_process_data,
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                epoch: 600,
                min_delegation: 1_000_000_000,
                stake_managers: HashMap::new(),
                stacks: HashMap::new(),
                activations: HashMap::new(),
                delegations: HashMap::new(),
                token_accounts: HashSet::new(),
                delivery: Delivery::Confirmed,
                fail_reads: false,
                submitted: vec![],
                status_queries: 0,
            }),
            on_submit: Mutex::new(None),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut *self.state.lock())
    }

    pub fn insert_stake_manager(&self, address: Pubkey, view: StakeManagerView) {
        self.state.lock().stake_managers.insert(address, view);
    }

    pub fn stake_manager(&self, address: &Pubkey) -> StakeManagerView {
        self.state.lock().stake_managers[address].clone()
    }

    /// Apply on-chain effects when a transaction is submitted
    pub fn on_submit(&self, hook: impl FnMut(&mut FakeState, &Transaction) + Send + 'static) {
        *self.on_submit.lock() = Some(Box::new(hook));
    }

    pub fn submitted_count(&self) -> usize {
        self.state.lock().submitted.len()
    }

    /// (instruction data, instruction accounts) for every submitted instruction, in order
    pub fn sent_instructions(&self) -> Vec<(Vec<u8>, Vec<Pubkey>)> {
        let state = self.state.lock();
        state
            .submitted
            .iter()
            .flat_map(|tx| {
                tx.message.instructions.iter().map(move |ix| {
                    let accounts = ix
                        .accounts
                        .iter()
                        .map(|index| tx.message.account_keys[*index as usize])
                        .collect();
                    (ix.data.clone(), accounts)
                })
            })
            .collect()
    }

    fn check_reads(state: &FakeState) -> RelayResult<()> {
        if state.fail_reads {
            return Err(GatewayError::Rpc("connection refused".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerGateway for FakeGateway {
    async fn get_stake_manager(&self, address: &Pubkey) -> RelayResult<StakeManagerView> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        state
            .stake_managers
            .get(address)
            .cloned()
            .ok_or_else(|| GatewayError::AccountNotFound(*address).into())
    }

    async fn get_stack(&self, address: &Pubkey) -> RelayResult<StackView> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        state
            .stacks
            .get(address)
            .cloned()
            .ok_or_else(|| GatewayError::AccountNotFound(*address).into())
    }

    async fn get_stake_activation(&self, address: &Pubkey) -> RelayResult<StakeActivationState> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        state
            .activations
            .get(address)
            .copied()
            .ok_or_else(|| GatewayError::AccountNotFound(*address).into())
    }

    async fn get_stake_delegation(&self, address: &Pubkey) -> RelayResult<DelegationInfo> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        state
            .delegations
            .get(address)
            .copied()
            .ok_or_else(|| GatewayError::AccountNotFound(*address).into())
    }

    async fn get_minimum_delegation(&self) -> RelayResult<u64> {
        Ok(self.state.lock().min_delegation)
    }

    async fn get_current_epoch(&self) -> RelayResult<u64> {
        Ok(self.state.lock().epoch)
    }

    async fn get_latest_blockhash(&self) -> RelayResult<Hash> {
        Ok(Hash::new_unique())
    }

    async fn token_account_exists(&self, address: &Pubkey) -> RelayResult<bool> {
        Ok(self.state.lock().token_accounts.contains(address))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RelayResult<Signature> {
        let mut state = self.state.lock();
        state.submitted.push(transaction.clone());
        if let Some(hook) = self.on_submit.lock().as_mut() {
            hook(&mut *state, transaction);
        }
        Ok(transaction.signatures[0])
    }

    async fn get_transaction_status(&self, _signature: &Signature) -> RelayResult<TransactionState> {
        let mut state = self.state.lock();
        state.status_queries += 1;
        Ok(match &state.delivery {
            Delivery::Confirmed => TransactionState::Success,
            Delivery::Lost => TransactionState::Pending,
            Delivery::Reverted(reason) => TransactionState::Failed(reason.clone()),
        })
    }
}
