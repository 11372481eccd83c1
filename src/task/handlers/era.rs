use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::info;

use crate::{
    error::{RelayError, RelayResult},
    gateway::StakeManagerView,
    program,
    task::{handlers::settle, HandlerContext},
};

use super::EraHandler;

/// A new era can start once the ledger epoch passed the last era and no stage is in flight
pub fn new_era_due(view: &StakeManagerView, epoch: u64) -> bool {
    epoch > view.latest_era && view.era_process_data.is_empty()
}

pub struct EraNew;

#[async_trait]
impl EraHandler for EraNew {
    fn name(&self) -> &'static str {
        "EraNew"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let epoch = ctx.gateway.get_current_epoch().await?;
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;
        if !new_era_due(&view, epoch) {
            return Ok(());
        }

        let ix = program::era_new(&ctx.program_id, stake_manager);
        let signature = ctx.send(&[ix], &[]).await?;
        info!(
            %stake_manager,
            %signature,
            new_era = view.latest_era + 1,
            era_bond = view.era_bond,
            era_unbond = view.era_unbond,
            "EraNew tx sent"
        );

        let confirmation = ctx.confirm(&signature).await?;
        settle(self.name(), &signature, confirmation, move || async move {
            let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
            Ok(latest.latest_era > view.latest_era)
        })
        .await?;

        info!(%stake_manager, "EraNew success");
        Ok(())
    }
}

pub struct EraBond;

#[async_trait]
impl EraHandler for EraBond {
    fn name(&self) -> &'static str {
        "EraBond"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;
        if !view.era_process_data.need_bond() {
            return Ok(());
        }

        let validator = view.validators.first().ok_or_else(|| RelayError::InvalidState {
            stake_manager: *stake_manager,
            reason: "bond pending but no validator registered".to_string(),
        })?;
        let stake_pool = program::stake_pool_address(&ctx.program_id, stake_manager);
        let stake_account = Keypair::new();

        let ix = program::era_bond(
            &ctx.program_id,
            stake_manager,
            validator,
            &stake_pool,
            &stake_account.pubkey(),
            &ctx.fee_payer_pubkey(),
        );
        let signature = ctx.send(&[ix], &[&stake_account]).await?;
        info!(
            %stake_manager,
            %signature,
            stake_account = %stake_account.pubkey(),
            bond = view.era_process_data.need_bond,
            "EraBond tx sent"
        );

        let confirmation = ctx.confirm(&signature).await?;
        settle(self.name(), &signature, confirmation, move || async move {
            let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
            Ok(!latest.era_process_data.need_bond())
        })
        .await?;

        info!(%stake_manager, "EraBond success");
        Ok(())
    }
}

/// Clears a bond amount below the minimum delegation. Built but not part of the
/// registered lifecycle.
pub struct EraSkipBond;

#[async_trait]
impl EraHandler for EraSkipBond {
    fn name(&self) -> &'static str {
        "EraSkipBond"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;
        let min_delegation = ctx.gateway.get_minimum_delegation().await?;
        if !view.era_process_data.need_skip_bond(min_delegation) {
            return Ok(());
        }

        let ix = program::era_skip_bond(&ctx.program_id, stake_manager);
        let signature = ctx.send(&[ix], &[]).await?;
        info!(
            %stake_manager,
            %signature,
            skip_bond = view.era_process_data.need_bond,
            min_delegation,
            "EraSkipBond tx sent"
        );

        let confirmation = ctx.confirm(&signature).await?;
        settle(self.name(), &signature, confirmation, move || async move {
            let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
            Ok(!latest.era_process_data.need_skip_bond(min_delegation))
        })
        .await?;

        info!(%stake_manager, "EraSkipBond success");
        Ok(())
    }
}

/// Splits the unbond amount off the first stake account, one split per round
pub struct EraUnbond;

#[async_trait]
impl EraHandler for EraUnbond {
    fn name(&self) -> &'static str {
        "EraUnbond"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;
        if !view.era_process_data.need_unbond() {
            return Ok(());
        }

        let stake_account = view.stake_accounts.first().ok_or_else(|| RelayError::InvalidState {
            stake_manager: *stake_manager,
            reason: "unbond pending but no stake account to split".to_string(),
        })?;
        let delegation = ctx.gateway.get_stake_delegation(stake_account).await?;
        let stake_pool = program::stake_pool_address(&ctx.program_id, stake_manager);
        let split_account = Keypair::new();

        let ix = program::era_unbond(
            &ctx.program_id,
            stake_manager,
            &stake_pool,
            stake_account,
            &split_account.pubkey(),
            &delegation.voter,
            &ctx.fee_payer_pubkey(),
        );
        let signature = ctx.send(&[ix], &[&split_account]).await?;
        let need_unbond = view.era_process_data.need_unbond;
        info!(
            %stake_manager,
            %signature,
            split_account = %split_account.pubkey(),
            unbond = need_unbond,
            "EraUnbond tx sent"
        );

        let confirmation = ctx.confirm(&signature).await?;
        settle(self.name(), &signature, confirmation, move || async move {
            let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
            Ok(latest.era_process_data.need_unbond < need_unbond)
        })
        .await?;

        info!(%stake_manager, "EraUnbond success");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::Delivery;
    use crate::gateway::{DelegationInfo, EraProcessData};
    use crate::task::handlers::tests::{sent_lsd_instructions, setup};

    #[tokio::test]
    async fn test_era_new_noop_when_era_current() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData::default());
        // fake epoch equals latest_era
        EraNew.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(gateway.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_era_new_noop_while_stage_in_flight() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_bond: 1_000,
            ..Default::default()
        });
        gateway.with_state(|s| s.epoch = 601);
        EraNew.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(gateway.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_era_new_submits_when_epoch_advanced() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData::default());
        gateway.with_state(|s| s.epoch = 601);
        EraNew.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(sent_lsd_instructions(&gateway), vec!["era_new"]);
    }

    #[tokio::test]
    async fn test_era_new_reconciles_lost_confirmation() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData::default());
        gateway.with_state(|s| {
            s.epoch = 601;
            s.delivery = Delivery::Lost;
        });
        gateway.on_submit(move |state, _| {
            if let Some(view) = state.stake_managers.get_mut(&stake_manager) {
                view.latest_era += 1;
            }
        });

        EraNew.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(gateway.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_era_new_lost_without_effect_fails() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData::default());
        gateway.with_state(|s| {
            s.epoch = 601;
            s.delivery = Delivery::Lost;
        });

        let err = EraNew.handle(&ctx, &stake_manager).await.unwrap_err();
        assert!(err.is_confirmation_exhausted());
        assert_eq!(gateway.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_era_bond_uses_first_validator_and_fresh_stake_account() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_bond: 1_000,
            ..Default::default()
        });
        let validator = gateway.stake_manager(&stake_manager).validators[0];

        EraBond.handle(&ctx, &stake_manager).await.unwrap();

        let sent = gateway.sent_instructions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1[0], stake_manager);
        assert_eq!(sent[0].1[1], validator);
        let tx = gateway.with_state(|s| s.submitted[0].clone());
        assert_eq!(tx.signatures.len(), 2);
    }

    #[tokio::test]
    async fn test_era_bond_without_validator_is_invalid_state() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_bond: 1_000,
            ..Default::default()
        });
        gateway.with_state(|s| s.stake_managers.get_mut(&stake_manager).unwrap().validators.clear());

        let err = EraBond.handle(&ctx, &stake_manager).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidState { .. }));
        assert_eq!(gateway.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_era_bond_reconciles_lost_confirmation() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_bond: 1_000,
            ..Default::default()
        });
        gateway.with_state(|s| s.delivery = Delivery::Lost);
        gateway.on_submit(move |state, _| {
            let view = state.stake_managers.get_mut(&stake_manager).unwrap();
            view.era_process_data.need_bond = 0;
        });

        EraBond.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(gateway.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_era_bond_on_chain_failure_is_not_reconciled() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_bond: 1_000,
            ..Default::default()
        });
        gateway.with_state(|s| s.delivery = Delivery::Reverted("insufficient funds".to_string()));
        gateway.on_submit(move |state, _| {
            state.stake_managers.get_mut(&stake_manager).unwrap().era_process_data.need_bond = 0;
        });

        let err = EraBond.handle(&ctx, &stake_manager).await.unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn test_skip_bond_only_below_minimum_delegation() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_bond: 2_000_000_000,
            ..Default::default()
        });
        EraSkipBond.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(gateway.submitted_count(), 0);

        gateway.with_state(|s| {
            s.stake_managers.get_mut(&stake_manager).unwrap().era_process_data.need_bond = 1_000;
        });
        EraSkipBond.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(sent_lsd_instructions(&gateway), vec!["era_skip_bond"]);
    }

    #[tokio::test]
    async fn test_era_unbond_splits_first_stake_account() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_unbond: 5_000,
            ..Default::default()
        });
        let stake_account = Pubkey::new_unique();
        let voter = Pubkey::new_unique();
        gateway.with_state(|s| {
            s.stake_managers.get_mut(&stake_manager).unwrap().stake_accounts = vec![stake_account, Pubkey::new_unique()];
            s.delegations.insert(
                stake_account,
                DelegationInfo {
                    voter,
                    credits_observed: 10,
                    lamports: 10_000_000_000,
                    stake: 9_997_717_120,
                },
            );
        });

        EraUnbond.handle(&ctx, &stake_manager).await.unwrap();

        let sent = gateway.sent_instructions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1[2], stake_account);
        assert_eq!(sent[0].1[4], voter);
    }

    #[tokio::test]
    async fn test_era_unbond_reconciles_on_decrease() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_unbond: 5_000,
            ..Default::default()
        });
        let stake_account = Pubkey::new_unique();
        gateway.with_state(|s| {
            s.delivery = Delivery::Lost;
            s.stake_managers.get_mut(&stake_manager).unwrap().stake_accounts = vec![stake_account];
            s.delegations.insert(
                stake_account,
                DelegationInfo {
                    voter: Pubkey::new_unique(),
                    credits_observed: 10,
                    lamports: 10_000_000_000,
                    stake: 9_997_717_120,
                },
            );
        });
        gateway.on_submit(move |state, _| {
            state.stake_managers.get_mut(&stake_manager).unwrap().era_process_data.need_unbond = 2_000;
        });

        EraUnbond.handle(&ctx, &stake_manager).await.unwrap();
        assert_eq!(gateway.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_era_unbond_lost_without_decrease_fails() {
        let (gateway, ctx, stake_manager) = setup(EraProcessData {
            need_unbond: 5_000,
            ..Default::default()
        });
        let stake_account = Pubkey::new_unique();
        gateway.with_state(|s| {
            s.delivery = Delivery::Lost;
            s.stake_managers.get_mut(&stake_manager).unwrap().stake_accounts = vec![stake_account];
            s.delegations.insert(
                stake_account,
                DelegationInfo {
                    voter: Pubkey::new_unique(),
                    credits_observed: 10,
                    lamports: 10_000_000_000,
                    stake: 9_997_717_120,
                },
            );
        });

        let err = EraUnbond.handle(&ctx, &stake_manager).await.unwrap_err();
        assert!(err.is_confirmation_exhausted());
        assert_eq!(gateway.submitted_count(), 1);
        assert_eq!(gateway.stake_manager(&stake_manager).era_process_data.need_unbond, 5_000);
    }
}
