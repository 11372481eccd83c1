use std::collections::HashMap;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::{
    error::RelayResult,
    gateway::{DelegationInfo, StakeActivationState},
    program,
    task::HandlerContext,
};

use super::{settle, EraHandler};

/// One merge transaction: `src` is folded into `dst`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePlan {
    pub src: Pubkey,
    pub dst: Pubkey,
}

/// Group fully active stake accounts by (voter, credits observed) and merge every
/// extra member of a group into its first member.
///
/// Groups and members keep the order in which the accounts were listed.
pub fn plan_merges(accounts: &[(Pubkey, DelegationInfo)]) -> Vec<MergePlan> {
    let mut index: HashMap<(Pubkey, u64), usize> = HashMap::new();
    let mut groups: Vec<Vec<Pubkey>> = Vec::new();

    for (address, delegation) in accounts {
        let key = (delegation.voter, delegation.credits_observed);
        match index.get(&key) {
            Some(&i) => groups[i].push(*address),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![*address]);
            }
        }
    }

    groups
        .iter()
        .filter(|group| group.len() > 1)
        .flat_map(|group| {
            let dst = group[0];
            group[1..].iter().map(move |src| MergePlan { src: *src, dst })
        })
        .collect()
}

pub struct EraMerge;

#[async_trait]
impl EraHandler for EraMerge {
    fn name(&self) -> &'static str {
        "EraMerge"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;
        if !view.era_process_data.is_empty() {
            return Ok(());
        }

        let mut active = Vec::with_capacity(view.stake_accounts.len());
        for stake_account in &view.stake_accounts {
            let state = ctx.gateway.get_stake_activation(stake_account).await?;
            if state != StakeActivationState::Active {
                debug!(%stake_manager, %stake_account, ?state, "stake account not mergeable yet");
                continue;
            }
            let delegation = ctx.gateway.get_stake_delegation(stake_account).await?;
            active.push((*stake_account, delegation));
        }

        let plans = plan_merges(&active);
        if plans.is_empty() {
            return Ok(());
        }
        let stake_pool = program::stake_pool_address(&ctx.program_id, stake_manager);

        for plan in plans {
            let ix = program::era_merge(&ctx.program_id, stake_manager, &plan.src, &plan.dst, &stake_pool);
            let signature = ctx.send(&[ix], &[]).await?;
            info!(%stake_manager, %signature, src = %plan.src, dst = %plan.dst, "EraMerge tx sent");

            let confirmation = ctx.confirm(&signature).await?;
            settle(self.name(), &signature, confirmation, move || async move {
                let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
                let listed = |account: &Pubkey| latest.stake_accounts.contains(account);
                Ok(!listed(&plan.src) || !listed(&plan.dst))
            })
            .await?;

            info!(%stake_manager, src = %plan.src, dst = %plan.dst, "EraMerge success");
        }
        Ok(())
    }
}

/// Withdraws split accounts whose stake has fully cooled down
pub struct EraWithdraw;

#[async_trait]
impl EraHandler for EraWithdraw {
    fn name(&self) -> &'static str {
        "EraWithdraw"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;

        let mut withdrawable = Vec::new();
        for split_account in &view.split_accounts {
            let state = ctx.gateway.get_stake_activation(split_account).await?;
            if state == StakeActivationState::Inactive {
                withdrawable.push(*split_account);
            }
        }
        if withdrawable.is_empty() {
            return Ok(());
        }
        let stake_pool = program::stake_pool_address(&ctx.program_id, stake_manager);

        for stake_account in withdrawable {
            let delegation = ctx.gateway.get_stake_delegation(&stake_account).await?;

            let ix = program::era_withdraw(&ctx.program_id, stake_manager, &stake_pool, &stake_account);
            let signature = ctx.send(&[ix], &[]).await?;
            info!(
                %stake_manager,
                %signature,
                %stake_account,
                withdraw_amount = delegation.lamports,
                "EraWithdraw tx sent"
            );

            let confirmation = ctx.confirm(&signature).await?;
            settle(self.name(), &signature, confirmation, move || async move {
                match ctx.gateway.get_stake_delegation(&stake_account).await {
                    Ok(_) => Ok(false),
                    Err(e) if e.is_account_not_found() => Ok(true),
                    Err(e) => Err(e),
                }
            })
            .await?;

            info!(%stake_manager, %stake_account, "EraWithdraw success");
        }
        Ok(())
    }
}
