use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::{
    error::RelayResult,
    program,
    task::{Confirmation, HandlerContext},
};

use super::{settle, EraHandler};

/// Folds each pending stake account's stake into the era's new active total,
/// always working on the head of the pending list
pub struct EraUpdateActive;

#[async_trait]
impl EraHandler for EraUpdateActive {
    fn name(&self) -> &'static str {
        "EraUpdateActive"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        loop {
            let view = ctx.gateway.get_stake_manager(stake_manager).await?;
            let data = &view.era_process_data;
            if !data.need_update_active() {
                return Ok(());
            }

            let stake_account = data.pending_stake_accounts[0];
            let delegation = ctx.gateway.get_stake_delegation(&stake_account).await?;

            let ix = program::era_update_active(&ctx.program_id, stake_manager, &stake_account);
            let signature = ctx.send(&[ix], &[]).await?;
            info!(
                %stake_manager,
                %signature,
                %stake_account,
                stake_account_active = delegation.stake,
                old_active = data.old_active,
                new_active = data.new_active,
                new_active_after = data.new_active.saturating_add(delegation.stake),
                "EraUpdateActive tx sent"
            );

            match ctx.confirm(&signature).await? {
                Confirmation::Confirmed => {}
                Confirmation::Unknown(err) => {
                    let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
                    let pending = &latest.era_process_data;
                    if !pending.need_update_active() {
                        info!(%stake_manager, %signature, "EraUpdateActive effect observed on chain");
                        return Ok(());
                    }
                    if pending.pending_stake_accounts[0] == stake_account {
                        return Err(err);
                    }
                    info!(%stake_manager, %signature, "EraUpdateActive head moved on, effect observed on chain");
                }
            }

            info!(%stake_manager, %stake_account, "EraUpdateActive success");
        }
    }
}

/// Settles the exchange rate once the era's new active total is known, creating
/// missing fee recipient token accounts in the same transaction
pub struct EraUpdateRate;

#[async_trait]
impl EraHandler for EraUpdateRate {
    fn name(&self) -> &'static str {
        "EraUpdateRate"
    }

    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()> {
        let view = ctx.gateway.get_stake_manager(stake_manager).await?;
        if !view.era_process_data.need_update_rate() {
            return Ok(());
        }
        let stack = ctx.gateway.get_stack(&view.stack).await?;

        let mint = view.lsd_token_mint;
        let fee_payer = ctx.fee_payer_pubkey();
        let stake_pool = program::stake_pool_address(&ctx.program_id, stake_manager);
        let platform_fee_recipient = program::fee_recipient_address(&view.admin, &mint);
        let stack_fee_recipient = program::fee_recipient_address(&stack.admin, &mint);
        let stack_fee_account = program::stack_fee_account_address(&ctx.program_id, &view.stack, &mint);

        let mut instructions = Vec::with_capacity(3);
        if !ctx.gateway.token_account_exists(&platform_fee_recipient).await? {
            debug!(%stake_manager, recipient = %platform_fee_recipient, "creating platform fee recipient");
            instructions.push(program::create_fee_recipient(&fee_payer, &view.admin, &mint));
        }
        if stack_fee_recipient != platform_fee_recipient
            && !ctx.gateway.token_account_exists(&stack_fee_recipient).await?
        {
            debug!(%stake_manager, recipient = %stack_fee_recipient, "creating stack fee recipient");
            instructions.push(program::create_fee_recipient(&fee_payer, &stack.admin, &mint));
        }
        instructions.push(program::era_update_rate(
            &ctx.program_id,
            stake_manager,
            &view.stack,
            &stake_pool,
            &mint,
            &platform_fee_recipient,
            &stack_fee_recipient,
            &stack_fee_account,
        ));

        let signature = ctx.send(&instructions, &[]).await?;
        info!(
            %stake_manager,
            %signature,
            pipeline_active = view.active,
            old_active = view.era_process_data.old_active,
            new_active = view.era_process_data.new_active,
            old_rate = view.rate,
            platform_fee_commission = view.platform_fee_commission,
            "EraUpdateRate tx sent"
        );

        let confirmation = ctx.confirm(&signature).await?;
        settle(self.name(), &signature, confirmation, move || async move {
            let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
            Ok(!latest.era_process_data.need_update_rate())
        })
        .await?;

        let latest = ctx.gateway.get_stake_manager(stake_manager).await?;
        info!(%stake_manager, new_rate = latest.rate, "EraUpdateRate success");
        Ok(())
    }
}
