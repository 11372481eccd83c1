//! Era lifecycle handlers.
//!
//! Every handler re-reads the stake manager, returns early when its stage is not
//! due, otherwise submits one transaction per unit of work and waits for it. When
//! the confirmation budget runs out the handler checks the ledger for the effect
//! instead of resubmitting.

mod active;
mod cleanup;
mod era;

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::info;

use crate::{
    error::RelayResult,
    task::{Confirmation, HandlerContext},
};

pub use active::{EraUpdateActive, EraUpdateRate};
pub use cleanup::{EraMerge, EraWithdraw};
pub use era::{EraBond, EraNew, EraSkipBond, EraUnbond};

#[async_trait]
pub trait EraHandler: Send + Sync {
    /// Stable name used in logs and registry lookups
    fn name(&self) -> &'static str;

    /// Drive this handler's stage for one stake manager
    async fn handle(&self, ctx: &HandlerContext, stake_manager: &Pubkey) -> RelayResult<()>;
}

/// Turn an unknown confirmation into success when the effect is visible on chain.
///
/// `observed` is only evaluated for [`Confirmation::Unknown`].
pub(crate) async fn settle<F, Fut>(
    handler: &'static str,
    signature: &Signature,
    confirmation: Confirmation,
    observed: F,
) -> RelayResult<()>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = RelayResult<bool>>,
{
    match confirmation {
        Confirmation::Confirmed => Ok(()),
        Confirmation::Unknown(err) => {
            if observed().await? {
                info!(handler, %signature, "confirmation timed out but effect observed on chain");
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}
