//! The relay task: handler context, the era handlers and the loop driving them.

pub mod handlers;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod submit;

use std::sync::Arc;

use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    config::Settings,
    error::{RelayError, RelayResult},
    gateway::LedgerGateway,
    keystore::Keystore,
    shutdown::ShutdownSignal,
};

pub use registry::HandlerRegistry;
pub use resolver::TargetResolver;
pub use scheduler::{LoopExit, Scheduler, SchedulerConfig};
pub use submit::{ConfirmPolicy, Confirmation};

/// Everything a handler needs to read the ledger and submit transactions
pub struct HandlerContext {
    pub gateway: Arc<dyn LedgerGateway>,
    pub program_id: Pubkey,
    pub fee_payer: Arc<Keypair>,
    pub confirm: ConfirmPolicy,
}

pub struct Task {
    scheduler: Arc<Scheduler>,
    stop: ShutdownSignal,
    handle: Option<JoinHandle<LoopExit>>,
}

impl Task {
    pub fn new(
        settings: &Settings,
        keystore: &Keystore,
        gateway: Arc<dyn LedgerGateway>,
        shutdown: ShutdownSignal,
    ) -> RelayResult<Self> {
        let fee_payer = keystore
            .get(&settings.fee_payer)
            .ok_or_else(|| RelayError::FeePayerMissing(settings.fee_payer.to_string()))?;

        let resolver = match settings.stake_manager {
            Some(stake_manager) => TargetResolver::Fixed(stake_manager),
            None => TargetResolver::Entrusted { stack: settings.stack },
        };
        info!(mode = resolver.mode(), fee_payer = %settings.fee_payer, "relay task configured");

        let ctx = HandlerContext {
            gateway,
            program_id: settings.program_id,
            fee_payer,
            confirm: settings.confirm,
        };

        let stop = ShutdownSignal::new();
        let scheduler = Scheduler::new(
            ctx,
            HandlerRegistry::lifecycle(),
            resolver,
            settings.scheduler.clone(),
            stop.clone(),
            shutdown,
        );

        Ok(Self {
            scheduler: Arc::new(scheduler),
            stop,
            handle: None,
        })
    }

    /// Spawn the supervised loop. Calling it again while running is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.handle = Some(scheduler::spawn_supervised(self.scheduler.clone()));
    }

    /// Ask the loop to exit at its next round boundary
    pub fn stop(&self) {
        if self.stop.trigger() {
            info!("relay task stop requested");
        }
    }

    /// Wait for the loop to finish its in-flight round and exit
    pub async fn join(&mut self) -> Option<LoopExit> {
        let handle = self.handle.take()?;
        handle.await.ok()
    }
}
