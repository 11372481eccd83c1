// Relay scheduler - drives the era handlers round after round
//
// - A round resolves the targets, then runs every handler on every target in order
// - The first failing handler aborts the round; the whole round is retried later
// - Consecutive failed rounds are counted; reaching the ceiling requests process shutdown
// - A panic in the loop restarts it with a fresh counter after the retry interval

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::{RelayError, RelayResult},
    shutdown::ShutdownSignal,
    task::{HandlerContext, HandlerRegistry, TargetResolver},
};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause after a successful round
    pub round_interval: Duration,
    /// Pause after a failed round
    pub retry_interval: Duration,
    /// Consecutive failed rounds before shutdown is requested
    pub max_consecutive_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            round_interval: Duration::from_secs(30),
            retry_interval: Duration::from_secs(6),
            max_consecutive_failures: 200,
        }
    }
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    Escalated,
}

pub struct Scheduler {
    ctx: HandlerContext,
    registry: HandlerRegistry,
    resolver: TargetResolver,
    config: SchedulerConfig,
    stop: ShutdownSignal,
    shutdown: ShutdownSignal,
}

impl Scheduler {
    pub fn new(
        ctx: HandlerContext,
        registry: HandlerRegistry,
        resolver: TargetResolver,
        config: SchedulerConfig,
        stop: ShutdownSignal,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            ctx,
            registry,
            resolver,
            config,
            stop,
            shutdown,
        }
    }

    /// Run rounds until stopped or until the failure ceiling is reached
    pub async fn run(&self) -> LoopExit {
        info!(handlers = ?self.registry.names(), "start handlers");
        let mut failures: u32 = 0;

        loop {
            if self.stop.is_triggered() {
                info!("relay task has stopped");
                return LoopExit::Stopped;
            }
            if failures >= self.config.max_consecutive_failures {
                error!(failures, "too many consecutive failed rounds, requesting shutdown");
                self.shutdown.trigger();
                return LoopExit::Escalated;
            }

            let pause = match self.run_round().await {
                Ok(()) => {
                    failures = 0;
                    self.config.round_interval
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "era round failed, will retry");
                    self.config.retry_interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.stop.triggered() => {}
            }
        }
    }

    /// One pass of every handler over every target; the first error ends the round
    #[instrument(skip(self), fields(mode = self.resolver.mode()))]
    pub async fn run_round(&self) -> RelayResult<()> {
        let targets = self.resolver.resolve_targets(self.ctx.gateway.as_ref()).await?;

        for stake_manager in &targets {
            for handler in self.registry.iter() {
                let name = handler.name();
                debug!(%stake_manager, handler = name, "handler start");
                handler
                    .handle(&self.ctx, stake_manager)
                    .await
                    .map_err(|e| RelayError::Handler {
                        name,
                        source: Box::new(e),
                    })?;
                debug!(%stake_manager, handler = name, "handler end");
            }
        }
        Ok(())
    }
}

/// Spawn the loop and respawn it, one retry interval later, whenever it panics
pub fn spawn_supervised(scheduler: Arc<Scheduler>) -> JoinHandle<LoopExit> {
    tokio::spawn(async move {
        loop {
            let worker = scheduler.clone();
            match tokio::spawn(async move { worker.run().await }).await {
                Ok(exit) => return exit,
                Err(e) if e.is_panic() => {
                    let backoff = scheduler.config.retry_interval;
                    error!(?backoff, "relay loop panicked, restarting");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = scheduler.stop.triggered() => return LoopExit::Stopped,
                    }
                }
                Err(_) => return LoopExit::Stopped,
            }
        }
    })
}
