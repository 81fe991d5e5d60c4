//! Periodic notification cycles
//!
//! Runs [`Notifier::run_cycle`] without `force` on a fixed interval until the
//! cancellation token fires. A failed cycle is logged and the loop carries on;
//! the next tick simply tries again.

use crate::config::ScheduleConfig;
use crate::notifier::Notifier;
use crate::types::CycleOptions;
use std::sync::Arc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Background runner for timer-triggered cycles
pub struct CycleScheduler {
    notifier: Arc<Notifier>,
    config: ScheduleConfig,
    shutdown: CancellationToken,
}

impl CycleScheduler {
    /// Create a scheduler; it stops when `shutdown` is cancelled
    pub fn new(notifier: Arc<Notifier>, config: ScheduleConfig, shutdown: CancellationToken) -> Self {
        Self {
            notifier,
            config,
            shutdown,
        }
    }

    /// Run until cancelled
    pub async fn run(self) {
        if !self.config.enabled {
            info!("cycle scheduler disabled");
            return;
        }
        if self.config.interval.is_zero() {
            error!("cycle scheduler interval is zero, not starting");
            return;
        }

        info!(interval_secs = self.config.interval.as_secs(), "cycle scheduler started");

        let mut ticker = interval(self.config.interval);
        // Don't fire a burst of catch-up cycles after a slow one
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if !self.config.run_on_start {
            // the first tick completes immediately
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.run_once().await,
            }
        }

        info!("cycle scheduler stopped");
    }

    async fn run_once(&self) {
        match self.notifier.run_cycle(CycleOptions::default()).await {
            Ok(outcome) if outcome.dispatched() => {
                info!(
                    novelty_marker = %outcome.novelty_marker,
                    sent = outcome.sent,
                    "scheduled cycle dispatched"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "scheduled cycle failed");
            }
        }
    }
}
