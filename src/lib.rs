//! # feed-push
//!
//! Watches a single RSS/Atom feed and announces each new item to every
//! registered browser through Web Push.
//!
//! ## How it works
//!
//! A notification cycle fetches the newest feed item, compares its novelty
//! marker with the last one dispatched, and on a change fans a short
//! notification out to all recipients. Recipients whose push service answers
//! 404 or 410 are removed. Cycles are started by the built-in
//! [`CycleScheduler`] or through the HTTP trigger API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use feed_push::{Config, FeedPush, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!
//!     let service = FeedPush::new(config).await?;
//!     run_with_shutdown(service).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP trigger API
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Concurrent push fan-out and pruning
pub mod dispatcher;
/// Error types
pub mod error;
/// Feed fetching, parsing and caching
pub mod feed;
/// Notification cycle orchestration
pub mod notifier;
/// Push delivery
pub mod push;
/// Periodic cycle runner
pub mod scheduler;
/// Storage traits
pub mod store;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, FeedError, Result, ToHttpStatus};
pub use feed::{Clock, FeedFetcher, FeedSource, SystemClock};
pub use notifier::{MessageSettings, Notifier, NotifierParts};
pub use push::{PushTransport, WebPushTransport};
pub use scheduler::CycleScheduler;
pub use types::{
    ControlState, CycleOptions, CycleOutcome, FeedItem, PushMessage, Recipient, RecipientId,
    SkipReason,
};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A fully wired service: database, feed fetcher, push transport and notifier
pub struct FeedPush {
    config: Arc<Config>,
    db: Arc<Database>,
    notifier: Arc<Notifier>,
    shutdown: CancellationToken,
}

impl FeedPush {
    /// Open the database and build the production collaborators
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or migrated, the HTTP client
    /// cannot be built, or the VAPID key is missing or invalid.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let feed = Arc::new(FeedFetcher::new(&config.feed, clock.clone())?);
        let transport = Arc::new(WebPushTransport::new(&config.push)?);

        let notifier = Notifier::new(
            NotifierParts {
                feed,
                recipients: db.clone(),
                control: db.clone(),
                transport,
                clock,
            },
            MessageSettings::from(&config.feed),
        );

        tracing::info!(
            feed_url = %config.feed.url,
            database = %config.persistence.database_path.display(),
            "feed-push initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            notifier: Arc::new(notifier),
            shutdown: CancellationToken::new(),
        })
    }

    /// The cycle orchestrator
    pub fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }

    /// The backing database, e.g. for registering recipients
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Token that stops the scheduler and API server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the scheduler and API server until the shutdown token is cancelled
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`] if the service was already shut down, otherwise
    /// whatever stopped the API server.
    pub async fn run(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let scheduler = CycleScheduler::new(
            self.notifier.clone(),
            self.config.schedule.clone(),
            self.shutdown.clone(),
        );
        let scheduler_handle = tokio::spawn(scheduler.run());

        let served = api::start_api_server(
            self.notifier.clone(),
            self.config.clone(),
            self.shutdown.clone(),
        )
        .await;

        // The server may also stop on its own (e.g. bind failure)
        self.shutdown.cancel();
        if let Err(e) = scheduler_handle.await {
            tracing::error!(error = %e, "scheduler task panicked");
        }

        served
    }

    /// Stop background work and close the database
    pub async fn shutdown(&self) {
        tracing::info!("shutting down");
        self.shutdown.cancel();
        self.db.pool().close().await;
    }
}

/// Helper function to run the service with graceful signal handling.
///
/// Runs the scheduler and API server, waits for a termination signal, then
/// shuts everything down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(service: FeedPush) -> Result<()> {
    let token = service.shutdown_token();
    let signals = tokio::spawn(async move {
        wait_for_signal().await;
        token.cancel();
    });

    let result = service.run().await;

    signals.abort();
    service.shutdown().await;
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
