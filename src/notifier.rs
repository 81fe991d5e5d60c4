//! The notification cycle: fetch → novelty check → compose → dispatch → persist
//!
//! A cycle is:
//!
//! 1. Fetch the newest feed item. A fetch failure ends the cycle with nothing written.
//! 2. Read the control state and record `last_check_at`.
//! 3. Unless forced, stop if the item's novelty marker was already dispatched.
//! 4. Compose the push message from the item.
//! 5. Fan it out to every current recipient, pruning the dead ones.
//! 6. Record the marker and send time in one update, provided the stored
//!    marker is still the one read in step 2.
//!
//! A crash between 5 and 6 means the next cycle dispatches the same item again
//! (at-least-once).

use crate::Result;
use crate::config::FeedConfig;
use crate::dispatcher::{DispatchSummary, Dispatcher};
use crate::feed::{Clock, FeedSource};
use crate::push::PushTransport;
use crate::store::{ControlStore, RecipientStore};
use crate::types::{
    ControlStateUpdate, CycleOptions, CycleOutcome, FeedItem, PushMessage, StatusSnapshot,
};
use crate::utils::{DEFAULT_SUMMARY_CHARS, summarize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How feed items become notification text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSettings {
    /// Title used when the item has none
    pub default_title: String,
    /// Body length limit in characters
    pub summary_max_chars: usize,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            default_title: "New article".to_string(),
            summary_max_chars: DEFAULT_SUMMARY_CHARS,
        }
    }
}

impl From<&FeedConfig> for MessageSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            default_title: config.default_title.clone(),
            summary_max_chars: config.summary_max_chars,
        }
    }
}

/// Collaborators a [`Notifier`] is built from
pub struct NotifierParts {
    /// Newest-item source
    pub feed: Arc<dyn FeedSource>,
    /// Registered recipients
    pub recipients: Arc<dyn RecipientStore>,
    /// Control record
    pub control: Arc<dyn ControlStore>,
    /// Push delivery
    pub transport: Arc<dyn PushTransport>,
    /// Time source for control-state timestamps
    pub clock: Arc<dyn Clock>,
}

/// Orchestrates notification cycles
pub struct Notifier {
    feed: Arc<dyn FeedSource>,
    recipients: Arc<dyn RecipientStore>,
    control: Arc<dyn ControlStore>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    settings: MessageSettings,
}

impl Notifier {
    /// Assemble a notifier
    pub fn new(parts: NotifierParts, settings: MessageSettings) -> Self {
        let dispatcher = Dispatcher::new(parts.transport, parts.recipients.clone());
        Self {
            feed: parts.feed,
            recipients: parts.recipients,
            control: parts.control,
            dispatcher,
            clock: parts.clock,
            settings,
        }
    }

    /// Run one cycle
    ///
    /// `options.force` skips only the novelty check.
    ///
    /// # Errors
    ///
    /// Feed errors propagate unchanged and leave the control state untouched.
    /// Store errors also abort the cycle. Per-recipient delivery failures never do.
    pub async fn run_cycle(&self, options: CycleOptions) -> Result<CycleOutcome> {
        let item = self.feed.fetch_newest().await?;

        let state = self.control.read().await?;
        self.control
            .merge(&ControlStateUpdate::checked(self.clock.now()))
            .await?;

        let already_sent = state
            .last_novelty_marker
            .as_deref()
            .is_some_and(|last| is_same_item(last, &item.novelty_marker));

        if already_sent && !options.force {
            debug!(novelty_marker = %item.novelty_marker, "no new item");
            return Ok(CycleOutcome::no_new(item.novelty_marker));
        }

        let message = compose_message(&item, &self.settings);
        let recipients = self.recipients.list().await?;

        info!(
            novelty_marker = %item.novelty_marker,
            force = options.force,
            recipients = recipients.len(),
            "dispatching feed item"
        );

        let summary = self.dispatcher.dispatch(&message, &recipients).await?;

        // Only advance from the marker this cycle compared against; a cycle
        // that overlapped and already moved it wins.
        let recorded = self
            .control
            .compare_and_merge(
                state.last_novelty_marker.as_deref(),
                &ControlStateUpdate::dispatched(item.novelty_marker.clone(), self.clock.now()),
            )
            .await?;

        if !recorded {
            warn!(
                novelty_marker = %item.novelty_marker,
                "control state changed during dispatch, keeping the stored marker"
            );
        }

        info!(
            novelty_marker = %item.novelty_marker,
            sent = summary.delivered,
            pruned = summary.pruned.removed,
            "cycle complete"
        );

        Ok(CycleOutcome {
            sent: summary.delivered,
            novelty_marker: item.novelty_marker,
            reason: None,
            title: item.title,
            pruned: summary.pruned.removed,
        })
    }

    /// Fan `message` out to every recipient without touching the control state
    pub async fn send_test(&self, message: &PushMessage) -> Result<DispatchSummary> {
        let recipients = self.recipients.list().await?;
        info!(recipients = recipients.len(), "sending test push");
        self.dispatcher.dispatch(message, &recipients).await
    }

    /// Recipient count and control record
    pub async fn status(&self) -> Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            recipients: self.recipients.count().await?,
            state: self.control.read().await?,
        })
    }

    /// Newest feed item, possibly from cache
    pub async fn latest_item(&self) -> Result<FeedItem> {
        self.feed.fetch_newest().await
    }
}

// An empty marker identifies nothing, so it never matches.
fn is_same_item(last: &str, current: &str) -> bool {
    !last.is_empty() && last == current
}

/// Build the notification for `item`
///
/// Title falls back to the configured default, the body is the description
/// as plain text cut to `summary_max_chars`, and the URL falls back to `/`.
pub fn compose_message(item: &FeedItem, settings: &MessageSettings) -> PushMessage {
    let title = item
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&settings.default_title)
        .to_string();

    let body = summarize(
        item.description_html.as_deref().unwrap_or_default(),
        settings.summary_max_chars,
    );

    let url = item.link.clone().unwrap_or_else(|| "/".to_string());

    PushMessage { title, body, url }
}
