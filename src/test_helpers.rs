//! In-memory stand-ins for the store, feed and push seams.

use crate::error::{DatabaseError, Error, FeedError, Result};
use crate::feed::FeedSource;
use crate::push::{PushFailure, PushTransport};
use crate::store::{ControlStore, RecipientStore};
use crate::types::{ControlState, ControlStateUpdate, FeedItem, Recipient, RecipientId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Recipient store backed by a map, with optional per-id delete failures
#[derive(Default)]
pub struct MemoryRecipients {
    rows: Mutex<BTreeMap<RecipientId, Recipient>>,
    failing_deletes: HashSet<RecipientId>,
    pub delete_calls: AtomicUsize,
}

impl MemoryRecipients {
    pub fn with(recipients: impl IntoIterator<Item = Recipient>) -> Self {
        Self {
            rows: Mutex::new(recipients.into_iter().map(|r| (r.id.clone(), r)).collect()),
            ..Default::default()
        }
    }

    /// Make deletes of `id` fail with a database error
    pub fn fail_delete_of(mut self, id: RecipientId) -> Self {
        self.failing_deletes.insert(id);
        self
    }

    pub async fn ids(&self) -> Vec<RecipientId> {
        self.rows.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl RecipientStore for MemoryRecipients {
    async fn upsert(&self, recipient: &Recipient) -> Result<RecipientId> {
        self.rows
            .lock()
            .await
            .insert(recipient.id.clone(), recipient.clone());
        Ok(recipient.id.clone())
    }

    async fn list(&self) -> Result<Vec<Recipient>> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn delete(&self, id: &RecipientId) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.contains(id) {
            return Err(Error::Database(DatabaseError::QueryFailed(format!(
                "simulated delete failure for {id}"
            ))));
        }
        Ok(self.rows.lock().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.lock().await.len() as i64)
    }
}

/// Control store that records every merge
#[derive(Default)]
pub struct MemoryControl {
    state: Mutex<ControlState>,
    pub merges: Mutex<Vec<ControlStateUpdate>>,
}

impl MemoryControl {
    pub fn with_marker(marker: &str) -> Self {
        Self {
            state: Mutex::new(ControlState {
                last_novelty_marker: Some(marker.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub async fn snapshot(&self) -> ControlState {
        self.state.lock().await.clone()
    }

    async fn apply(&self, state: &mut ControlState, update: &ControlStateUpdate) {
        if let Some(at) = update.last_check_at {
            state.last_check_at = Some(at);
        }
        if let Some(marker) = &update.last_novelty_marker {
            state.last_novelty_marker = Some(marker.clone());
        }
        if let Some(at) = update.last_send_at {
            state.last_send_at = Some(at);
        }
        self.merges.lock().await.push(update.clone());
    }
}

#[async_trait]
impl ControlStore for MemoryControl {
    async fn read(&self) -> Result<ControlState> {
        Ok(self.state.lock().await.clone())
    }

    async fn merge(&self, update: &ControlStateUpdate) -> Result<()> {
        let mut state = self.state.lock().await;
        self.apply(&mut state, update).await;
        Ok(())
    }

    async fn compare_and_merge(
        &self,
        expected: Option<&str>,
        update: &ControlStateUpdate,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.last_novelty_marker.as_deref() != expected {
            return Ok(false);
        }
        self.apply(&mut state, update).await;
        Ok(true)
    }
}

/// Push transport with scripted per-endpoint failures
#[derive(Default)]
pub struct FakeTransport {
    failures: HashMap<String, Option<u16>>,
    delays: HashMap<String, Duration>,
    pub sent: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail deliveries to `endpoint` with `status` (`None` = no response)
    pub fn fail(mut self, endpoint: &str, status: Option<u16>) -> Self {
        self.failures.insert(endpoint.to_string(), status);
        self
    }

    /// Delay deliveries to `endpoint`
    pub fn delay(mut self, endpoint: &str, by: Duration) -> Self {
        self.delays.insert(endpoint.to_string(), by);
        self
    }

    pub async fn delivered_endpoints(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn send(
        &self,
        recipient: &Recipient,
        payload: &[u8],
    ) -> std::result::Result<(), PushFailure> {
        if let Some(delay) = self.delays.get(&recipient.endpoint) {
            tokio::time::sleep(*delay).await;
        }

        match self.failures.get(&recipient.endpoint) {
            Some(Some(status)) => Err(PushFailure::with_status(*status, "scripted failure")),
            Some(None) => Err(PushFailure::without_status("scripted network failure")),
            None => {
                self.sent
                    .lock()
                    .await
                    .push((recipient.endpoint.clone(), payload.to_vec()));
                Ok(())
            }
        }
    }
}

/// Feed source returning a settable item, or a fetch error when unset
#[derive(Default)]
pub struct StaticFeed {
    item: Mutex<Option<FeedItem>>,
    pub calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(item: FeedItem) -> Self {
        Self {
            item: Mutex::new(Some(item)),
            calls: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails
    pub fn failing() -> Self {
        Self::default()
    }

    pub async fn set(&self, item: FeedItem) {
        *self.item.lock().await = Some(item);
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_newest(&self) -> Result<FeedItem> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.item.lock().await.clone().ok_or_else(|| {
            FeedError::Fetch {
                url: "https://feed.test/rss".to_string(),
                status: Some(503),
                message: "HTTP 503".to_string(),
            }
            .into()
        })
    }
}

/// Feed item with every field set
pub fn feed_item(marker: &str) -> FeedItem {
    FeedItem {
        title: Some(format!("Title {marker}")),
        link: Some(format!("https://news.test/{marker}")),
        description_html: Some(format!("<p>Story <b>{marker}</b></p>")),
        published_at: Some("Tue, 14 Oct 2025 08:00:00 +0000".to_string()),
        novelty_marker: marker.to_string(),
    }
}

/// Recipient with endpoint `https://push.test/{name}`
pub fn recipient(name: &str) -> Recipient {
    Recipient::new(
        format!("https://push.test/{name}"),
        format!("auth-{name}"),
        format!("key-{name}"),
    )
}
