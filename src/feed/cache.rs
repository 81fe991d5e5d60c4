//! Short-lived cache of the most recent feed fetch

use crate::types::FeedItem;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

struct CachedItem {
    fetched_at: DateTime<Utc>,
    item: FeedItem,
}

/// Holds the newest item of the last successful fetch for `ttl`
///
/// There is a single slot: the cache is keyed only by "most recent fetch".
pub struct FeedCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CachedItem>>,
}

impl FeedCache {
    /// Create an empty cache
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    /// The cached item, if it is younger than the freshness window
    pub async fn get(&self) -> Option<FeedItem> {
        let slot = self.slot.read().await;
        let cached = slot.as_ref()?;

        let age = self.clock.now().signed_duration_since(cached.fetched_at);
        let fresh = age
            .to_std()
            // a clock that moved backwards still counts as fresh, unless caching is off
            .map_or(!self.ttl.is_zero(), |age| age < self.ttl);

        fresh.then(|| cached.item.clone())
    }

    /// Store `item` as the most recent fetch
    pub async fn put(&self, item: FeedItem) {
        let fetched_at = self.clock.now();
        *self.slot.write().await = Some(CachedItem { fetched_at, item });
    }

    /// Drop the cached item
    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}
