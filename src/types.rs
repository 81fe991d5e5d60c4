//! Core types for feed-push

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identifier of a recipient
///
/// Derived from the transport endpoint as lowercase hex SHA-256 (64 chars), so
/// registering the same endpoint twice always lands on the same row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    /// Derive the id for a transport endpoint
    pub fn from_endpoint(endpoint: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Wrap an id that was already derived (e.g. read back from the database)
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered push subscription
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Endpoint-derived identifier
    pub id: RecipientId,
    /// Opaque push service URL
    pub endpoint: String,
    /// Client auth secret (`keys.auth`), passed through unchanged
    pub auth_secret: String,
    /// Client public key (`keys.p256dh`), passed through unchanged
    pub encryption_key: String,
}

impl Recipient {
    /// Build a recipient, deriving its id from the endpoint
    pub fn new(
        endpoint: impl Into<String>,
        auth_secret: impl Into<String>,
        encryption_key: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            id: RecipientId::from_endpoint(&endpoint),
            endpoint,
            auth_secret: auth_secret.into(),
            encryption_key: encryption_key.into(),
        }
    }
}

/// The newest entry of the feed at fetch time
///
/// Never persisted; only `novelty_marker` and the message derived from it are.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Display title (markup stripped, entities decoded)
    pub title: Option<String>,
    /// Item link
    pub link: Option<String>,
    /// Raw description as found in the feed
    pub description_html: Option<String>,
    /// Raw publication timestamp string, not reparsed
    pub published_at: Option<String>,
    /// guid, else link, else title
    pub novelty_marker: String,
}

/// Singleton control record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// Most recent successful fetch
    pub last_check_at: Option<DateTime<Utc>>,
    /// Marker of the last dispatched item
    pub last_novelty_marker: Option<String>,
    /// Time of the last dispatch
    pub last_send_at: Option<DateTime<Utc>>,
}

/// Partial update of [`ControlState`]; `None` fields are left untouched
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlStateUpdate {
    /// New `last_check_at`
    pub last_check_at: Option<DateTime<Utc>>,
    /// New `last_novelty_marker`
    pub last_novelty_marker: Option<String>,
    /// New `last_send_at`
    pub last_send_at: Option<DateTime<Utc>>,
}

impl ControlStateUpdate {
    /// Touch only the check timestamp
    pub fn checked(at: DateTime<Utc>) -> Self {
        Self {
            last_check_at: Some(at),
            ..Default::default()
        }
    }

    /// Record a dispatch: marker and send time always travel together
    pub fn dispatched(novelty_marker: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            last_novelty_marker: Some(novelty_marker.into()),
            last_send_at: Some(at),
            ..Default::default()
        }
    }

    /// True when the update would not change anything
    pub fn is_empty(&self) -> bool {
        self.last_check_at.is_none()
            && self.last_novelty_marker.is_none()
            && self.last_send_at.is_none()
    }
}

/// Notification payload, serialized as JSON for the service worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Notification title
    pub title: String,
    /// Notification body text
    pub body: String,
    /// URL opened on click
    pub url: String,
}

impl PushMessage {
    /// Encode as the JSON bytes handed to the push transport
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Options for a single notification cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOptions {
    /// Dispatch even when the newest item was already sent
    #[serde(default)]
    pub force: bool,
}

/// Why a cycle finished without dispatching
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The newest item matches the last dispatched marker
    NoNew,
}

/// Result of a completed cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOutcome {
    /// Number of successful deliveries
    pub sent: usize,
    /// Marker of the newest item
    pub novelty_marker: String,
    /// Set when nothing was dispatched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    /// Title of the dispatched item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Recipients removed because the push service reported them gone
    #[serde(default)]
    pub pruned: usize,
}

impl CycleOutcome {
    /// Outcome of a cycle stopped at the novelty gate
    pub fn no_new(novelty_marker: impl Into<String>) -> Self {
        Self {
            sent: 0,
            novelty_marker: novelty_marker.into(),
            reason: Some(SkipReason::NoNew),
            title: None,
            pruned: 0,
        }
    }

    /// Whether the cycle dispatched anything
    pub fn dispatched(&self) -> bool {
        self.reason.is_none()
    }
}

/// Recipient count plus control state, for status reporting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Number of registered recipients
    pub recipients: i64,
    /// Current control record
    pub state: ControlState,
}

/// Convert a stored unix timestamp back into a UTC datetime
pub(crate) fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
