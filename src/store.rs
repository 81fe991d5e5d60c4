//! Storage seams used by the dispatcher and notifier
//!
//! [`Database`] implements both traits; tests swap in in-memory or failing
//! stores to exercise error isolation.

use crate::Result;
use crate::db::Database;
use crate::types::{ControlState, ControlStateUpdate, Recipient, RecipientId};
use async_trait::async_trait;

/// Registered push recipients
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Insert or refresh a recipient, keyed by its endpoint-derived id
    async fn upsert(&self, recipient: &Recipient) -> Result<RecipientId>;

    /// Every current recipient
    async fn list(&self) -> Result<Vec<Recipient>>;

    /// Remove one recipient; returns false when it was already gone
    async fn delete(&self, id: &RecipientId) -> Result<bool>;

    /// Number of recipients
    async fn count(&self) -> Result<i64>;
}

/// The singleton control record
#[async_trait]
pub trait ControlStore: Send + Sync {
    /// Current control state (all-empty before the first write)
    async fn read(&self) -> Result<ControlState>;

    /// Atomically merge the non-`None` fields of `update`
    async fn merge(&self, update: &ControlStateUpdate) -> Result<()>;

    /// Merge `update` only while the stored marker still equals `expected`
    ///
    /// Check and write happen as one step. Returns false and writes nothing
    /// when the marker has moved on.
    async fn compare_and_merge(
        &self,
        expected: Option<&str>,
        update: &ControlStateUpdate,
    ) -> Result<bool>;
}

#[async_trait]
impl RecipientStore for Database {
    async fn upsert(&self, recipient: &Recipient) -> Result<RecipientId> {
        self.upsert_recipient(recipient).await
    }

    async fn list(&self) -> Result<Vec<Recipient>> {
        self.list_recipients().await
    }

    async fn delete(&self, id: &RecipientId) -> Result<bool> {
        self.delete_recipient(id).await
    }

    async fn count(&self) -> Result<i64> {
        self.count_recipients().await
    }
}

#[async_trait]
impl ControlStore for Database {
    async fn read(&self) -> Result<ControlState> {
        self.read_control_state().await
    }

    async fn merge(&self, update: &ControlStateUpdate) -> Result<()> {
        self.merge_control_state(update).await
    }

    async fn compare_and_merge(
        &self,
        expected: Option<&str>,
        update: &ControlStateUpdate,
    ) -> Result<bool> {
        self.compare_and_merge_control_state(expected, update).await
    }
}
