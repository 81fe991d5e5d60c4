//! Recipient registration, listing and removal.

use crate::error::DatabaseError;
use crate::types::{Recipient, RecipientId};
use crate::{Error, Result};

use super::{Database, RecipientRow};

impl Database {
    /// Insert a recipient, or refresh its keys if the endpoint is already known
    ///
    /// The id is derived from the endpoint, so re-registering never creates a
    /// second row.
    pub async fn upsert_recipient(&self, recipient: &Recipient) -> Result<RecipientId> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO recipients (id, endpoint, auth_secret, encryption_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                auth_secret = excluded.auth_secret,
                encryption_key = excluded.encryption_key,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(recipient.id.as_str())
        .bind(&recipient.endpoint)
        .bind(&recipient.auth_secret)
        .bind(&recipient.encryption_key)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert recipient: {}",
                e
            )))
        })?;

        Ok(recipient.id.clone())
    }

    /// List every registered recipient, oldest first
    pub async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT id, endpoint, auth_secret, encryption_key, created_at, updated_at
            FROM recipients
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list recipients: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(Recipient::from).collect())
    }

    /// Remove a recipient by id
    ///
    /// Returns true if a row was deleted. Removing an unknown id is not an error.
    pub async fn delete_recipient(&self, id: &RecipientId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipients WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete recipient {}: {}",
                    id, e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a recipient by its endpoint (unsubscribe)
    pub async fn delete_recipient_by_endpoint(&self, endpoint: &str) -> Result<bool> {
        self.delete_recipient(&RecipientId::from_endpoint(endpoint))
            .await
    }

    /// Number of registered recipients
    pub async fn count_recipients(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipients")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count recipients: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}
