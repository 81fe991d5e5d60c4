//! The singleton control record: last check, last dispatched marker, last send.

use crate::error::DatabaseError;
use crate::types::{ControlState, ControlStateUpdate, from_unix};
use crate::{Error, Result};

use super::{ControlRow, Database};

impl Database {
    /// Read the control record
    ///
    /// A database that has never been written to yields an all-empty state.
    pub async fn read_control_state(&self) -> Result<ControlState> {
        let row = sqlx::query_as::<_, ControlRow>(
            r#"
            SELECT last_check_at, last_novelty_marker, last_send_at
            FROM control_state
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read control state: {}",
                e
            )))
        })?;

        Ok(row
            .map(|row| ControlState {
                last_check_at: row.last_check_at.and_then(from_unix),
                last_novelty_marker: row.last_novelty_marker,
                last_send_at: row.last_send_at.and_then(from_unix),
            })
            .unwrap_or_default())
    }

    /// Merge a partial update into the control record
    ///
    /// Fields left as `None` keep their stored value. The whole merge is one
    /// statement, so concurrent writers never interleave half-applied updates.
    pub async fn merge_control_state(&self, update: &ControlStateUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO control_state (id, last_check_at, last_novelty_marker, last_send_at, updated_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_check_at = COALESCE(excluded.last_check_at, control_state.last_check_at),
                last_novelty_marker = COALESCE(excluded.last_novelty_marker, control_state.last_novelty_marker),
                last_send_at = COALESCE(excluded.last_send_at, control_state.last_send_at),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(update.last_check_at.map(|t| t.timestamp()))
        .bind(update.last_novelty_marker.as_deref())
        .bind(update.last_send_at.map(|t| t.timestamp()))
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update control state: {}",
                e
            )))
        })?;

        Ok(())
    }
    /// Merge `update` only if the stored marker is still `expected`
    ///
    /// `None` expects no marker at all (including no row yet). Returns false,
    /// leaving the record untouched, when another writer changed the marker
    /// since it was read.
    pub async fn compare_and_merge_control_state(
        &self,
        expected: Option<&str>,
        update: &ControlStateUpdate,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let updated = sqlx::query(
            r#"
            UPDATE control_state SET
                last_check_at = COALESCE(?, last_check_at),
                last_novelty_marker = COALESCE(?, last_novelty_marker),
                last_send_at = COALESCE(?, last_send_at),
                updated_at = ?
            WHERE id = 1 AND last_novelty_marker IS ?
            "#,
        )
        .bind(update.last_check_at.map(|t| t.timestamp()))
        .bind(update.last_novelty_marker.as_deref())
        .bind(update.last_send_at.map(|t| t.timestamp()))
        .bind(now)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update control state: {}",
                e
            )))
        })?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }
        if expected.is_some() {
            return Ok(false);
        }

        // No marker was expected, so a missing row also satisfies the condition
        let inserted = sqlx::query(
            r#"
            INSERT INTO control_state (id, last_check_at, last_novelty_marker, last_send_at, updated_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(update.last_check_at.map(|t| t.timestamp()))
        .bind(update.last_novelty_marker.as_deref())
        .bind(update.last_send_at.map(|t| t.timestamp()))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert control state: {}",
                e
            )))
        })?;

        Ok(inserted.rows_affected() > 0)
    }
}
