//! Database layer for feed-push
//!
//! Handles SQLite persistence for push recipients and the control record.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`recipients`] - Recipient registration, listing, removal
//! - [`control`] - The singleton control record

use crate::types::{Recipient, RecipientId};
use sqlx::{FromRow, sqlite::SqlitePool};

mod control;
mod migrations;
mod recipients;

/// Recipient record from database
#[derive(Debug, Clone, FromRow)]
pub struct RecipientRow {
    /// Hex SHA-256 of the endpoint
    pub id: String,
    /// Push service URL
    pub endpoint: String,
    /// Client auth secret
    pub auth_secret: String,
    /// Client public key
    pub encryption_key: String,
    /// Unix timestamp of the first registration
    pub created_at: i64,
    /// Unix timestamp of the last registration
    pub updated_at: i64,
}

impl From<RecipientRow> for Recipient {
    fn from(row: RecipientRow) -> Self {
        Recipient {
            id: RecipientId::from_raw(row.id),
            endpoint: row.endpoint,
            auth_secret: row.auth_secret,
            encryption_key: row.encryption_key,
        }
    }
}

/// Control record row; the table only ever holds `id = 1`
#[derive(Debug, Clone, FromRow)]
struct ControlRow {
    last_check_at: Option<i64>,
    last_novelty_marker: Option<String>,
    last_send_at: Option<i64>,
}

/// Database handle for feed-push
pub struct Database {
    pool: SqlitePool,
}
