// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation usage ledger backed by SQLite.
//!
//! Each conversation has one running total in the `usage` table. Charges are
//! applied with a single `INSERT ... ON CONFLICT DO UPDATE ... RETURNING`
//! statement, so concurrent increments never lose an update.

use async_trait::async_trait;
use lull_core::{LullError, UsageStore};
use lull_storage::{Database, SqliteStorage, map_tr_err};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

/// Running spend per conversation.
///
/// All operations go through the single tokio-rusqlite background thread.
#[derive(Clone)]
pub struct UsageLedger {
    conn: tokio_rusqlite::Connection,
}

impl UsageLedger {
    /// Create a ledger using the given tokio-rusqlite connection.
    ///
    /// The `usage` table must already exist (created by storage migrations).
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Share the message store's engine.
    pub fn from_storage(storage: &SqliteStorage) -> Result<Self, LullError> {
        Ok(Self::from_database(storage.database()?))
    }

    /// Share an already opened database.
    pub fn from_database(db: &Database) -> Self {
        Self::new(db.connection().clone())
    }

    /// Open the database at `path`, running migrations if needed.
    pub async fn open(path: &str) -> Result<Self, LullError> {
        let db = Database::open(path).await?;
        Ok(Self::from_database(&db))
    }
}

#[async_trait]
impl UsageStore for UsageLedger {
    async fn get_usage(&self, conversation_id: &str) -> Result<f64, LullError> {
        let conversation_id = conversation_id.to_string();
        let total = self
            .conn
            .call(move |conn| -> Result<Option<f64>, rusqlite::Error> {
                conn.query_row(
                    "SELECT amount_spent FROM usage WHERE conversation_id = ?1",
                    params![conversation_id],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;
        Ok(total.unwrap_or(0.0))
    }

    async fn add_usage(&self, conversation_id: &str, delta: f64) -> Result<f64, LullError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(LullError::InvalidUsage { delta });
        }

        let id = conversation_id.to_string();
        let total = self
            .conn
            .call(move |conn| -> Result<f64, rusqlite::Error> {
                conn.query_row(
                    "INSERT INTO usage (conversation_id, amount_spent) VALUES (?1, ?2)
                     ON CONFLICT(conversation_id)
                     DO UPDATE SET amount_spent = amount_spent + excluded.amount_spent
                     RETURNING amount_spent",
                    params![id, delta],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)?;

        debug!(conversation_id, delta, total, "usage recorded");
        Ok(total)
    }
}
