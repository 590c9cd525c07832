// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable pending-queue operations.
//!
//! Entries are buffered per conversation until a reply covers them. The
//! `messages` table stays the canonical log; this table only tracks what is
//! still waiting for a response.

use chrono::{DateTime, Utc};
use lull_core::types::format_timestamp;
use lull_core::{LullError, PendingEntry};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Append an entry to the conversation's queue.
pub async fn enqueue(
    db: &Database,
    conversation_id: &str,
    entry: &PendingEntry,
) -> Result<(), LullError> {
    let conversation_id = conversation_id.to_string();
    let external_id = entry.external_id.clone();
    let content = entry.content.clone();
    let timestamp = format_timestamp(&entry.timestamp);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO pending_queue (conversation_id, external_id, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conversation_id, external_id, content, timestamp],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of entries waiting for the conversation.
pub async fn count(db: &Database, conversation_id: &str) -> Result<usize, LullError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pending_queue WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete entries with `timestamp <= until`; later arrivals stay queued.
pub async fn trim_until(
    db: &Database,
    conversation_id: &str,
    until: DateTime<Utc>,
) -> Result<usize, LullError> {
    let conversation_id = conversation_id.to_string();
    let until = format_timestamp(&until);
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM pending_queue WHERE conversation_id = ?1 AND timestamp <= ?2",
                params![conversation_id, until],
            )
        })
        .await
        .map_err(map_tr_err)
}
