// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.

use std::str::FromStr;

use lull_core::types::{format_timestamp, parse_timestamp};
use lull_core::{ChatHistory, HistoryTurn, LullError, Message, Role};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Raw `messages` row before role and timestamp decoding.
struct MessageRow {
    id: i64,
    external_id: String,
    conversation_id: String,
    content: String,
    role: String,
    timestamp: String,
    replied: bool,
}

impl MessageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            external_id: row.get(1)?,
            conversation_id: row.get(2)?,
            content: row.get(3)?,
            role: row.get(4)?,
            timestamp: row.get(5)?,
            replied: row.get(6)?,
        })
    }

    fn into_message(self) -> Result<Message, LullError> {
        Ok(Message {
            id: Some(self.id),
            external_id: self.external_id,
            conversation_id: self.conversation_id,
            content: self.content,
            role: decode_role(&self.role)?,
            timestamp: parse_timestamp(&self.timestamp)?,
            replied: self.replied,
        })
    }
}

fn decode_role(raw: &str) -> Result<Role, LullError> {
    Role::from_str(raw).map_err(|_| LullError::storage(format!("unknown message role `{raw}`")))
}

/// Insert a message unless one with the same `external_id` already exists.
///
/// Returns `true` when a row was written.
pub async fn save_message(db: &Database, msg: &Message) -> Result<bool, LullError> {
    let external_id = msg.external_id.clone();
    let conversation_id = msg.conversation_id.clone();
    let content = msg.content.clone();
    let role = msg.role.to_string();
    let timestamp = format_timestamp(&msg.timestamp);
    let replied = msg.replied;

    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO messages (external_id, conversation_id, content, role, timestamp, replied)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(external_id) DO NOTHING",
                params![external_id, conversation_id, content, role, timestamp, replied],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// A conversation's messages split by reply status, each in insertion order.
pub async fn get_history(db: &Database, conversation_id: &str) -> Result<ChatHistory, LullError> {
    let conversation_id = conversation_id.to_string();
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<(String, String, bool)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT role, content, replied FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    let mut history = ChatHistory::default();
    for (role, content, replied) in rows {
        let turn = HistoryTurn {
            role: decode_role(&role)?,
            content,
        };
        if replied {
            history.replied.push(turn);
        } else {
            history.unreplied.push(turn);
        }
    }
    Ok(history)
}

/// The most recent message of a conversation; ties on timestamp go to the later insert.
pub async fn get_last_message(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<Message>, LullError> {
    let conversation_id = conversation_id.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<MessageRow>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, external_id, conversation_id, content, role, timestamp, replied
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT 1",
                params![conversation_id],
                MessageRow::from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    row.map(MessageRow::into_message).transpose()
}

/// Flip every unreplied message of the conversation to replied.
pub async fn mark_replied(db: &Database, conversation_id: &str) -> Result<usize, LullError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE messages SET replied = 1 WHERE conversation_id = ?1 AND replied = 0",
                params![conversation_id],
            )
        })
        .await
        .map_err(map_tr_err)
}
