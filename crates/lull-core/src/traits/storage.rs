// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence capabilities: the storage engine lifecycle, the message store,
//! the usage ledger and the pending queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LullError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatHistory, Message, PendingEntry};

/// Lifecycle of a persistence backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), LullError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), LullError>;
}

/// Durable, idempotent record of every inbound and outbound message.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Inserts `msg` unless a row with the same `external_id` exists.
    ///
    /// Returns `true` when a new row was written. A duplicate is not an error.
    async fn save_message(&self, msg: &Message) -> Result<bool, LullError>;

    /// All of a conversation's messages partitioned by reply status.
    ///
    /// An unknown conversation yields two empty sequences.
    async fn get_history(&self, conversation_id: &str) -> Result<ChatHistory, LullError>;

    /// The most recent message of a conversation by timestamp.
    async fn get_last_message(&self, conversation_id: &str)
    -> Result<Option<Message>, LullError>;

    /// Marks every currently unreplied message of the conversation as replied.
    ///
    /// Returns how many rows changed; zero on a repeated call.
    async fn mark_replied(&self, conversation_id: &str) -> Result<usize, LullError>;
}

/// Per-conversation accumulated spend.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Total spent so far; `0.0` for a conversation never charged.
    async fn get_usage(&self, conversation_id: &str) -> Result<f64, LullError>;

    /// Atomically adds `delta` and returns the new total.
    async fn add_usage(&self, conversation_id: &str, delta: f64) -> Result<f64, LullError>;
}

/// Buffer of messages awaiting a response.
#[async_trait]
pub trait PendingQueue: Send + Sync {
    async fn enqueue(&self, conversation_id: &str, entry: PendingEntry) -> Result<(), LullError>;

    async fn count(&self, conversation_id: &str) -> Result<usize, LullError>;

    /// Drops every entry with `timestamp <= until`; returns how many were removed.
    async fn trim_until(
        &self,
        conversation_id: &str,
        until: DateTime<Utc>,
    ) -> Result<usize, LullError>;
}
