// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across capability traits and the Lull engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LullError;

/// Fixed-width timestamp format used at every persistence boundary.
///
/// Microsecond precision with a literal `Z` keeps lexical order equal to
/// chronological order, which the SQLite `<=` comparisons rely on.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Encode a UTC timestamp for storage.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode a timestamp previously written by [`format_timestamp`] (or any RFC 3339 string).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LullError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| LullError::Storage {
            source: Box::new(e),
        })
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of capability an adapter provides.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Completion,
    Image,
    Storage,
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chat message as recorded by the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Row identifier assigned by the store. `None` until persisted.
    pub id: Option<i64>,
    /// Transport-supplied identifier; unique across all messages.
    pub external_id: String,
    pub conversation_id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    /// Set in bulk once the conversation's response cycle completes.
    pub replied: bool,
}

impl Message {
    /// A message received from a participant.
    pub fn inbound(
        external_id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            external_id: external_id.into(),
            conversation_id: conversation_id.into(),
            content: content.into(),
            role: Role::User,
            timestamp,
            replied: false,
        }
    }

    /// A reply produced by the engine and accepted by the transport.
    ///
    /// Replies are stored already marked as replied: they answer a batch and
    /// are never themselves awaiting a response.
    pub fn outbound(
        external_id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            external_id: external_id.into(),
            conversation_id: conversation_id.into(),
            content: content.into(),
            role: Role::Assistant,
            timestamp,
            replied: true,
        }
    }
}

/// One `{role, content}` pair of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// A conversation's history split by reply status, each in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub replied: Vec<HistoryTurn>,
    pub unreplied: Vec<HistoryTurn>,
}

/// A message buffered while the conversation is still active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub external_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for PendingEntry {
    fn from(msg: &Message) -> Self {
        Self {
            external_id: msg.external_id.clone(),
            content: msg.content.clone(),
            timestamp: msg.timestamp,
        }
    }
}

/// Participant presence as reported by the transport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    Available,
    Unavailable,
    Composing,
    Recording,
    Paused,
}

/// A presence change for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub conversation_id: String,
    pub state: PresenceState,
}

impl PresenceEvent {
    pub fn new(conversation_id: impl Into<String>, state: PresenceState) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            state,
        }
    }
}

/// An event delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(Message),
    Presence(PresenceEvent),
}

/// Token counts reported by a completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// An intent the completion capability may declare instead of replying directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the intent's arguments.
    pub parameters: serde_json::Value,
}

/// What the completion capability decided to do with the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchResult {
    /// Send this text as the reply.
    Reply { text: String },
    /// Route to the dispatch handler that claims `name`.
    Intent {
        name: String,
        arguments: serde_json::Value,
    },
}

/// Input to a completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub conversation_id: String,
    pub system_prompt: Option<String>,
    /// Already answered turns, for context.
    pub replied: Vec<HistoryTurn>,
    /// The batch to respond to.
    pub unreplied: Vec<HistoryTurn>,
    pub intents: Vec<IntentDefinition>,
}

/// Output of a completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub result: DispatchResult,
    pub model: String,
    pub usage: TokenUsage,
}

/// A generated image returned by the image capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub revised_prompt: Option<String>,
}

/// Reply payload handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundContent {
    Text(String),
    Image { url: String, caption: String },
}

impl OutboundContent {
    /// The text recorded in the message store for this reply.
    pub fn stored_text(&self) -> String {
        match self {
            OutboundContent::Text(text) => text.clone(),
            OutboundContent::Image { url, caption } if caption.is_empty() => url.clone(),
            OutboundContent::Image { url, caption } => format!("{caption}\n{url}"),
        }
    }
}

/// A reply to be sent through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub conversation_id: String,
    pub content: OutboundContent,
    /// External id of the message being answered, when the transport supports quoting.
    pub reply_to: Option<String>,
}
