// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Lull response engine.

use thiserror::Error;

/// The primary error type used across all Lull capability traits and core operations.
#[derive(Debug, Error)]
pub enum LullError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence and ledger failures (database connection, query failure, decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport failures (send rejected, connection closed, malformed inbound event).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transport has shut down and will deliver no further events.
    #[error("transport closed")]
    TransportClosed,

    /// Failures reported by the external completion or image generation capability.
    #[error("completion error: {message}")]
    Completion {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No dispatch handler claims the declared intent.
    ///
    /// The orchestrator resolves this by routing to the fallback handler; it is
    /// never surfaced to the conversation as a failure.
    #[error("no dispatch handler matches intent `{intent}`")]
    DispatchMismatch { intent: String },

    /// A handler matched but the intent arguments were unusable.
    #[error("invalid arguments for intent `{intent}`: {message}")]
    InvalidIntentArguments { intent: String, message: String },

    /// A usage increment that would not keep the ledger monotonic.
    #[error("usage delta must be finite and non-negative, got {delta}")]
    InvalidUsage { delta: f64 },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LullError {
    /// Shorthand for a storage error carrying only a message.
    pub fn storage(message: impl Into<String>) -> Self {
        let message: String = message.into();
        LullError::Storage {
            source: message.into(),
        }
    }

    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        LullError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a completion error without an underlying source.
    pub fn completion(message: impl Into<String>) -> Self {
        LullError::Completion {
            message: message.into(),
            source: None,
        }
    }
}
