// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Lull response engine.
//!
//! This crate provides the capability traits, error type, and domain types
//! shared by every other crate in the workspace. Transport bindings, model
//! clients and storage drivers implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LullError;
pub use types::{
    AdapterType, ChatHistory, Completion, CompletionRequest, DispatchResult, HealthStatus,
    HistoryTurn, Message, OutboundContent, OutboundMessage, PendingEntry, PresenceEvent,
    PresenceState, Role, TokenUsage, TransportEvent,
};

pub use traits::{
    CompletionAdapter, ImageAdapter, MessageStore, PendingQueue, PluginAdapter, StorageAdapter,
    TransportAdapter, UsageStore,
};
