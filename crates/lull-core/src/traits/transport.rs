// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for chat platform bindings.

use async_trait::async_trait;

use crate::error::LullError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Message, OutboundMessage, TransportEvent};

/// Adapter for the chat platform the conversations live on.
///
/// The transport owns the wire protocol; the engine only sees messages,
/// presence changes and the sent-message record.
#[async_trait]
pub trait TransportAdapter: PluginAdapter {
    /// Sends a reply and returns it as the message the platform recorded.
    async fn send(&self, msg: OutboundMessage) -> Result<Message, LullError>;

    /// Waits for the next inbound message or presence change.
    async fn receive(&self) -> Result<TransportEvent, LullError>;
}
