// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fallback for batches that map to no known intent.

use async_trait::async_trait;
use lull_core::{LullError, OutboundContent};

use crate::handler::DispatchHandler;

pub const INTENT: &str = "handle_misunderstanding";

/// Replies with a fixed clarification request. Never bills and calls no capability.
pub struct MisunderstandingHandler {
    reply: String,
}

impl MisunderstandingHandler {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl DispatchHandler for MisunderstandingHandler {
    fn name(&self) -> &str {
        INTENT
    }

    fn description(&self) -> &str {
        "Use when the request is unclear or outside what the assistant can do."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn charges_completion(&self) -> bool {
        false
    }

    async fn handle(
        &self,
        _conversation_id: &str,
        _arguments: &serde_json::Value,
    ) -> Result<OutboundContent, LullError> {
        Ok(OutboundContent::Text(self.reply.clone()))
    }
}
