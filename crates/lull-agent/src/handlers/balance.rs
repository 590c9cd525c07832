// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balance inquiry: reports how much the conversation has spent.

use std::sync::Arc;

use async_trait::async_trait;
use lull_core::{LullError, OutboundContent, UsageStore};

use crate::handler::DispatchHandler;

pub const INTENT: &str = "get_balance";

pub struct BalanceHandler {
    ledger: Arc<dyn UsageStore>,
    template: String,
}

impl BalanceHandler {
    /// `template` must contain `{amount}`, replaced by the spend in USD.
    pub fn new(ledger: Arc<dyn UsageStore>, template: impl Into<String>) -> Self {
        Self {
            ledger,
            template: template.into(),
        }
    }

    fn render(&self, amount: f64) -> String {
        self.template.replace("{amount}", &format!("{amount:.2}"))
    }
}

#[async_trait]
impl DispatchHandler for BalanceHandler {
    fn name(&self) -> &str {
        INTENT
    }

    fn description(&self) -> &str {
        "Tell the user how much this conversation has cost so far."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn handle(
        &self,
        conversation_id: &str,
        _arguments: &serde_json::Value,
    ) -> Result<OutboundContent, LullError> {
        let amount = self.ledger.get_usage(conversation_id).await?;
        Ok(OutboundContent::Text(self.render(amount)))
    }
}
