// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion adapter trait for the language model that decides each reply.

use async_trait::async_trait;

use crate::error::LullError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Completion, CompletionRequest};

/// Adapter for the external generation capability.
///
/// Given the history and the available intents, the model either replies
/// directly or declares an intent. The returned usage is what the ledger charges.
#[async_trait]
pub trait CompletionAdapter: PluginAdapter {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LullError>;
}
