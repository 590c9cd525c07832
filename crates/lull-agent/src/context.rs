// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion request assembly.
//!
//! Loads the system prompt from config and builds the request sent to the
//! completion capability from a conversation's history and the registry's
//! intent definitions.

use lull_config::model::AgentConfig;
use lull_core::types::IntentDefinition;
use lull_core::{ChatHistory, CompletionRequest, LullError};
use tracing::{info, warn};

/// Loads the system prompt following config priority: file > inline > none.
///
/// An unreadable or empty prompt file falls through to the inline prompt.
pub async fn load_system_prompt(config: &AgentConfig) -> Result<Option<String>, LullError> {
    if let Some(ref file_path) = config.system_prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    info!(path = file_path.as_str(), "loaded system prompt from file");
                    return Ok(Some(trimmed.to_string()));
                }
            }
            Err(e) => {
                warn!(
                    path = file_path.as_str(),
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    Ok(config
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from))
}

/// Builds the completion request for one response cycle.
pub fn build_request(
    conversation_id: &str,
    system_prompt: Option<&str>,
    history: ChatHistory,
    intents: Vec<IntentDefinition>,
) -> CompletionRequest {
    CompletionRequest {
        conversation_id: conversation_id.to_string(),
        system_prompt: system_prompt.map(String::from),
        replied: history.replied,
        unreplied: history.unreplied,
        intents,
    }
}
