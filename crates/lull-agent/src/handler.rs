// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch handler trait and registry.
//!
//! A [`DispatchHandler`] claims one declared intent and produces the reply
//! content for it. The [`HandlerRegistry`] routes intent names to handlers,
//! always carries a fallback, and renders the intent definitions offered to
//! the completion capability.

use std::sync::Arc;

use async_trait::async_trait;
use lull_core::types::IntentDefinition;
use lull_core::{LullError, OutboundContent};

/// A pluggable unit that fulfills one response intent.
#[async_trait]
pub trait DispatchHandler: Send + Sync {
    /// The intent name this handler declares to the completion capability.
    fn name(&self) -> &str;

    /// Human-readable description sent alongside the intent.
    fn description(&self) -> &str;

    /// JSON Schema of the intent arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether this handler claims `intent`. Defaults to name equality.
    fn matches(&self, intent: &str) -> bool {
        self.name() == intent
    }

    /// Whether the completion that selected this handler is billed to the
    /// conversation before the handler runs.
    fn charges_completion(&self) -> bool {
        true
    }

    /// Produce the reply for `conversation_id`.
    async fn handle(
        &self,
        conversation_id: &str,
        arguments: &serde_json::Value,
    ) -> Result<OutboundContent, LullError>;
}

/// Ordered set of handlers plus a mandatory fallback.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn DispatchHandler>>,
    fallback: Arc<dyn DispatchHandler>,
}

impl HandlerRegistry {
    /// Creates a registry whose unmatched intents go to `fallback`.
    pub fn with_fallback(fallback: Arc<dyn DispatchHandler>) -> Self {
        Self {
            handlers: Vec::new(),
            fallback,
        }
    }

    /// Registers a handler. A handler with the same name is replaced in place.
    pub fn register(&mut self, handler: Arc<dyn DispatchHandler>) {
        match self
            .handlers
            .iter_mut()
            .find(|existing| existing.name() == handler.name())
        {
            Some(slot) => *slot = handler,
            None => self.handlers.push(handler),
        }
    }

    /// The first registered handler claiming `intent`, then the fallback.
    ///
    /// Returns [`LullError::DispatchMismatch`] when nothing claims it.
    pub fn route(&self, intent: &str) -> Result<Arc<dyn DispatchHandler>, LullError> {
        self.handlers
            .iter()
            .find(|h| h.matches(intent))
            .or_else(|| Some(&self.fallback).filter(|f| f.matches(intent)))
            .cloned()
            .ok_or_else(|| LullError::DispatchMismatch {
                intent: intent.to_string(),
            })
    }

    /// The handler used when routing fails.
    pub fn fallback(&self) -> Arc<dyn DispatchHandler> {
        Arc::clone(&self.fallback)
    }

    /// Intent definitions for every handler including the fallback, sorted by name.
    pub fn intent_definitions(&self) -> Vec<IntentDefinition> {
        let mut defs: Vec<IntentDefinition> = self
            .handlers
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|h| IntentDefinition {
                name: h.name().to_string(),
                description: h.description().to_string(),
                parameters: h.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Number of registered handlers, not counting the fallback.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if only the fallback is present.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
