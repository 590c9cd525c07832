// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response cycles.
//!
//! When a conversation's quiet period elapses the [`ResponseOrchestrator`]
//! answers every unreplied message with a single reply: it loads the
//! history, asks the completion capability what to do, dispatches to a
//! handler, bills the conversation, sends the reply and then records it.
//!
//! At most one cycle runs per conversation. A trigger arriving while a cycle
//! is in flight is folded into one follow-up cycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lull_bus::{EventBus, PresenceHandler};
use lull_core::{
    CompletionAdapter, DispatchResult, LullError, Message, MessageStore, OutboundContent,
    OutboundMessage, PresenceEvent, PresenceState, Role, TransportAdapter, UsageStore,
};
use lull_cost::PricingTable;
use tracing::{debug, error, info, warn};

use crate::context::build_request;
use crate::handler::HandlerRegistry;

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The pending queue was empty.
    NothingPending,
    /// Pending entries existed but every message was already replied; they were trimmed.
    Stale,
    /// A reply was sent; carries the message the transport recorded.
    Replied(Message),
}

/// Drives response cycles for every conversation.
pub struct ResponseOrchestrator {
    transport: Arc<dyn TransportAdapter>,
    completion: Arc<dyn CompletionAdapter>,
    store: Arc<dyn MessageStore>,
    ledger: Arc<dyn UsageStore>,
    bus: EventBus,
    registry: HandlerRegistry,
    pricing: PricingTable,
    system_prompt: Option<String>,
    /// conversation id -> rerun requested
    in_flight: DashMap<String, bool>,
}

/// Clears the in-flight slot if a cycle unwinds without reaching the normal exit.
struct FlightGuard<'a> {
    in_flight: &'a DashMap<String, bool>,
    conversation_id: &'a str,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.in_flight.remove(self.conversation_id);
        }
    }
}

impl ResponseOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn TransportAdapter>,
        completion: Arc<dyn CompletionAdapter>,
        store: Arc<dyn MessageStore>,
        ledger: Arc<dyn UsageStore>,
        bus: EventBus,
        registry: HandlerRegistry,
        pricing: PricingTable,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            transport,
            completion,
            store,
            ledger,
            bus,
            registry,
            pricing,
            system_prompt,
            in_flight: DashMap::new(),
        }
    }

    /// Number of conversations with a cycle in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Runs a cycle for `conversation_id`, or requests a rerun if one is in flight.
    ///
    /// Cycle errors are logged, never returned.
    pub async fn trigger(&self, conversation_id: &str) {
        match self.in_flight.entry(conversation_id.to_string()) {
            Entry::Occupied(mut slot) => {
                *slot.get_mut() = true;
                debug!(conversation_id, "cycle in flight, rerun requested");
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(false);
            }
        }

        let mut guard = FlightGuard {
            in_flight: &self.in_flight,
            conversation_id,
            armed: true,
        };

        loop {
            match self.run_cycle(conversation_id).await {
                Ok(outcome) => debug!(conversation_id, ?outcome, "response cycle finished"),
                Err(e) => error!(conversation_id, error = %e, "response cycle failed"),
            }
            if !self.take_rerun(conversation_id) {
                break;
            }
            debug!(conversation_id, "running requested follow-up cycle");
        }

        guard.armed = false;
    }

    /// Clears a pending rerun request, or releases the slot if there is none.
    fn take_rerun(&self, conversation_id: &str) -> bool {
        match self.in_flight.entry(conversation_id.to_string()) {
            Entry::Occupied(mut slot) => {
                if *slot.get() {
                    *slot.get_mut() = false;
                    true
                } else {
                    slot.remove();
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    /// One pass through generate, dispatch, send and record.
    pub async fn run_cycle(&self, conversation_id: &str) -> Result<CycleOutcome, LullError> {
        let pending = self.bus.get_messages_count(conversation_id).await?;
        if pending == 0 {
            return Ok(CycleOutcome::NothingPending);
        }

        let history = self.store.get_history(conversation_id).await?;
        if history.unreplied.is_empty() {
            let trimmed = self
                .bus
                .trim_messages_until(conversation_id, Utc::now())
                .await?;
            debug!(conversation_id, trimmed, "no unreplied messages, dropped stale pending entries");
            return Ok(CycleOutcome::Stale);
        }

        let batch = history.unreplied.len();
        let request = build_request(
            conversation_id,
            self.system_prompt.as_deref(),
            history,
            self.registry.intent_definitions(),
        );
        let completion = self.completion.complete(request).await?;
        debug!(
            conversation_id,
            model = %completion.model,
            batch,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );

        let content = match completion.result {
            DispatchResult::Reply { text } => {
                self.charge_completion(conversation_id, &completion.model, &completion.usage)
                    .await;
                OutboundContent::Text(text)
            }
            DispatchResult::Intent { name, arguments } => {
                let handler = match self.registry.route(&name) {
                    Ok(handler) => handler,
                    Err(LullError::DispatchMismatch { intent }) => {
                        warn!(conversation_id, intent = %intent, "unknown intent, using fallback");
                        self.registry.fallback()
                    }
                    Err(e) => return Err(e),
                };
                if handler.charges_completion() {
                    self.charge_completion(conversation_id, &completion.model, &completion.usage)
                        .await;
                }
                debug!(conversation_id, handler = handler.name(), "dispatching intent");
                handler.handle(conversation_id, &arguments).await?
            }
        };

        let reply_to = match self.store.get_last_message(conversation_id).await {
            Ok(last) => last
                .filter(|m| m.role == Role::User)
                .map(|m| m.external_id),
            Err(e) => {
                warn!(conversation_id, error = %e, "could not load last message for reply_to");
                None
            }
        };

        let sent = self
            .transport
            .send(OutboundMessage {
                conversation_id: conversation_id.to_string(),
                content,
                reply_to,
            })
            .await?;

        self.finalize(conversation_id, &sent).await;
        self.bus.publish_message_sent(&sent).await;
        info!(
            conversation_id,
            external_id = %sent.external_id,
            batch,
            "reply sent"
        );
        Ok(CycleOutcome::Replied(sent))
    }

    async fn charge_completion(
        &self,
        conversation_id: &str,
        model: &str,
        usage: &lull_core::TokenUsage,
    ) {
        let cost = self.pricing.completion_cost(model, usage);
        match self.ledger.add_usage(conversation_id, cost).await {
            Ok(total) => debug!(conversation_id, cost, total, "completion charged"),
            Err(e) => error!(conversation_id, cost, error = %e, "failed to charge completion"),
        }
    }

    /// Records a delivered reply. Each step runs regardless of the others.
    async fn finalize(&self, conversation_id: &str, sent: &Message) {
        if let Err(e) = self.store.save_message(sent).await {
            warn!(conversation_id, external_id = %sent.external_id, error = %e, "failed to store sent reply");
        }
        match self.store.mark_replied(conversation_id).await {
            Ok(marked) => debug!(conversation_id, marked, "messages marked replied"),
            Err(e) => warn!(conversation_id, error = %e, "failed to mark messages replied"),
        }
        match self
            .bus
            .trim_messages_until(conversation_id, sent.timestamp)
            .await
        {
            Ok(trimmed) => debug!(conversation_id, trimmed, "pending entries trimmed"),
            Err(e) => warn!(conversation_id, error = %e, "failed to trim pending entries"),
        }
    }
}

#[async_trait]
impl PresenceHandler for ResponseOrchestrator {
    async fn handle(&self, event: &PresenceEvent) -> Result<(), LullError> {
        if event.state != PresenceState::Unavailable {
            debug!(
                conversation_id = %event.conversation_id,
                state = %event.state,
                "presence settled without going quiet"
            );
            return Ok(());
        }
        self.trigger(&event.conversation_id).await;
        Ok(())
    }
}
