// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent loop and response orchestration for the Lull response engine.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives messages and presence changes from the transport
//! - Persists and buffers inbound messages
//! - Re-arms each conversation's quiet-period timer
//! - Hands settled conversations to the [`ResponseOrchestrator`]
//! - Drains in-flight cycles on shutdown

pub mod context;
pub mod handler;
pub mod handlers;
pub mod orchestrator;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use lull_bus::{EventBus, InMemoryPendingQueue, PresenceHandler};
use lull_config::model::{LullConfig, PendingBackend};
use lull_core::{
    CompletionAdapter, ImageAdapter, LullError, Message, MessageStore, PendingQueue,
    PresenceEvent, PresenceState, TransportAdapter, TransportEvent, UsageStore,
};
use lull_cost::PricingTable;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use handler::{DispatchHandler, HandlerRegistry};
pub use handlers::register_builtins;
pub use orchestrator::{CycleOutcome, ResponseOrchestrator};

/// External capabilities the engine is wired to.
pub struct Capabilities {
    pub transport: Arc<dyn TransportAdapter>,
    pub completion: Arc<dyn CompletionAdapter>,
    pub image: Arc<dyn ImageAdapter>,
    pub store: Arc<dyn MessageStore>,
    pub ledger: Arc<dyn UsageStore>,
    /// Where buffered messages wait; see [`select_pending_queue`].
    pub pending: Arc<dyn PendingQueue>,
}

/// Picks the pending queue driver for `backend`.
///
/// `durable` is used for [`PendingBackend::Sqlite`], usually the same
/// storage engine that holds the messages.
pub fn select_pending_queue(
    backend: PendingBackend,
    durable: Arc<dyn PendingQueue>,
) -> Arc<dyn PendingQueue> {
    match backend {
        PendingBackend::Memory => Arc::new(InMemoryPendingQueue::new()),
        PendingBackend::Sqlite => durable,
    }
}

/// Coordinates inbound events, the debounce bus and response cycles.
pub struct AgentLoop {
    transport: Arc<dyn TransportAdapter>,
    store: Arc<dyn MessageStore>,
    bus: EventBus,
    orchestrator: Arc<ResponseOrchestrator>,
    quiet_period: Duration,
    drain_timeout: Duration,
}

impl AgentLoop {
    /// Creates an agent loop with the built-in dispatch handlers.
    pub async fn new(config: &LullConfig, caps: Capabilities) -> Result<Self, LullError> {
        let pricing = PricingTable::from_config(&config.pricing);
        let registry = register_builtins(
            &config.replies,
            &pricing,
            Arc::clone(&caps.ledger),
            Arc::clone(&caps.image),
        );
        Self::with_registry(config, caps, registry).await
    }

    /// Creates an agent loop dispatching through `registry`.
    pub async fn with_registry(
        config: &LullConfig,
        caps: Capabilities,
        registry: HandlerRegistry,
    ) -> Result<Self, LullError> {
        let system_prompt = context::load_system_prompt(&config.agent).await?;
        let bus = EventBus::new(caps.pending);

        let orchestrator = Arc::new(ResponseOrchestrator::new(
            Arc::clone(&caps.transport),
            caps.completion,
            Arc::clone(&caps.store),
            caps.ledger,
            bus.clone(),
            registry,
            PricingTable::from_config(&config.pricing),
            system_prompt,
        ));
        let subscriber: Arc<dyn PresenceHandler> = orchestrator.clone();
        bus.on_presence_debounced(subscriber);

        info!(
            agent_name = config.agent.name.as_str(),
            quiet_period_ms = config.debounce.quiet_period_ms,
            "agent loop initialized"
        );

        Ok(Self {
            transport: caps.transport,
            store: caps.store,
            bus,
            orchestrator,
            quiet_period: Duration::from_millis(config.debounce.quiet_period_ms),
            drain_timeout: Duration::from_secs(config.agent.drain_timeout_secs),
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn orchestrator(&self) -> &Arc<ResponseOrchestrator> {
        &self.orchestrator
    }

    /// Runs until `cancel` fires or the transport closes.
    ///
    /// On exit, outstanding timers are cancelled and in-flight cycles are
    /// given up to `agent.drain_timeout_secs` to finish.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), LullError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                event = self.transport.receive() => {
                    match event {
                        Ok(TransportEvent::Message(msg)) => self.on_message_received(msg).await,
                        Ok(TransportEvent::Presence(event)) => self.on_presence_changed(event),
                        Err(LullError::TransportClosed) => {
                            info!("transport closed, stopping agent loop");
                            break;
                        }
                        Err(e) => error!(error = %e, "transport receive error"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        self.bus.shutdown();
        shutdown::drain_cycles(&self.orchestrator, self.drain_timeout).await;
        info!("agent loop stopped");
        Ok(())
    }

    /// Persists and buffers an inbound message, then restarts the quiet period.
    ///
    /// A redelivered message is buffered again only when the buffer is empty
    /// while the store still holds unreplied messages, which happens after a
    /// failed enqueue. The timer is restarted on every path.
    pub async fn on_message_received(&self, msg: Message) {
        let conversation_id = msg.conversation_id.clone();

        match self.store.save_message(&msg).await {
            Ok(true) => self.buffer(&msg).await,
            Ok(false) => {
                if self.buffer_lost(&conversation_id).await {
                    warn!(
                        conversation_id = %conversation_id,
                        external_id = %msg.external_id,
                        "redelivered message re-buffered"
                    );
                    self.buffer(&msg).await;
                } else {
                    debug!(
                        conversation_id = %conversation_id,
                        external_id = %msg.external_id,
                        "duplicate message ignored"
                    );
                }
            }
            Err(e) => {
                error!(
                    entry_point = "on_message_received",
                    conversation_id = %conversation_id,
                    error = %e,
                    "failed to store message"
                );
            }
        }

        self.bus.emit_presence_debounced(
            PresenceEvent::new(conversation_id, PresenceState::Unavailable),
            self.quiet_period,
        );
    }

    async fn buffer(&self, msg: &Message) {
        match self.bus.enqueue_message(msg).await {
            Ok(()) => debug!(
                conversation_id = %msg.conversation_id,
                external_id = %msg.external_id,
                "message buffered"
            ),
            Err(e) => error!(
                entry_point = "on_message_received",
                conversation_id = %msg.conversation_id,
                error = %e,
                "failed to buffer message"
            ),
        }
    }

    /// True when nothing is buffered but stored messages still await a reply.
    async fn buffer_lost(&self, conversation_id: &str) -> bool {
        match self.bus.get_messages_count(conversation_id).await {
            Ok(0) => {}
            _ => return false,
        }
        self.store
            .get_history(conversation_id)
            .await
            .map(|history| !history.unreplied.is_empty())
            .unwrap_or(false)
    }

    /// Restarts the quiet period with the participant's new presence.
    pub fn on_presence_changed(&self, event: PresenceEvent) {
        debug!(
            conversation_id = %event.conversation_id,
            state = %event.state,
            "presence changed"
        );
        self.bus.emit_presence_debounced(event, self.quiet_period);
    }
}
