// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `TransportAdapter` with injectable inbound
//! events and captured outbound replies for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use lull_core::types::{AdapterType, HealthStatus};
use lull_core::{
    LullError, Message, OutboundMessage, PluginAdapter, PresenceEvent, PresenceState,
    TransportAdapter, TransportEvent,
};

/// A mock transport for testing.
///
/// Provides two queues:
/// - **inbound**: events injected via `inject_*()` are returned by `receive()`
/// - **sent**: replies passed to `send()` are captured and retrievable via `sent_messages()`
///
/// After [`close`](Self::close), `receive()` drains the queue and then
/// returns [`LullError::TransportClosed`].
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<TransportEvent>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    failing_sends: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            failing_sends: AtomicUsize::new(0),
        }
    }

    /// Queue an arbitrary event for `receive()`.
    pub async fn inject(&self, event: TransportEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Queue a user message timestamped now.
    pub async fn inject_message(&self, conversation_id: &str, external_id: &str, text: &str) {
        self.inject(TransportEvent::Message(Message::inbound(
            external_id,
            conversation_id,
            text,
            Utc::now(),
        )))
        .await;
    }

    /// Queue a presence change.
    pub async fn inject_presence(&self, conversation_id: &str, state: PresenceState) {
        self.inject(TransportEvent::Presence(PresenceEvent::new(
            conversation_id,
            state,
        )))
        .await;
    }

    /// Make the next `count` sends fail with a transport error.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Stop delivering events once the queue is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Get all replies that were accepted by `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, LullError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LullError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn send(&self, msg: OutboundMessage) -> Result<Message, LullError> {
        let should_fail = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(LullError::transport("mock send rejected"));
        }

        let sent = Message::outbound(
            format!("mock-out-{}", uuid::Uuid::new_v4()),
            msg.conversation_id.clone(),
            msg.content.stored_text(),
            Utc::now(),
        );
        self.sent.lock().await.push(msg);
        Ok(sent)
    }

    async fn receive(&self) -> Result<TransportEvent, LullError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(LullError::TransportClosed);
            }
            self.notify.notified().await;
        }
    }
}
