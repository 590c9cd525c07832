// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced event bus for the Lull response engine.
//!
//! The bus keeps at most one quiet-period timer per conversation. Every
//! presence signal replaces the conversation's timer; only the last one
//! survives to reach the [`PresenceHandler`] subscribers. It also fronts the
//! pending queue and fans out `MessageSent` notifications.

pub mod pending;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lull_core::{LullError, Message, PendingEntry, PendingQueue, PresenceEvent};
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub use pending::InMemoryPendingQueue;

/// Subscriber for presence events that outlived their quiet period.
#[async_trait]
pub trait PresenceHandler: Send + Sync {
    async fn handle(&self, event: &PresenceEvent) -> Result<(), LullError>;
}

/// Subscriber for replies the transport accepted.
#[async_trait]
pub trait MessageSentHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), LullError>;
}

struct TimerSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    timers: DashMap<String, TimerSlot>,
    next_generation: AtomicU64,
    pending: Arc<dyn PendingQueue>,
    presence_handlers: RwLock<Vec<Arc<dyn PresenceHandler>>>,
    sent_handlers: RwLock<Vec<Arc<dyn MessageSentHandler>>>,
}

impl Inner {
    async fn publish_presence(&self, event: &PresenceEvent) {
        let handlers = snapshot(&self.presence_handlers);
        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                error!(
                    conversation_id = %event.conversation_id,
                    state = %event.state,
                    error = %e,
                    "presence handler failed"
                );
            }
        }
    }
}

fn snapshot<T: ?Sized>(lock: &RwLock<Vec<Arc<T>>>) -> Vec<Arc<T>> {
    lock.read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Per-conversation trailing-edge debounce plus handler fan-out.
///
/// Cloning is cheap; clones share timers, handlers and the pending queue.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Create a bus buffering pending messages in `pending`.
    pub fn new(pending: Arc<dyn PendingQueue>) -> Self {
        Self {
            inner: Arc::new(Inner {
                timers: DashMap::new(),
                next_generation: AtomicU64::new(0),
                pending,
                presence_handlers: RwLock::new(Vec::new()),
                sent_handlers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// A bus backed by an [`InMemoryPendingQueue`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryPendingQueue::new()))
    }

    /// Arm (or re-arm) the conversation's timer.
    ///
    /// Any outstanding timer for the same conversation is cancelled; `event`
    /// is delivered `delay` after the last call unless replaced again.
    /// Must be called from within a Tokio runtime.
    pub fn emit_presence_debounced(&self, event: PresenceEvent, delay: Duration) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let key = event.conversation_id.clone();

        match self.inner.timers.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let handle = self.spawn_timer(key, generation, event, delay);
                let previous = slot.insert(TimerSlot { generation, handle });
                previous.handle.abort();
                debug!(conversation_id = %slot.key(), generation, "debounce timer reset");
            }
            Entry::Vacant(slot) => {
                let handle = self.spawn_timer(key, generation, event, delay);
                slot.insert(TimerSlot { generation, handle });
            }
        }
    }

    fn spawn_timer(
        &self,
        key: String,
        generation: u64,
        event: PresenceEvent,
        delay: Duration,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fired = inner
                .timers
                .remove_if(&key, |_, slot| slot.generation == generation)
                .is_some();
            if fired {
                debug!(conversation_id = %key, state = %event.state, "debounce elapsed");
                inner.publish_presence(&event).await;
            }
        })
    }

    /// Buffer an inbound message until a reply covers it.
    pub async fn enqueue_message(&self, message: &Message) -> Result<(), LullError> {
        self.inner
            .pending
            .enqueue(&message.conversation_id, PendingEntry::from(message))
            .await
    }

    /// Number of buffered messages for the conversation.
    pub async fn get_messages_count(&self, conversation_id: &str) -> Result<usize, LullError> {
        self.inner.pending.count(conversation_id).await
    }

    /// Drop buffered messages with `timestamp <= until`.
    pub async fn trim_messages_until(
        &self,
        conversation_id: &str,
        until: DateTime<Utc>,
    ) -> Result<usize, LullError> {
        self.inner.pending.trim_until(conversation_id, until).await
    }

    /// Subscribe to debounced presence events.
    pub fn on_presence_debounced(&self, handler: Arc<dyn PresenceHandler>) {
        self.inner
            .presence_handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }

    /// Subscribe to sent replies.
    pub fn on_message_sent(&self, handler: Arc<dyn MessageSentHandler>) {
        self.inner
            .sent_handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }

    /// Notify `MessageSent` subscribers in registration order.
    ///
    /// Handler errors are logged and never returned to the publisher.
    pub async fn publish_message_sent(&self, message: &Message) {
        let handlers = snapshot(&self.inner.sent_handlers);
        for handler in handlers {
            if let Err(e) = handler.handle(message).await {
                error!(
                    conversation_id = %message.conversation_id,
                    external_id = %message.external_id,
                    error = %e,
                    "message-sent handler failed"
                );
            }
        }
    }

    /// Number of timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.len()
    }

    /// Cancel every outstanding timer.
    pub fn shutdown(&self) {
        let keys: Vec<String> = self.inner.timers.iter().map(|e| e.key().clone()).collect();
        let mut cancelled = 0usize;
        for key in keys {
            if let Some((_, slot)) = self.inner.timers.remove(&key) {
                slot.handle.abort();
                cancelled += 1;
            }
        }
        debug!(cancelled, "event bus timers cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lull_core::PresenceState;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    const QUIET: Duration = Duration::from_millis(3000);

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<PresenceEvent>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<PresenceEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PresenceHandler for Recorder {
        async fn handle(&self, event: &PresenceEvent) -> Result<(), LullError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PresenceHandler for Failing {
        async fn handle(&self, _event: &PresenceEvent) -> Result<(), LullError> {
            Err(LullError::Internal("handler exploded".into()))
        }
    }

    #[async_trait]
    impl MessageSentHandler for Failing {
        async fn handle(&self, _message: &Message) -> Result<(), LullError> {
            Err(LullError::Internal("sent handler exploded".into()))
        }
    }

    #[derive(Default)]
    struct SentRecorder {
        ids: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageSentHandler for SentRecorder {
        async fn handle(&self, message: &Message) -> Result<(), LullError> {
            self.ids.lock().unwrap().push(message.external_id.clone());
            Ok(())
        }
    }

    fn bus_with_recorder() -> (EventBus, Arc<Recorder>) {
        let bus = EventBus::in_memory();
        let recorder = Arc::new(Recorder::default());
        bus.on_presence_debounced(recorder.clone());
        (bus, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_events_emit_only_the_last_one() {
        let (bus, recorder) = bus_with_recorder();

        bus.emit_presence_debounced(PresenceEvent::new("c1", PresenceState::Composing), QUIET);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        bus.emit_presence_debounced(PresenceEvent::new("c1", PresenceState::Paused), QUIET);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        bus.emit_presence_debounced(PresenceEvent::new("c1", PresenceState::Unavailable), QUIET);
        assert_eq!(bus.pending_timers(), 1);

        // 2999ms after the last call nothing has fired yet.
        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(recorder.events().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            recorder.events(),
            vec![PresenceEvent::new("c1", PresenceState::Unavailable)]
        );
        assert_eq!(bus.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn conversations_are_debounced_independently() {
        let (bus, recorder) = bus_with_recorder();

        bus.emit_presence_debounced(PresenceEvent::new("c1", PresenceState::Unavailable), QUIET);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        bus.emit_presence_debounced(PresenceEvent::new("c2", PresenceState::Unavailable), QUIET);
        assert_eq!(bus.pending_timers(), 2);

        tokio::time::sleep(Duration::from_millis(1501)).await;
        assert_eq!(recorder.events().len(), 1);
        assert_eq!(recorder.events()[0].conversation_id, "c1");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(recorder.events().len(), 2);
        assert_eq!(recorder.events()[1].conversation_id, "c2");
    }

    #[tokio::test(start_paused = true)]
    async fn handlers_run_in_registration_order_after_a_failure() {
        let bus = EventBus::in_memory();
        let recorder = Arc::new(Recorder::default());
        bus.on_presence_debounced(Arc::new(Failing));
        bus.on_presence_debounced(recorder.clone());

        bus.emit_presence_debounced(PresenceEvent::new("c1", PresenceState::Unavailable), QUIET);
        tokio::time::sleep(QUIET + Duration::from_millis(1)).await;

        assert_eq!(recorder.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_outstanding_timers() {
        let (bus, recorder) = bus_with_recorder();
        bus.emit_presence_debounced(PresenceEvent::new("c1", PresenceState::Unavailable), QUIET);
        bus.emit_presence_debounced(PresenceEvent::new("c2", PresenceState::Unavailable), QUIET);

        bus.shutdown();
        assert_eq!(bus.pending_timers(), 0);

        tokio::time::sleep(QUIET * 2).await;
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn message_sent_errors_are_logged_not_returned() {
        let bus = EventBus::in_memory();
        let recorder = Arc::new(SentRecorder::default());
        bus.on_message_sent(Arc::new(Failing));
        bus.on_message_sent(recorder.clone());

        let sent = Message::outbound("r1", "c1", "hello", Utc::now());
        bus.publish_message_sent(&sent).await;

        assert_eq!(*recorder.ids.lock().unwrap(), vec!["r1".to_string()]);
        assert!(logs_contain("message-sent handler failed"));
        assert!(logs_contain("sent handler exploded"));
    }

    #[tokio::test]
    async fn pending_operations_delegate_to_queue() {
        let bus = EventBus::in_memory();
        let now = Utc::now();
        let first = Message::inbound("w1", "c1", "hi", now);
        let second = Message::inbound("w2", "c1", "there", now + chrono::Duration::seconds(2));

        bus.enqueue_message(&first).await.unwrap();
        bus.enqueue_message(&second).await.unwrap();
        assert_eq!(bus.get_messages_count("c1").await.unwrap(), 2);

        assert_eq!(bus.trim_messages_until("c1", now).await.unwrap(), 1);
        assert_eq!(bus.get_messages_count("c1").await.unwrap(), 1);
    }
}
