// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response cycle tests driving the orchestrator directly, without timers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lull_agent::{CycleOutcome, ResponseOrchestrator, register_builtins};
use lull_bus::EventBus;
use lull_config::model::RepliesConfig;
use lull_core::{
    ChatHistory, DispatchResult, LullError, Message, MessageStore, Role, UsageStore,
};
use lull_cost::{PricingTable, UsageLedger};
use lull_storage::SqliteStorage;
use lull_test_utils::{MockCompletion, MockImageGenerator, MockTransport, init_tracing};

/// Message store whose writes of assistant replies always fail.
struct RejectReplies {
    inner: Arc<SqliteStorage>,
}

#[async_trait]
impl MessageStore for RejectReplies {
    async fn save_message(&self, msg: &Message) -> Result<bool, LullError> {
        if msg.role == Role::Assistant {
            return Err(LullError::storage("disk full"));
        }
        self.inner.save_message(msg).await
    }

    async fn get_history(&self, conversation_id: &str) -> Result<ChatHistory, LullError> {
        self.inner.get_history(conversation_id).await
    }

    async fn get_last_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Message>, LullError> {
        self.inner.get_last_message(conversation_id).await
    }

    async fn mark_replied(&self, conversation_id: &str) -> Result<usize, LullError> {
        self.inner.mark_replied(conversation_id).await
    }
}

struct Fixture {
    storage: Arc<SqliteStorage>,
    ledger: Arc<UsageLedger>,
    transport: Arc<MockTransport>,
    completion: Arc<MockCompletion>,
    bus: EventBus,
    orchestrator: ResponseOrchestrator,
}

async fn fixture_with(
    completion: MockCompletion,
    store: impl FnOnce(Arc<SqliteStorage>) -> Arc<dyn MessageStore>,
) -> Fixture {
    init_tracing();
    let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let ledger = Arc::new(UsageLedger::from_storage(&storage).unwrap());
    let transport = Arc::new(MockTransport::new());
    let completion = Arc::new(completion);
    let bus = EventBus::in_memory();
    let pricing = PricingTable::default();
    let registry = register_builtins(
        &RepliesConfig::default(),
        &pricing,
        ledger.clone(),
        Arc::new(MockImageGenerator::new()),
    );
    let orchestrator = ResponseOrchestrator::new(
        transport.clone(),
        completion.clone(),
        store(storage.clone()),
        ledger.clone(),
        bus.clone(),
        registry,
        pricing,
        None,
    );
    Fixture {
        storage,
        ledger,
        transport,
        completion,
        bus,
        orchestrator,
    }
}

async fn fixture(completion: MockCompletion) -> Fixture {
    fixture_with(completion, |s| s).await
}

impl Fixture {
    /// Stores and buffers a user message the way the agent loop does.
    async fn inbound(&self, external_id: &str, text: &str) -> Message {
        let msg = Message::inbound(external_id, "c1", text, Utc::now());
        assert!(self.storage.save_message(&msg).await.unwrap());
        self.bus.enqueue_message(&msg).await.unwrap();
        msg
    }
}

#[tokio::test]
async fn empty_pending_queue_is_a_no_op() {
    let f = fixture(MockCompletion::new()).await;
    let outcome = f.orchestrator.run_cycle("c1").await.unwrap();
    assert_eq!(outcome, CycleOutcome::NothingPending);
    assert_eq!(f.completion.call_count().await, 0);
}

#[tokio::test]
async fn stale_pending_entries_are_trimmed_without_a_completion() {
    let f = fixture(MockCompletion::new()).await;
    f.inbound("m1", "hello").await;
    f.storage.mark_replied("c1").await.unwrap();

    let outcome = f.orchestrator.run_cycle("c1").await.unwrap();
    assert_eq!(outcome, CycleOutcome::Stale);
    assert_eq!(f.bus.get_messages_count("c1").await.unwrap(), 0);
    assert_eq!(f.completion.call_count().await, 0);
    assert_eq!(f.transport.sent_count().await, 0);
}

#[tokio::test]
async fn reply_covers_the_whole_batch() {
    let f = fixture(MockCompletion::with_results(vec![DispatchResult::Reply {
        text: "Hi! Yes, I can help.".into(),
    }]))
    .await;
    f.inbound("m1", "hi").await;
    f.inbound("m2", "can you help me?").await;

    let outcome = f.orchestrator.run_cycle("c1").await.unwrap();
    let sent = match outcome {
        CycleOutcome::Replied(sent) => sent,
        other => panic!("expected a reply, got {other:?}"),
    };
    assert_eq!(sent.content, "Hi! Yes, I can help.");

    let requests = f.completion.requests().await;
    let request = &requests[0];
    let batch: Vec<&str> = request.unreplied.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(batch, vec!["hi", "can you help me?"]);

    let replies = f.transport.sent_messages().await;
    assert_eq!(replies[0].reply_to.as_deref(), Some("m2"));

    let history = f.storage.get_history("c1").await.unwrap();
    assert!(history.unreplied.is_empty());
    assert_eq!(history.replied.len(), 3);
    assert_eq!(history.replied[2].role, Role::Assistant);
    assert_eq!(f.bus.get_messages_count("c1").await.unwrap(), 0);
}

#[tokio::test]
async fn send_failure_leaves_batch_unreplied_and_pending() {
    let f = fixture(MockCompletion::new()).await;
    f.inbound("m1", "hello").await;
    f.transport.fail_next_sends(1);

    let err = f.orchestrator.run_cycle("c1").await.unwrap_err();
    assert!(matches!(err, LullError::Transport { .. }));

    let history = f.storage.get_history("c1").await.unwrap();
    assert_eq!(history.unreplied.len(), 1);
    assert!(history.replied.is_empty());
    assert_eq!(f.bus.get_messages_count("c1").await.unwrap(), 1);

    // The next cycle answers the same batch.
    let retry = f.orchestrator.run_cycle("c1").await.unwrap();
    assert!(matches!(retry, CycleOutcome::Replied(_)));
    assert_eq!(f.completion.requests().await[1].unreplied.len(), 1);
}

#[tokio::test]
async fn completion_failure_changes_nothing() {
    let f = fixture(MockCompletion::new()).await;
    f.completion.push_error("upstream timeout").await;
    f.inbound("m1", "hello").await;

    let err = f.orchestrator.run_cycle("c1").await.unwrap_err();
    assert!(matches!(err, LullError::Completion { .. }));
    assert_eq!(f.ledger.get_usage("c1").await.unwrap(), 0.0);
    assert_eq!(f.bus.get_messages_count("c1").await.unwrap(), 1);
    assert_eq!(f.transport.sent_count().await, 0);
}

#[tokio::test]
async fn failed_reply_write_still_marks_and_trims() {
    let f = fixture_with(MockCompletion::new(), |storage| {
        Arc::new(RejectReplies { inner: storage })
    })
    .await;
    f.inbound("m1", "hello").await;

    let outcome = f.orchestrator.run_cycle("c1").await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Replied(_)));

    let history = f.storage.get_history("c1").await.unwrap();
    assert!(history.unreplied.is_empty());
    assert!(history.replied.iter().all(|t| t.role == Role::User));
    assert_eq!(f.bus.get_messages_count("c1").await.unwrap(), 0);
}

#[tokio::test]
async fn entries_newer_than_the_reply_survive_trim() {
    let f = fixture(MockCompletion::new()).await;
    f.inbound("m1", "first").await;
    let late = Message::inbound("m2", "c1", "arrived later", Utc::now() + chrono::Duration::seconds(60));
    f.bus.enqueue_message(&late).await.unwrap();

    let outcome = f.orchestrator.run_cycle("c1").await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Replied(_)));
    assert_eq!(f.bus.get_messages_count("c1").await.unwrap(), 1);
}

#[tokio::test]
async fn unavailable_is_the_only_trigger_state() {
    use lull_bus::PresenceHandler;
    use lull_core::{PresenceEvent, PresenceState};

    let f = fixture(MockCompletion::new()).await;
    f.inbound("m1", "hello").await;

    for state in [
        PresenceState::Available,
        PresenceState::Composing,
        PresenceState::Recording,
        PresenceState::Paused,
    ] {
        f.orchestrator
            .handle(&PresenceEvent::new("c1", state))
            .await
            .unwrap();
    }
    assert_eq!(f.completion.call_count().await, 0);

    f.orchestrator
        .handle(&PresenceEvent::new("c1", PresenceState::Unavailable))
        .await
        .unwrap();
    assert_eq!(f.transport.sent_count().await, 1);
}

#[tokio::test]
async fn concurrent_trigger_folds_into_one_follow_up() {
    let f = fixture(MockCompletion::new().with_latency(Duration::from_millis(300))).await;
    f.inbound("m1", "hello").await;

    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.orchestrator.in_flight(), 1);
        f.inbound("m2", "are you there?").await;
        f.orchestrator.trigger("c1").await;
    };
    tokio::join!(f.orchestrator.trigger("c1"), second);

    assert_eq!(f.completion.max_concurrent_calls(), 1);
    // The follow-up re-checked the queue; m2 was covered by the first reply.
    assert_eq!(f.completion.call_count().await, 1);
    assert_eq!(f.transport.sent_count().await, 1);
    assert_eq!(f.orchestrator.in_flight(), 0);
    assert!(f.storage.get_history("c1").await.unwrap().unreplied.is_empty());
}

#[tokio::test]
async fn conversations_do_not_block_each_other() {
    let f = fixture(MockCompletion::new().with_latency(Duration::from_millis(100))).await;
    for conv in ["c1", "c2"] {
        let msg = Message::inbound(format!("{conv}-m1"), conv, "hello", Utc::now());
        f.storage.save_message(&msg).await.unwrap();
        f.bus.enqueue_message(&msg).await.unwrap();
    }

    tokio::join!(f.orchestrator.trigger("c1"), f.orchestrator.trigger("c2"));

    assert_eq!(f.completion.max_concurrent_calls(), 2);
    assert_eq!(f.transport.sent_count().await, 2);
}
