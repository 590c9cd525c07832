// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full engine with mock capabilities and a temp
//! SQLite database shared by the message store, the pending queue and the
//! usage ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lull_agent::{AgentLoop, Capabilities, HandlerRegistry, select_pending_queue};
use lull_config::model::{AgentConfig, DebounceConfig, LullConfig, PendingBackend, StorageConfig};
use lull_core::{DispatchResult, LullError, Message, PendingQueue, StorageAdapter};
use lull_cost::UsageLedger;
use lull_storage::SqliteStorage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_completion::MockCompletion;
use crate::mock_image::MockImageGenerator;
use crate::mock_transport::MockTransport;

/// Installs a test-writer subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    results: Vec<DispatchResult>,
    quiet_period_ms: u64,
    system_prompt: Option<String>,
    pending_backend: PendingBackend,
    completion_latency: Option<Duration>,
    pending_queue: Option<Arc<dyn PendingQueue>>,
    registry: Option<Box<dyn FnOnce(&TestHarnessParts) -> HandlerRegistry + Send>>,
}

/// Capabilities handed to a custom registry factory.
pub struct TestHarnessParts {
    pub ledger: Arc<UsageLedger>,
    pub image: Arc<MockImageGenerator>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            quiet_period_ms: 100,
            system_prompt: None,
            pending_backend: PendingBackend::Memory,
            completion_latency: None,
            pending_queue: None,
            registry: None,
        }
    }

    /// Set scripted completion results.
    pub fn with_results(mut self, results: Vec<DispatchResult>) -> Self {
        self.results = results;
        self
    }

    pub fn with_quiet_period_ms(mut self, ms: u64) -> Self {
        self.quiet_period_ms = ms;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn with_pending_backend(mut self, backend: PendingBackend) -> Self {
        self.pending_backend = backend;
        self
    }

    /// Hold every completion call for `latency`.
    pub fn with_completion_latency(mut self, latency: Duration) -> Self {
        self.completion_latency = Some(latency);
        self
    }

    /// Use `queue` instead of the backend named by `with_pending_backend`.
    pub fn with_pending_queue(mut self, queue: Arc<dyn PendingQueue>) -> Self {
        self.pending_queue = Some(queue);
        self
    }

    /// Replace the built-in handlers with a custom registry.
    pub fn with_registry(
        mut self,
        factory: impl FnOnce(&TestHarnessParts) -> HandlerRegistry + Send + 'static,
    ) -> Self {
        self.registry = Some(Box::new(factory));
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LullError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| LullError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = Arc::new(SqliteStorage::new(storage_config.clone()));
        storage.initialize().await?;
        let ledger = Arc::new(UsageLedger::from_storage(&storage)?);

        let mut completion = MockCompletion::with_results(self.results);
        if let Some(latency) = self.completion_latency {
            completion = completion.with_latency(latency);
        }
        let completion = Arc::new(completion);
        let transport = Arc::new(MockTransport::new());
        let image = Arc::new(MockImageGenerator::new());

        let config = LullConfig {
            agent: AgentConfig {
                system_prompt: self.system_prompt,
                drain_timeout_secs: 5,
                ..AgentConfig::default()
            },
            debounce: DebounceConfig {
                quiet_period_ms: self.quiet_period_ms,
                pending_backend: self.pending_backend,
            },
            storage: storage_config,
            ..LullConfig::default()
        };

        let caps = Capabilities {
            transport: transport.clone(),
            completion: completion.clone(),
            image: image.clone(),
            store: storage.clone(),
            ledger: ledger.clone(),
            pending: self.pending_queue.unwrap_or_else(|| {
                select_pending_queue(config.debounce.pending_backend, storage.clone())
            }),
        };

        let agent = match self.registry {
            Some(factory) => {
                let parts = TestHarnessParts {
                    ledger: Arc::clone(&ledger),
                    image: Arc::clone(&image),
                };
                AgentLoop::with_registry(&config, caps, factory(&parts)).await?
            }
            None => AgentLoop::new(&config, caps).await?,
        };

        Ok(TestHarness {
            transport,
            completion,
            image,
            storage,
            ledger,
            agent: Arc::new(agent),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine with mock capabilities and temp storage.
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub completion: Arc<MockCompletion>,
    pub image: Arc<MockImageGenerator>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub ledger: Arc<UsageLedger>,
    pub agent: Arc<AgentLoop>,
    pub config: LullConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Delivers a user message straight to the agent, as if the transport received it.
    pub async fn deliver(&self, conversation_id: &str, external_id: &str, text: &str) -> Message {
        let msg = Message::inbound(external_id, conversation_id, text, Utc::now());
        self.agent.on_message_received(msg.clone()).await;
        msg
    }

    /// Buffered message count for the conversation.
    pub async fn pending_count(&self, conversation_id: &str) -> usize {
        self.agent
            .bus()
            .get_messages_count(conversation_id)
            .await
            .unwrap_or(usize::MAX)
    }

    /// Polls until at least `count` replies were sent or `timeout` elapses.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.transport.sent_count().await >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Polls until no cycle is in flight and no timer is armed.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.agent.orchestrator().in_flight() == 0 && self.agent.bus().pending_timers() == 0
            {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Runs the agent loop in the background.
    pub fn spawn_loop(&self) -> (CancellationToken, JoinHandle<Result<(), LullError>>) {
        let cancel = CancellationToken::new();
        let agent = Arc::clone(&self.agent);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { agent.run(token).await });
        (cancel, handle)
    }
}
