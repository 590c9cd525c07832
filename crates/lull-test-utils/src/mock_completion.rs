// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion capability for deterministic testing.
//!
//! `MockCompletion` returns pre-configured results in FIFO order and records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lull_core::types::{AdapterType, HealthStatus};
use lull_core::{
    Completion, CompletionAdapter, CompletionRequest, DispatchResult, LullError, PluginAdapter,
    TokenUsage,
};

pub const MOCK_MODEL: &str = "mock-model";

/// A mock completion capability.
///
/// Results are popped from a FIFO queue. When the queue is empty a direct
/// "mock reply" is returned.
pub struct MockCompletion {
    results: Arc<Mutex<VecDeque<Result<DispatchResult, String>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    latency: Option<Duration>,
    usage: TokenUsage,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            latency: None,
            usage: TokenUsage {
                input_tokens: 1_000,
                output_tokens: 500,
            },
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Create a mock pre-loaded with the given results.
    pub fn with_results(results: Vec<DispatchResult>) -> Self {
        let mock = Self::new();
        let queue = results.into_iter().map(Ok).collect();
        Self {
            results: Arc::new(Mutex::new(queue)),
            ..mock
        }
    }

    /// Hold every call for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Token usage reported by every call.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub async fn push_result(&self, result: DispatchResult) {
        self.results.lock().await.push_back(Ok(result));
    }

    /// Queue a failing call.
    pub async fn push_error(&self, message: &str) {
        self.results.lock().await.push_back(Err(message.to_string()));
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn usage(&self) -> TokenUsage {
        self.usage
    }
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockCompletion {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, LullError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LullError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionAdapter for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LullError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.results.lock().await.pop_front();
        self.active.fetch_sub(1, Ordering::SeqCst);

        match next {
            Some(Ok(result)) => Ok(Completion {
                result,
                model: MOCK_MODEL.to_string(),
                usage: self.usage,
            }),
            Some(Err(message)) => Err(LullError::completion(message)),
            None => Ok(Completion {
                result: DispatchResult::Reply {
                    text: "mock reply".to_string(),
                },
                model: MOCK_MODEL.to_string(),
                usage: self.usage,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            conversation_id: "c1".into(),
            system_prompt: None,
            replied: Vec::new(),
            unreplied: Vec::new(),
            intents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn results_are_returned_in_order_then_default() {
        let mock = MockCompletion::with_results(vec![DispatchResult::Intent {
            name: "get_balance".into(),
            arguments: serde_json::json!({}),
        }]);
        mock.push_error("rate limited").await;

        let first = mock.complete(request()).await.unwrap();
        assert!(matches!(first.result, DispatchResult::Intent { .. }));
        assert_eq!(first.model, MOCK_MODEL);

        assert!(matches!(
            mock.complete(request()).await,
            Err(LullError::Completion { .. })
        ));

        let fallback = mock.complete(request()).await.unwrap();
        assert_eq!(
            fallback.result,
            DispatchResult::Reply {
                text: "mock reply".into()
            }
        );
        assert_eq!(mock.call_count().await, 3);
        assert_eq!(mock.max_concurrent_calls(), 1);
    }
}
