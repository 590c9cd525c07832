// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock image capability.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lull_core::types::{AdapterType, GeneratedImage, HealthStatus};
use lull_core::{ImageAdapter, LullError, PluginAdapter};

/// Returns `https://images.test/<n>.png` for the n-th prompt and records prompts.
pub struct MockImageGenerator {
    prompts: Arc<Mutex<Vec<String>>>,
    revised_prompt: Option<String>,
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            revised_prompt: None,
        }
    }

    /// Report `revised` as the capability's rewritten prompt.
    pub fn with_revised_prompt(mut self, revised: &str) -> Self {
        self.revised_prompt = Some(revised.to_string());
        self
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockImageGenerator {
    fn name(&self) -> &str {
        "mock-image"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Image
    }

    async fn health_check(&self) -> Result<HealthStatus, LullError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LullError> {
        Ok(())
    }
}

#[async_trait]
impl ImageAdapter for MockImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, LullError> {
        let mut prompts = self.prompts.lock().await;
        prompts.push(prompt.to_string());
        Ok(GeneratedImage {
            url: format!("https://images.test/{}.png", prompts.len()),
            revised_prompt: self.revised_prompt.clone(),
        })
    }
}
