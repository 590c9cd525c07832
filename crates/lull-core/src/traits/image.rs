// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation adapter trait.

use async_trait::async_trait;

use crate::error::LullError;
use crate::traits::adapter::PluginAdapter;
use crate::types::GeneratedImage;

/// Adapter for an external image generation service.
#[async_trait]
pub trait ImageAdapter: PluginAdapter {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, LullError>;
}
