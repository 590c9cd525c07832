// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation through the image capability.

use std::sync::Arc;

use async_trait::async_trait;
use lull_core::{ImageAdapter, LullError, OutboundContent, UsageStore};
use tracing::{debug, error};

use crate::handler::DispatchHandler;

pub const INTENT: &str = "generate_image";

/// Generates an image from a `prompt` argument and bills a flat fee.
pub struct ImageHandler {
    image: Arc<dyn ImageAdapter>,
    ledger: Arc<dyn UsageStore>,
    price_usd: f64,
}

impl ImageHandler {
    pub fn new(image: Arc<dyn ImageAdapter>, ledger: Arc<dyn UsageStore>, price_usd: f64) -> Self {
        Self {
            image,
            ledger,
            price_usd,
        }
    }
}

#[async_trait]
impl DispatchHandler for ImageHandler {
    fn name(&self) -> &str {
        INTENT
    }

    fn description(&self) -> &str {
        "Create an image from a text description the user asked for."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Description of the image to generate"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn handle(
        &self,
        conversation_id: &str,
        arguments: &serde_json::Value,
    ) -> Result<OutboundContent, LullError> {
        let prompt = arguments
            .get("prompt")
            .and_then(|p| p.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| LullError::InvalidIntentArguments {
                intent: INTENT.to_string(),
                message: "missing string argument `prompt`".to_string(),
            })?;

        let generated = self.image.generate(prompt).await?;
        debug!(conversation_id, url = %generated.url, "image generated");

        if let Err(e) = self.ledger.add_usage(conversation_id, self.price_usd).await {
            error!(conversation_id, error = %e, "failed to charge image generation");
        }

        let caption = generated
            .revised_prompt
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| prompt.to_string());
        Ok(OutboundContent::Image {
            url: generated.url,
            caption,
        })
    }
}
