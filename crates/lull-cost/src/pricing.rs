// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and cost calculation.
//!
//! Rates come from `[pricing]` in the configuration. Model rules are matched
//! in order by case-insensitive substring, so more specific patterns
//! (`gpt-4o-mini`) must precede broader ones (`gpt-4o`).

use lull_config::model::PricingConfig;
use lull_core::TokenUsage;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Cost per million input tokens.
    pub input_per_mtok: f64,
    /// Cost per million output tokens.
    pub output_per_mtok: f64,
}

#[derive(Debug, Clone)]
struct ModelRule {
    pattern: String,
    pricing: ModelPricing,
}

/// Resolved pricing configuration.
#[derive(Debug, Clone)]
pub struct PricingTable {
    rules: Vec<ModelRule>,
    default: ModelPricing,
    image_usd: f64,
}

impl PricingTable {
    /// Build the table from validated configuration.
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            rules: config
                .models
                .iter()
                .map(|m| ModelRule {
                    pattern: m.pattern.to_lowercase(),
                    pricing: ModelPricing {
                        input_per_mtok: m.input_per_mtok,
                        output_per_mtok: m.output_per_mtok,
                    },
                })
                .collect(),
            default: ModelPricing {
                input_per_mtok: config.default_input_per_mtok,
                output_per_mtok: config.default_output_per_mtok,
            },
            image_usd: config.image_usd,
        }
    }

    /// Look up pricing for a given model identifier.
    ///
    /// Unknown models fall back to the default rates so usage is never
    /// silently dropped.
    pub fn get_pricing(&self, model: &str) -> ModelPricing {
        let lower = model.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lower.contains(&rule.pattern))
            .map(|rule| rule.pricing)
            .unwrap_or(self.default)
    }

    /// Cost in USD of one completion call.
    pub fn completion_cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        calculate_cost(usage, &self.get_pricing(model))
    }

    /// Flat charge per generated image.
    pub fn image_usd(&self) -> f64 {
        self.image_usd
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

/// Calculate cost in USD for a given token usage and pricing.
///
/// Formula: sum of (tokens / 1_000_000) * price_per_million for each token type.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let input = (usage.input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok;
    let output = (usage.output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok;
    input + output
}
