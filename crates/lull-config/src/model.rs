// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Lull response engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Lull configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LullConfig {
    /// Assistant identity and lifecycle settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Quiet-period detection settings.
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Completion and image pricing used by the usage ledger.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Canned reply texts.
    #[serde(default)]
    pub replies: RepliesConfig,
}

/// Assistant identity and lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a markdown file containing the system prompt.
    /// Takes precedence over `system_prompt` if both are set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// Upper bound on waiting for in-flight response cycles at shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_agent_name() -> String {
    "lull".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Where buffered messages wait for a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingBackend {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// `pending_queue` table in the main database.
    Sqlite,
}

/// Quiet-period detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebounceConfig {
    /// Milliseconds without a new message or presence change before a
    /// conversation is answered.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Pending queue driver.
    #[serde(default)]
    pub pending_backend: PendingBackend,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
            pending_backend: PendingBackend::default(),
        }
    }
}

fn default_quiet_period_ms() -> u64 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("lull").join("lull.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "lull.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Rates for models whose identifier contains `pattern`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelPricingConfig {
    /// Case-insensitive substring matched against the completion's model id.
    pub pattern: String,
    /// USD per million input tokens.
    pub input_per_mtok: f64,
    /// USD per million output tokens.
    pub output_per_mtok: f64,
}

/// Pricing configuration.
///
/// Model rules are checked in order; the first pattern contained in the
/// model id wins, otherwise the default rates apply.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    #[serde(default = "default_input_per_mtok")]
    pub default_input_per_mtok: f64,

    #[serde(default = "default_output_per_mtok")]
    pub default_output_per_mtok: f64,

    /// Flat USD charge per generated image.
    #[serde(default = "default_image_usd")]
    pub image_usd: f64,

    #[serde(default = "default_models")]
    pub models: Vec<ModelPricingConfig>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_input_per_mtok: default_input_per_mtok(),
            default_output_per_mtok: default_output_per_mtok(),
            image_usd: default_image_usd(),
            models: default_models(),
        }
    }
}

fn default_input_per_mtok() -> f64 {
    2.50
}

fn default_output_per_mtok() -> f64 {
    10.0
}

fn default_image_usd() -> f64 {
    0.04
}

fn default_models() -> Vec<ModelPricingConfig> {
    vec![
        ModelPricingConfig {
            pattern: "gpt-4o-mini".to_string(),
            input_per_mtok: 0.15,
            output_per_mtok: 0.60,
        },
        ModelPricingConfig {
            pattern: "gpt-4o".to_string(),
            input_per_mtok: 2.50,
            output_per_mtok: 10.0,
        },
    ]
}

/// Canned reply texts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RepliesConfig {
    /// Sent when the batch could not be mapped to any intent.
    #[serde(default = "default_fallback_reply")]
    pub fallback: String,

    /// Balance reply; `{amount}` is replaced with the spend in USD.
    #[serde(default = "default_balance_template")]
    pub balance_template: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback_reply(),
            balance_template: default_balance_template(),
        }
    }
}

fn default_fallback_reply() -> String {
    "Sorry, I couldn't understand that. Could you rephrase?".to_string()
}

fn default_balance_template() -> String {
    "So far this conversation has used ${amount}.".to_string()
}
