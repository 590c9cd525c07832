// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lull.toml` > `~/.config/lull/lull.toml` > `/etc/lull/lull.toml`
//! with environment variable overrides via `LULL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LullConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lull/lull.toml` (system-wide)
/// 3. `~/.config/lull/lull.toml` (user XDG config)
/// 4. `./lull.toml` (local directory)
/// 5. `LULL_*` environment variables
pub fn load_config() -> Result<LullConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LullConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LullConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LullConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LullConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LullConfig::default()))
        .merge(Toml::file("/etc/lull/lull.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("lull/lull.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("lull.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `LULL_DEBOUNCE_QUIET_PERIOD_MS` must map to
/// `debounce.quiet_period_ms`, not `debounce.quiet.period.ms`. The mapper
/// sees the key before Figment lowercases it, so it lowercases first.
fn env_provider() -> Env {
    Env::prefixed("LULL_").map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("agent_", "agent.", 1)
            .replacen("debounce_", "debounce.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("pricing_", "pricing.", 1)
            .replacen("replies_", "replies.", 1);
        mapped.into()
    })
}
