// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Lull configuration system.

use lull_config::diagnostic::ConfigError;
use lull_config::model::{LullConfig, PendingBackend};
use lull_config::{load_and_validate_str, load_config_from_path, load_config_from_str};
use serial_test::serial;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_lull_config() {
    let toml = r#"
[agent]
name = "concierge"
log_level = "debug"
system_prompt = "Be brief."
drain_timeout_secs = 5

[debounce]
quiet_period_ms = 1500
pending_backend = "sqlite"

[storage]
database_path = "/tmp/lull-test.db"
wal_mode = false

[pricing]
default_input_per_mtok = 1.0
default_output_per_mtok = 2.0
image_usd = 0.08

[[pricing.models]]
pattern = "tiny"
input_per_mtok = 0.1
output_per_mtok = 0.2

[replies]
fallback = "Come again?"
balance_template = "Spent: ${amount}"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "concierge");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.agent.system_prompt.as_deref(), Some("Be brief."));
    assert_eq!(config.agent.drain_timeout_secs, 5);
    assert_eq!(config.debounce.quiet_period_ms, 1500);
    assert_eq!(config.debounce.pending_backend, PendingBackend::Sqlite);
    assert_eq!(config.storage.database_path, "/tmp/lull-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.pricing.image_usd, 0.08);
    assert_eq!(config.pricing.models.len(), 1);
    assert_eq!(config.pricing.models[0].pattern, "tiny");
    assert_eq!(config.replies.fallback, "Come again?");
    assert_eq!(config.replies.balance_template, "Spent: ${amount}");
}

/// Unknown field in [debounce] produces an UnknownField error.
#[test]
fn unknown_field_in_debounce_produces_error() {
    let toml = r#"
[debounce]
quiet_perod_ms = 100
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("quiet_perod_ms"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use their defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let toml = r#"
[agent]
name = "only-agent"
"#;

    let config = load_config_from_str(toml).expect("partial config should deserialize");
    assert_eq!(config.agent.name, "only-agent");
    assert_eq!(config.debounce.quiet_period_ms, 3000);
    assert_eq!(config.debounce.pending_backend, PendingBackend::Memory);
    assert!(config.storage.wal_mode);
    assert_eq!(config.pricing.models.len(), 2);
}

/// `LULL_DEBOUNCE_QUIET_PERIOD_MS` maps to `debounce.quiet_period_ms`
/// (not `debounce.quiet.period.ms`).
#[test]
#[serial]
fn env_var_overrides_quiet_period() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lull.toml");
    std::fs::write(&path, "[debounce]\nquiet_period_ms = 9000\n").expect("write config");

    // SAFETY: serialized with every other env-touching test in this binary.
    unsafe {
        std::env::set_var("LULL_DEBOUNCE_QUIET_PERIOD_MS", "250");
        std::env::set_var("LULL_REPLIES_FALLBACK", "Pardon?");
    }
    let result = load_config_from_path(&path);
    unsafe {
        std::env::remove_var("LULL_DEBOUNCE_QUIET_PERIOD_MS");
        std::env::remove_var("LULL_REPLIES_FALLBACK");
    }

    let config = result.expect("env override should merge");
    assert_eq!(config.debounce.quiet_period_ms, 250);
    assert_eq!(config.replies.fallback, "Pardon?");
}

/// Values from the file win over defaults when no env var is set.
#[test]
#[serial]
fn file_values_apply_without_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lull.toml");
    std::fs::write(&path, "[storage]\ndatabase_path = \"chat.db\"\n").expect("write config");

    let config = load_config_from_path(&path).expect("file should load");
    assert_eq!(config.storage.database_path, "chat.db");
}

/// Serialized defaults provide sensible values for all fields.
#[test]
fn serialized_defaults_are_sensible() {
    let config = LullConfig::default();

    assert_eq!(config.agent.name, "lull");
    assert_eq!(config.agent.log_level, "info");
    assert!(config.agent.system_prompt.is_none());
    assert_eq!(config.agent.drain_timeout_secs, 30);
    assert_eq!(config.debounce.quiet_period_ms, 3000);
    assert!(config.storage.database_path.ends_with("lull.db"));
    assert!(config.replies.balance_template.contains("{amount}"));
    assert_eq!(config.pricing.models[0].pattern, "gpt-4o-mini");
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
#[serial]
fn missing_config_files_silently_skipped() {
    let config = load_config_from_path(std::path::Path::new("/nonexistent/path/lull.toml"))
        .expect("missing file should be silently skipped");
    assert_eq!(config.agent.name, "lull");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;

    let err =
        load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telegram"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// An unknown pending backend name is a type error, not a silent default.
#[test]
fn unknown_pending_backend_is_rejected() {
    let toml = r#"
[debounce]
pending_backend = "redis"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Error output from load_and_validate_str names the key and suggests a fix.
#[test]
fn diagnostic_error_includes_unknown_key_and_suggestion() {
    let toml = r#"
[debounce]
quiet_perod_ms = 100
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { section, key, suggestion, span, .. } if {
            section == "debounce"
                && key == "quiet_perod_ms"
                && suggestion.as_deref() == Some("quiet_period_ms")
                && span.is_some()
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error with suggestion, got: {errors:?}"
    );
}

/// A string where a number is expected names the offending key.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[debounce]
quiet_period_ms = "soon"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { key, .. } if key == "debounce.quiet_period_ms")),
        "expected an InvalidValue error, got: {errors:?}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        section: "replies".to_string(),
        key: "falback".to_string(),
        suggestion: Some("fallback".to_string()),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `fallback`"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("falback"));
}

/// load_and_validate_str with valid TOML returns Ok config.
#[test]
fn load_and_validate_valid_toml() {
    let config = load_and_validate_str("[agent]\nname = \"test\"\n").expect("should validate");
    assert_eq!(config.agent.name, "test");
}

/// Validation runs after a successful parse.
#[test]
fn validation_catches_zero_quiet_period() {
    let toml = r#"
[debounce]
quiet_period_ms = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero quiet period should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("quiet_period_ms"))
    }));
}
