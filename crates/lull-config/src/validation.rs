// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a non-zero quiet period, finite prices and template placeholders.

use crate::diagnostic::ConfigError;
use crate::model::LullConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LullConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.debounce.quiet_period_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "debounce.quiet_period_ms must be greater than zero".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let pricing = &config.pricing;
    check_price(&mut errors, "pricing.default_input_per_mtok", pricing.default_input_per_mtok);
    check_price(&mut errors, "pricing.default_output_per_mtok", pricing.default_output_per_mtok);
    check_price(&mut errors, "pricing.image_usd", pricing.image_usd);

    for (i, model) in pricing.models.iter().enumerate() {
        if model.pattern.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("pricing.models[{i}].pattern must not be empty"),
            });
        }
        check_price(
            &mut errors,
            &format!("pricing.models[{i}].input_per_mtok"),
            model.input_per_mtok,
        );
        check_price(
            &mut errors,
            &format!("pricing.models[{i}].output_per_mtok"),
            model.output_per_mtok,
        );
    }

    if config.replies.fallback.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "replies.fallback must not be empty".to_string(),
        });
    }

    if !config.replies.balance_template.contains("{amount}") {
        errors.push(ConfigError::Validation {
            message: "replies.balance_template must contain the `{amount}` placeholder"
                .to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_price(errors: &mut Vec<ConfigError>, key: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!("{key} must be a finite non-negative number, got {value}"),
        });
    }
}
