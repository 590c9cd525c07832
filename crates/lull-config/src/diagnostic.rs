// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Miette diagnostics for `lull.toml`.
//!
//! Unknown keys are checked against Lull's own section table, so a typo gets
//! a "did you mean?" hint and a key placed under the wrong section is pointed
//! at the section that owns it.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Every table in `lull.toml` and the keys it accepts.
const SECTIONS: &[(&str, &[&str])] = &[
    ("", &["agent", "debounce", "storage", "pricing", "replies"]),
    (
        "agent",
        &[
            "name",
            "log_level",
            "system_prompt",
            "system_prompt_file",
            "drain_timeout_secs",
        ],
    ),
    ("debounce", &["quiet_period_ms", "pending_backend"]),
    ("storage", &["database_path", "wal_mode"]),
    (
        "pricing",
        &[
            "default_input_per_mtok",
            "default_output_per_mtok",
            "image_usd",
            "models",
        ],
    ),
    (
        "pricing.models",
        &["pattern", "input_per_mtok", "output_per_mtok"],
    ),
    ("replies", &["fallback", "balance_template"]),
];

/// A configuration error rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(lull::config::unknown_key),
        help("{}", unknown_key_help(section, key, suggestion.as_deref()))
    )]
    UnknownKey {
        /// Dotted table name, empty for the top level.
        section: String,
        key: String,
        suggestion: Option<String>,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key Lull knows whose value could not be used (wrong type, unknown
    /// backend name, malformed TOML).
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(lull::config::invalid_value))]
    InvalidValue { key: String, detail: String },

    /// A post-parse check failed.
    #[error("validation error: {message}")]
    #[diagnostic(code(lull::config::validation))]
    Validation { message: String },
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(section: &str, key: &str, suggestion: Option<&str>) -> String {
    if let Some(s) = suggestion {
        return format!("did you mean `{s}`?");
    }
    if let Some(owner) = owning_section(key) {
        return format!("`{key}` belongs in [{owner}]");
    }
    format!("valid keys: {}", section_keys(section).join(", "))
}

/// Keys accepted by a section, empty for an unknown section.
pub fn section_keys(section: &str) -> &'static [&'static str] {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// The non-root section that accepts `key`, if any.
fn owning_section(key: &str) -> Option<&'static str> {
    SECTIONS
        .iter()
        .find(|(name, keys)| !name.is_empty() && keys.contains(&key))
        .map(|(name, _)| *name)
}

/// Convert a figment error into Lull diagnostics.
///
/// `toml_sources` pairs a file path with its content and is used to point
/// the unknown-key label at the offending line.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section = section_of(&error.path);
            match &error.kind {
                Kind::UnknownField(field, _) => {
                    let suggestion = suggest_key(field, section_keys(&section));
                    let (span, src) = find_source_span(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        section,
                        key: field.clone(),
                        suggestion,
                        span,
                        src,
                    }
                }
                kind => ConfigError::InvalidValue {
                    key: error.path.join("."),
                    detail: kind.to_string(),
                },
            }
        })
        .collect()
}

/// Dotted table name for a figment path, with array indices dropped.
fn section_of(path: &[String]) -> String {
    path.iter()
        .filter(|p| p.parse::<usize>().is_err())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

fn find_source_span(
    error: &figment::error::Error,
    section: &str,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let source_path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline configs have no file source; fall back to the only one given.
    let source = match source_path {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            find_key_offset(content, section, field).map(|offset| {
                (
                    Some(SourceSpan::new(offset.into(), field.len())),
                    Some(NamedSource::new(path, content.clone())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` in `content`, searched from the header of `section`.
///
/// Handles both `[table]` and `[[array]]` headers; an empty section searches
/// from the start of the file.
pub fn find_key_offset(content: &str, section: &str, field: &str) -> Option<usize> {
    let search_start = if section.is_empty() {
        0
    } else {
        let array_header = format!("[[{section}]]");
        let header = format!("[{section}]");
        match content.find(&array_header) {
            Some(pos) => pos + array_header.len(),
            None => content.find(&header)? + header.len(),
        }
    };

    let mut offset = search_start;
    for line in content[search_start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        // Stop at the next table header.
        if trimmed.starts_with('[') && !section.is_empty() {
            return None;
        }
        let bare = trimmed.trim_start_matches('[');
        if let Some(after) = bare.strip_prefix(field) {
            if after.starts_with([' ', '\t', '=', ']']) {
                return Some(offset + (line.len() - bare.len()));
            }
        }
        offset += line.len();
    }

    None
}

/// Best Jaro-Winkler match for `unknown` among `valid_keys`.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
