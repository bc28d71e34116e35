// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics that point at
//! the offending line of `tally.toml`.
//!
//! Unknown sections and keys get a "did you mean" hint from the names Tally
//! actually reads. Values that came from a `TALLY_*` variable say so, since
//! there is no file line to point at.

#![allow(unused_assignments)] // emitted by miette's Diagnostic derive

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::SECTIONS;

/// Jaro-Winkler score a candidate needs before it is offered as a fix.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem found while loading or validating the configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A table Tally doesn't read, e.g. `[telegrm]`.
    #[error("unknown section `[{name}]`")]
    #[diagnostic(
        code(tally::config::unknown_section),
        help("{}", section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        #[label("not a Tally section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key its section doesn't define, e.g. `bot_tken` in `[telegram]`.
    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(
        code(tally::config::unknown_key),
        help("{}", key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        section: String,
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong shape, e.g. `port = "eighty"`.
    #[error("`{key}` should be {expected}, found {found}")]
    #[diagnostic(code(tally::config::invalid_type), help("value read from {origin}"))]
    InvalidType {
        /// Dotted path, e.g. `gateway.port`.
        key: String,
        expected: String,
        found: String,
        origin: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key without a default that was left out, e.g. an intent provider's `kind`.
    #[error("missing `{key}` in [{section}]")]
    #[diagnostic(
        code(tally::config::missing_key),
        help("add `{key} = ...` under [{section}] in tally.toml")
    )]
    MissingKey { key: String, section: String },

    /// A value that parsed but makes no sense, e.g. a zero timeout.
    #[error("{message}")]
    #[diagnostic(code(tally::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tally::config::other))]
    Other(String),
}

fn section_help(suggestion: Option<&str>) -> String {
    let known = SECTIONS
        .iter()
        .map(|s| format!("[{s}]"))
        .collect::<Vec<_>>()
        .join(" ");
    match suggestion {
        Some(s) => format!("did you mean `[{s}]`? Tally reads {known}"),
        None => format!("Tally reads {known}"),
    }
}

fn key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? This section accepts: {valid_keys}"),
        None => format!("this section accepts: {valid_keys}"),
    }
}

/// The table a figment path points into, without array indices:
/// `intent.providers.0` is the `[[intent.providers]]` table.
fn table_of(path: &[String]) -> Vec<String> {
    path.iter()
        .filter(|segment| segment.parse::<usize>().is_err())
        .cloned()
        .collect()
}

/// Convert every error carried by a `figment::Error`.
///
/// `toml_sources` pairs a display name with each TOML text that was loaded,
/// so the offending key can be pointed at.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let table = table_of(&error.path);

    match &error.kind {
        Kind::UnknownField(field, _) if table.is_empty() => {
            let (span, src) = find_in_sources(toml_sources, |content| locate_header(content, field));
            ConfigError::UnknownSection {
                name: field.clone(),
                suggestion: suggest_key(field, SECTIONS),
                span,
                src,
            }
        }
        Kind::UnknownField(field, expected) => {
            let (span, src) = find_in_sources(toml_sources, |content| {
                locate_key(content, &table, field).map(|at| (at, field.len()))
            });
            ConfigError::UnknownKey {
                key: field.clone(),
                section: table.join("."),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.to_string(),
            section: table.join("."),
        },
        Kind::InvalidType(actual, expected) => {
            let (span, src) = match table.split_last() {
                Some((key, parent)) => find_in_sources(toml_sources, |content| {
                    locate_key(content, parent, key).map(|at| (at, key.len()))
                }),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: table.join("."),
                expected: expected.clone(),
                found: actual.to_string(),
                origin: origin_of(error),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

/// First source in which `locate` finds an `(offset, len)`, as a labelled span.
///
/// Sources are searched rather than matched on figment metadata because a
/// merged table carries the tag of the defaults it was merged into.
fn find_in_sources(
    toml_sources: &[(String, String)],
    locate: impl Fn(&str) -> Option<(usize, usize)>,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    toml_sources
        .iter()
        .find_map(|(path, content)| {
            locate(content).map(|(offset, len)| {
                (
                    Some(SourceSpan::new(offset.into(), len)),
                    Some(NamedSource::new(path, content.clone())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Where a value came from, in words: a file path or a `TALLY_*` variable.
fn origin_of(error: &figment::Error) -> String {
    match error.metadata.as_ref() {
        Some(meta) => match meta.source.as_ref() {
            Some(figment::Source::File(path)) => path.display().to_string(),
            _ => meta.name.to_string(),
        },
        None => "the configuration".to_string(),
    }
}

/// Header text of a TOML table line, `[a.b]` or `[[a.b]]`, without brackets.
fn header_name(line: &str) -> Option<String> {
    let line = line.trim();
    let inner = line
        .strip_prefix("[[")
        .and_then(|l| l.strip_suffix("]]"))
        .or_else(|| line.strip_prefix('[').and_then(|l| l.strip_suffix(']')))?;
    Some(inner.split('.').map(str::trim).collect::<Vec<_>>().join("."))
}

/// Byte offset of `key = ...` inside the table `table` (empty for the
/// document root). Only the first matching table is searched.
pub fn locate_key(content: &str, table: &[String], key: &str) -> Option<usize> {
    let wanted = table.join(".");
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if let Some(name) = header_name(line) {
            current = name;
        } else if current == wanted {
            let trimmed = line.trim_start();
            let rest = trimmed.strip_prefix(key).map(str::trim_start);
            if rest.is_some_and(|r| r.starts_with('=')) {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Offset and length of the first header naming top-level table `section`.
fn locate_header(content: &str, section: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if let Some(name) = header_name(line) {
            if name.split('.').next() == Some(section) {
                let lead = line.len() - line.trim_start().len();
                return Some((offset + lead, line.trim().len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown` by Jaro-Winkler, if any is close enough.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    let unknown = unknown.to_ascii_lowercase();
    candidates
        .iter()
        .map(|&c| (c, strsim::jaro_winkler(&unknown, c)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c.to_string())
}

/// Render every error as one report, ending with a count.
pub fn render_report(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error as &dyn Diagnostic).is_err() {
            let _ = writeln!(out, "error: {error}");
        }
    }
    let noun = if errors.len() == 1 { "problem" } else { "problems" };
    let _ = writeln!(out, "{} configuration {noun} found", errors.len());
    out
}

/// Print [`render_report`] to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_report(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggests_close_section_names() {
        assert_eq!(suggest_key("telegrm", SECTIONS), Some("telegram".into()));
        assert_eq!(suggest_key("WhatsApp", SECTIONS), Some("whatsapp".into()));
        assert_eq!(suggest_key("logging", SECTIONS), None);
    }

    #[test]
    fn suggests_close_keys() {
        let keys = ["access_token", "phone_number_id", "verify_token", "app_secret"];
        assert_eq!(suggest_key("verify_tokn", &keys), Some("verify_token".into()));
    }

    #[test]
    fn locates_keys_inside_array_tables() {
        let content = "[intent]\ntimeout_secs = 5\n\n[[intent.providers]]\nkind = \"anthropic\"\nmodle = \"x\"\n";
        let table = table_of(&path(&["intent", "providers", "0"]));
        let at = locate_key(content, &table, "modle").unwrap();
        assert_eq!(&content[at..at + 5], "modle");
    }

    #[test]
    fn key_in_another_table_is_not_matched() {
        let content = "[gateway]\nport = 1\n[storage]\ndatabase_path = \"x\"\n";
        assert_eq!(locate_key(content, &path(&["dialogue"]), "port"), None);
        let at = locate_key(content, &path(&["gateway"]), "port").unwrap();
        assert_eq!(&content[at..at + 4], "port");
    }

    #[test]
    fn locates_unknown_section_header() {
        let content = "[bot]\nname = \"t\"\n  [logging.file]\nlevel = 1\n";
        let (at, len) = locate_header(content, "logging").unwrap();
        assert_eq!(&content[at..at + len], "[logging.file]");
    }

    #[test]
    fn report_counts_problems() {
        let report = render_report(&[
            ConfigError::Validation {
                message: "intent.timeout_secs must be greater than 0".into(),
            },
            ConfigError::MissingKey {
                key: "kind".into(),
                section: "intent.providers".into(),
            },
        ]);
        assert!(report.contains("timeout_secs"), "{report}");
        assert!(report.ends_with("2 configuration problems found\n"), "{report}");
    }
}
