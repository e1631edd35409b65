//! Diagnostic output parsing.
//!
//! Concise output is one diagnostic per line:
//!
//! ```text
//! path:line[:column]: CODE [[*]] message
//! ```
//!
//! Lines that do not match continue the previous diagnostic's message, or
//! are collected as unmatched when no diagnostic is open. A blank line closes
//! the open diagnostic.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use sift_types::{Diagnostic, OutputFormat, Position, SeverityTable, sort_diagnostics};

/// Diagnostics recovered from one output stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Sorted by (line, column).
    pub diagnostics: Vec<Diagnostic>,
    /// Non-blank lines that matched nothing and had no diagnostic to attach to.
    pub unmatched: Vec<String>,
    /// Set when structured output could not be decoded at all.
    pub malformed: Option<String>,
}

impl ParsedOutput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether the stream carried anything besides diagnostics.
    #[must_use]
    pub fn has_unrecognized(&self) -> bool {
        !self.unmatched.is_empty() || self.malformed.is_some()
    }
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<path>.+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s+(?P<code>[A-Z][A-Za-z0-9]*|[a-z]+(?:-[a-z]+)+):?(?:\s+(?P<fix>\[\*\]))?(?:\s+(?P<msg>.*))?$",
        )
        .expect("valid diagnostic line regex")
    })
}

/// Parse a single diagnostic line. Returns `None` if the line does not match
/// the grammar.
#[must_use]
pub fn parse_line(line: &str, severity: &SeverityTable, source: &str) -> Option<Diagnostic> {
    let caps = line_pattern().captures(line)?;
    let row: u32 = caps.name("line")?.as_str().parse().ok()?;
    let col: u32 = match caps.name("col") {
        Some(m) => m.as_str().parse().ok()?,
        None => 1,
    };
    let code = caps.name("code").map(|m| m.as_str().to_string());
    let message = caps.name("msg").map_or("", |m| m.as_str().trim_end());
    let class = severity.classify(code.as_deref());
    Some(
        Diagnostic::new(
            caps.name("path")?.as_str(),
            Position::new(row, col),
            class,
            code,
            message,
            source,
        )
        .with_fixable(caps.name("fix").is_some()),
    )
}

/// Parse concise, line-oriented output.
#[must_use]
pub fn parse_concise(output: &str, severity: &SeverityTable, source: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let mut open: Option<Diagnostic> = None;

    for raw in output.lines() {
        let line = raw.trim_end_matches('\r');
        if let Some(diag) = parse_line(line, severity, source) {
            if let Some(prev) = open.replace(diag) {
                parsed.diagnostics.push(prev);
            }
            continue;
        }
        if line.trim().is_empty() {
            if let Some(prev) = open.take() {
                parsed.diagnostics.push(prev);
            }
            continue;
        }
        match open.as_mut() {
            Some(diag) => diag.push_message_line(line.trim()),
            None => parsed.unmatched.push(line.to_string()),
        }
    }
    if let Some(prev) = open {
        parsed.diagnostics.push(prev);
    }

    sort_diagnostics(&mut parsed.diagnostics);
    parsed
}

#[derive(Deserialize)]
struct JsonDiagnostic {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    location: Option<JsonLocation>,
    #[serde(default)]
    end_location: Option<JsonLocation>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    fix: Option<serde_json::Value>,
}

#[derive(Deserialize, Clone, Copy)]
struct JsonLocation {
    row: u32,
    column: u32,
}

/// Parse ruff's `--output-format json` array.
#[must_use]
pub fn parse_json(
    output: &str,
    severity: &SeverityTable,
    source: &str,
    fallback_path: &str,
) -> ParsedOutput {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return ParsedOutput::default();
    }

    let items: Vec<JsonDiagnostic> = match serde_json::from_str(trimmed) {
        Ok(items) => items,
        Err(e) => {
            return ParsedOutput {
                malformed: Some(e.to_string()),
                ..ParsedOutput::default()
            };
        }
    };

    let mut diagnostics: Vec<Diagnostic> = items
        .into_iter()
        .map(|item| {
            let start = item
                .location
                .map_or(Position::new(1, 1), |l| Position::new(l.row, l.column));
            let class = severity.classify(item.code.as_deref());
            let mut diag = Diagnostic::new(
                item.filename.as_deref().unwrap_or(fallback_path),
                start,
                class,
                item.code,
                item.message,
                source,
            )
            .with_fixable(item.fix.is_some_and(|f| !f.is_null()));
            if let Some(end) = item.end_location {
                diag = diag.with_end(Position::new(end.row, end.column));
            }
            if let Some(url) = item.url {
                diag = diag.with_url(url);
            }
            diag
        })
        .collect();

    sort_diagnostics(&mut diagnostics);
    ParsedOutput {
        diagnostics,
        ..ParsedOutput::default()
    }
}

/// Parse `output` according to the requested format.
#[must_use]
pub fn parse_diagnostics(
    format: OutputFormat,
    output: &str,
    severity: &SeverityTable,
    source: &str,
    fallback_path: &str,
) -> ParsedOutput {
    match format {
        OutputFormat::Concise => parse_concise(output, severity, source),
        OutputFormat::Json => parse_json(output, severity, source, fallback_path),
    }
}
