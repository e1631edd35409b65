//! Normalized diagnostics produced by one lint run.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Severity class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Parse a severity label as written in configuration files.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" | "information" => Some(Self::Info),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A 1-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Construct a position, clamping zero to 1 on both axes.
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }
}

/// A single issue reported by the external tool.
///
/// Fields are private; construction goes through [`Diagnostic::new`] plus the
/// `with_*` setters so that line and column are always 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    path: String,
    start: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<Position>,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    fixable: bool,
    source: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        start: Position,
        severity: Severity,
        code: Option<String>,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            start,
            end: None,
            severity,
            code: code.filter(|c| !c.is_empty()),
            message: message.into(),
            url: None,
            fixable: false,
            source: source.into(),
        }
    }

    pub fn with_end(mut self, end: Position) -> Self {
        if end >= self.start {
            self.end = Some(end);
        }
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = (!url.is_empty()).then_some(url);
        self
    }

    pub fn with_fixable(mut self, fixable: bool) -> Self {
        self.fixable = fixable;
        self
    }

    /// Append a continuation line to the message.
    pub fn push_message_line(&mut self, line: &str) {
        if !self.message.is_empty() {
            self.message.push('\n');
        }
        self.message.push_str(line);
    }

    /// Path as reported by the tool.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn start(&self) -> Position {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Option<Position> {
        self.end
    }

    /// 1-based line.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.start.line
    }

    /// 1-based column.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.start.column
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn fixable(&self) -> bool {
        self.fixable
    }

    /// Tool that produced the diagnostic (e.g. "ruff").
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `pos` falls inside this diagnostic's span.
    ///
    /// Without an end position the span is the rest of the start line.
    #[must_use]
    pub fn covers(&self, pos: Position) -> bool {
        match self.end {
            Some(end) => self.start <= pos && pos <= end,
            None => pos.line == self.start.line && pos.column >= self.start.column,
        }
    }

    /// Order by (line, column); ties keep their original order under a
    /// stable sort.
    #[must_use]
    pub fn cmp_location(&self, other: &Self) -> Ordering {
        self.start.cmp(&other.start)
    }

    /// Format as an output-panel entry: `path:line:col: message [code]`.
    #[must_use]
    pub fn panel_line(&self) -> String {
        match &self.code {
            Some(code) => format!(
                "{}:{}:{}: {} [{}]",
                self.path, self.start.line, self.start.column, self.message, code
            ),
            None => format!(
                "{}:{}:{}: {}",
                self.path, self.start.line, self.start.column, self.message
            ),
        }
    }
}

/// Sort diagnostics ascending by (line, column), preserving report order on
/// ties.
pub fn sort_diagnostics(items: &mut [Diagnostic]) {
    items.sort_by(Diagnostic::cmp_location);
}

/// Per-severity counts for a diagnostic list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticCounts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl DiagnosticCounts {
    #[must_use]
    pub fn tally(items: &[Diagnostic]) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.severity() {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }

    /// Compact status string like "E:3 W:5 I:1"; empty when there is nothing
    /// to report.
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.total() == 0 {
            return String::new();
        }
        format!("E:{} W:{} I:{}", self.errors, self.warnings, self.infos)
    }
}
