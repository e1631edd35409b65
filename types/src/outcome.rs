//! Results of one invocation.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::diagnostic::{Diagnostic, DiagnosticCounts};
use crate::request::Mode;

/// Lifecycle of a single invocation.
///
/// `Idle -> Spawning -> Running -> {Completed, TimedOut, SpawnFailed}`, then
/// `Completed -> {Parsed, ToolFailure}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    Idle,
    Spawning,
    Running,
    Completed,
    TimedOut,
    SpawnFailed,
    Parsed,
    ToolFailure,
}

impl RunPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Parsed | Self::ToolFailure | Self::SpawnFailed | Self::TimedOut
        )
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Spawning => "spawning",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed-out",
            Self::SpawnFailed => "spawn-failed",
            Self::Parsed => "parsed",
            Self::ToolFailure => "tool-failure",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Replacement text produced by a format or fix run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatResult {
    /// New full content for the buffer.
    Changed(String),
    /// Output was byte-identical to the input.
    Unchanged,
}

impl FormatResult {
    /// Compare tool output against the original text.
    #[must_use]
    pub fn compare(original: &str, produced: String) -> Self {
        if produced == original {
            Self::Unchanged
        } else {
            Self::Changed(produced)
        }
    }

    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Changed(text) => Some(text),
            Self::Unchanged => None,
        }
    }
}

/// A successful (possibly empty) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    mode: Mode,
    exit_code: Option<i32>,
    diagnostics: Vec<Diagnostic>,
    edit: Option<FormatResult>,
    warnings: Vec<String>,
}

impl RunReport {
    /// `diagnostics` must already be sorted by (line, column).
    #[must_use]
    pub fn new(
        mode: Mode,
        exit_code: Option<i32>,
        diagnostics: Vec<Diagnostic>,
        edit: Option<FormatResult>,
    ) -> Self {
        Self {
            mode,
            exit_code,
            diagnostics,
            edit,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Replacement text for format/fix runs; `None` for check runs.
    #[must_use]
    pub fn edit(&self) -> Option<&FormatResult> {
        self.edit.as_ref()
    }

    /// Non-fatal problems, e.g. output that did not match the diagnostic
    /// grammar.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts::tally(&self.diagnostics)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Why an invocation produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error("{message}")]
    BinaryMissing { binary: String, message: String },
    #[error("failed to start {binary}: {message}")]
    Spawn { binary: String, message: String },
    #[error(
        "{binary} did not finish within {}s; increase `timeout_secs` in the sift configuration",
        .timeout.as_secs_f64()
    )]
    Timeout { binary: String, timeout: Duration },
    #[error("{binary} failed (exit code {}): {message}", exit_code_label(.exit_code))]
    Tool {
        binary: String,
        exit_code: Option<i32>,
        message: String,
    },
    #[error("could not read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl RunFailure {
    /// Terminal phase this failure corresponds to.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        match self {
            Self::BinaryMissing { .. } | Self::Spawn { .. } => RunPhase::SpawnFailed,
            Self::Timeout { .. } => RunPhase::TimedOut,
            Self::Tool { .. } | Self::Io { .. } => RunPhase::ToolFailure,
        }
    }

    /// Text intended for the user: the raw captured message where the tool
    /// produced one, a fixed hint otherwise.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::BinaryMissing { message, .. } | Self::Tool { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[allow(clippy::ref_option)]
fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Tagged result of one invocation.
pub type RunOutcome = Result<RunReport, RunFailure>;
