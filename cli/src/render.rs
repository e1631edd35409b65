//! Terminal rendering and exit status.

use std::io::{self, Write};
use std::process::ExitCode;

use serde::Serialize;
use sift_types::{Diagnostic, DiagnosticCounts, RunFailure, RunReport};

/// Process exit status. Ordered so the worst status wins when combining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Clean,
    Issues,
    Failure,
}

impl Status {
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    #[must_use]
    pub fn for_report(report: &RunReport) -> Self {
        if report.is_clean() {
            Self::Clean
        } else {
            Self::Issues
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Clean => ExitCode::SUCCESS,
            Status::Issues => ExitCode::from(1),
            Status::Failure => ExitCode::from(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputStyle {
    /// `path:line:col: message [code]` lines.
    Text,
    /// One JSON document on stdout.
    Json,
}

/// Everything known about one target after a run.
#[derive(Debug, Serialize)]
pub struct TargetResult {
    pub path: String,
    pub diagnostics: Vec<Diagnostic>,
    pub counts: DiagnosticCounts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetResult {
    #[must_use]
    pub fn from_report(path: impl Into<String>, report: &RunReport) -> Self {
        Self {
            path: path.into(),
            diagnostics: report.diagnostics().to_vec(),
            counts: report.counts(),
            warnings: report.warnings().to_vec(),
            error: None,
        }
    }

    #[must_use]
    pub fn from_failure(path: impl Into<String>, failure: &RunFailure) -> Self {
        Self {
            path: path.into(),
            diagnostics: Vec::new(),
            counts: DiagnosticCounts::default(),
            warnings: Vec::new(),
            error: Some(failure.user_message()),
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        if self.error.is_some() {
            Status::Failure
        } else if self.diagnostics.is_empty() {
            Status::Clean
        } else {
            Status::Issues
        }
    }
}

/// Write results in the requested style. Diagnostics go to `out`; warnings,
/// failures and the status summary go to `err`.
pub fn write_results(
    style: OutputStyle,
    results: &[TargetResult],
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    match style {
        OutputStyle::Json => {
            serde_json::to_writer_pretty(&mut *out, results)?;
            writeln!(out)?;
        }
        OutputStyle::Text => {
            let mut total = DiagnosticCounts::default();
            for result in results {
                for diag in &result.diagnostics {
                    writeln!(out, "{}", diag.panel_line())?;
                }
                for warning in &result.warnings {
                    writeln!(err, "warning: {}: {warning}", result.path)?;
                }
                if let Some(message) = &result.error {
                    writeln!(err, "error: {}: {message}", result.path)?;
                }
                total.errors += result.counts.errors;
                total.warnings += result.counts.warnings;
                total.infos += result.counts.infos;
            }
            let summary = total.status_string();
            if !summary.is_empty() {
                writeln!(err, "{summary}")?;
            }
        }
    }
    Ok(())
}

/// Combined status of several results.
#[must_use]
pub fn overall_status(results: &[TargetResult]) -> Status {
    results
        .iter()
        .map(TargetResult::status)
        .fold(Status::Clean, Status::worst)
}
