//! Resolved configuration types shared across crates.
//!
//! These types represent fully-validated, resolved configuration state.
//! Raw TOML deserialization structs (with `Option` fields) stay private in
//! `sift-config`. The config loader resolves them into these types at the
//! parse boundary.

use std::path::PathBuf;
use std::time::Duration;

use crate::request::OutputFormat;
use crate::severity::SeverityTable;

pub const DEFAULT_BINARY: &str = "ruff";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("ruff binary must not be empty")]
    EmptyBinary,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("line length must be greater than zero")]
    ZeroLineLength,
    #[error("unknown output format: {0}")]
    UnknownOutputFormat(String),
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
    #[error("invalid line range `{0}`: expected START or START:END, 1-based, START <= END")]
    InvalidLineRange(String),
}

/// Validated runner settings.
///
/// Invariant: `binary` is non-empty, `timeout` and `line_length` are
/// non-zero. Construction goes through [`RunnerSettings::new`] and the
/// checked setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    binary: String,
    timeout: Duration,
    line_length: Option<u32>,
    use_config_file: bool,
    output_format: OutputFormat,
    workspace_root: Option<PathBuf>,
    severity: SeverityTable,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            line_length: None,
            use_config_file: true,
            output_format: OutputFormat::Concise,
            workspace_root: None,
            severity: SeverityTable::default(),
        }
    }
}

impl RunnerSettings {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Result<Self, SettingsError> {
        Self::default().with_binary(binary)?.with_timeout(timeout)
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Result<Self, SettingsError> {
        let binary = binary.into();
        if binary.trim().is_empty() {
            return Err(SettingsError::EmptyBinary);
        }
        self.binary = binary;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SettingsError> {
        if timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_line_length(mut self, line_length: Option<u32>) -> Result<Self, SettingsError> {
        if line_length == Some(0) {
            return Err(SettingsError::ZeroLineLength);
        }
        self.line_length = line_length;
        Ok(self)
    }

    pub fn with_use_config_file(mut self, use_config_file: bool) -> Self {
        self.use_config_file = use_config_file;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Working directory for unsaved buffers (the editor's first project
    /// folder).
    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    pub fn with_severity(mut self, severity: SeverityTable) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn line_length(&self) -> Option<u32> {
        self.line_length
    }

    #[must_use]
    pub fn use_config_file(&self) -> bool {
        self.use_config_file
    }

    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    #[must_use]
    pub fn workspace_root(&self) -> Option<&std::path::Path> {
        self.workspace_root.as_deref()
    }

    #[must_use]
    pub fn severity(&self) -> &SeverityTable {
        &self.severity
    }
}

/// Which runs fire when a buffer is saved.
///
/// Order on save is fix, then format (before the write), then lint (after).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveActions {
    pub fix: bool,
    pub format: bool,
    pub lint: bool,
}

impl SaveActions {
    #[must_use]
    pub fn any(self) -> bool {
        self.fix || self.format || self.lint
    }
}
