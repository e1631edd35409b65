//! The fully specified description of one subprocess call.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filename reported to the tool for unsaved buffers.
pub const DEFAULT_STDIN_FILENAME: &str = "stdin.py";

/// What the external tool is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Rewrite the target's formatting.
    Format,
    /// Report diagnostics without changing anything.
    Check,
    /// Apply automatic fixes and report what remains.
    Fix,
}

impl Mode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Check => "check",
            Self::Fix => "fix",
        }
    }

    /// Whether the run produces replacement text.
    #[must_use]
    pub fn edits(self) -> bool {
        matches!(self, Self::Format | Self::Fix)
    }

    /// Whether the run produces diagnostics.
    #[must_use]
    pub fn reports(self) -> bool {
        matches!(self, Self::Check | Self::Fix)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Diagnostic output format requested from the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// One `path:line:col: CODE message` line per diagnostic.
    #[default]
    Concise,
    /// A JSON array of structured diagnostics.
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "concise" | "text" => Some(Self::Concise),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Value passed to `--output-format`.
    #[must_use]
    pub fn flag_value(self) -> &'static str {
        match self {
            Self::Concise => "concise",
            Self::Json => "json",
        }
    }
}

/// What the tool runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A file on disk; the tool reads (and for format/fix, rewrites) it.
    File(PathBuf),
    /// In-memory buffer content piped on stdin.
    Buffer {
        text: String,
        /// Name reported via `--stdin-filename`; drives per-file config and
        /// the path printed in diagnostics.
        filename: Option<PathBuf>,
    },
}

impl Target {
    pub fn buffer(text: impl Into<String>) -> Self {
        Self::Buffer {
            text: text.into(),
            filename: None,
        }
    }

    pub fn named_buffer(text: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self::Buffer {
            text: text.into(),
            filename: Some(filename.into()),
        }
    }

    /// Path the target is associated with, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Buffer { filename, .. } => filename.as_deref(),
        }
    }

    /// Text piped on stdin, if any.
    #[must_use]
    pub fn stdin_text(&self) -> Option<&str> {
        match self {
            Self::File(_) => None,
            Self::Buffer { text, .. } => Some(text),
        }
    }

    /// Value for `--stdin-filename` when running in buffer mode.
    #[must_use]
    pub fn stdin_filename(&self) -> Option<String> {
        match self {
            Self::File(_) => None,
            Self::Buffer { filename, .. } => Some(
                filename
                    .as_deref()
                    .map_or_else(|| DEFAULT_STDIN_FILENAME.to_string(), |p| p.display().to_string()),
            ),
        }
    }
}

/// One invocation of the external tool.
///
/// Immutable once built: fields are private and only the `with_*` setters
/// consume and return the request before it is handed to the runner.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    mode: Mode,
    target: Target,
    binary: String,
    working_dir: Option<PathBuf>,
    extra_args: Vec<String>,
    timeout: Duration,
    output_format: OutputFormat,
}

impl InvocationRequest {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(mode: Mode, target: Target, binary: impl Into<String>) -> Self {
        Self {
            mode,
            target,
            binary: binary.into(),
            working_dir: None,
            extra_args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Same invocation against different input.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Binary name (looked up on PATH) or path.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    #[must_use]
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }
}
