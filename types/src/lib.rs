//! Core domain types for sift.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer: the runner, the config loader,
//! and whatever host renders the results.

mod diagnostic;
mod ids;
mod outcome;
mod request;
mod selection;
mod settings;
mod severity;

pub use diagnostic::{Diagnostic, DiagnosticCounts, Position, Severity, sort_diagnostics};
pub use ids::{BufferId, Generation};
pub use outcome::{FormatResult, RunFailure, RunOutcome, RunPhase, RunReport};
pub use request::{DEFAULT_STDIN_FILENAME, InvocationRequest, Mode, OutputFormat, Target};
pub use selection::LineRange;
pub use settings::{
    DEFAULT_BINARY, DEFAULT_TIMEOUT_SECS, RunnerSettings, SaveActions, SettingsError,
};
pub use severity::{
    DEFAULT_ERROR_PREFIXES, DEFAULT_INFO_PREFIXES, DEFAULT_WARNING_PREFIXES, SeverityTable,
};
