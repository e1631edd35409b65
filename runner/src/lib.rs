//! Runs ruff as a bounded subprocess and normalizes what it reports.
//!
//! The entry points are [`Runner::run`] for a single invocation and
//! [`RunManager`] for per-buffer bookkeeping: a host submits runs, drains
//! results with [`RunManager::poll_events`], and reads the current
//! diagnostics for each buffer. Results from superseded runs are discarded.
//!
//! Requests are built from resolved settings with [`build_request`], which
//! discovers ruff's own configuration files and sets the working directory.

mod binary;
mod command;
mod discover;
mod invoke;
mod manager;
pub mod navigate;
mod parse;
mod process;
mod request;
mod store;

pub use binary::{resolve_binary, source_name};
pub use command::{build_args, display_command};
pub use discover::{RUFF_CONFIG_FILES, find_ruff_config};
pub use invoke::{Runner, failure_text, tool_version};
pub use manager::{RunEvent, RunManager};
pub use parse::{ParsedOutput, parse_concise, parse_diagnostics, parse_json, parse_line};
pub use process::{
    ChildGuard, MAX_OUTPUT_BYTES, ProcessError, ProcessOutput, ProcessSpec, run_process,
};
pub use request::build_request;
pub use store::{Applied, RunStore};
