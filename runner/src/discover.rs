//! Ruff configuration file discovery.

use std::path::{Path, PathBuf};

/// Candidate file names, in precedence order within one directory.
pub const RUFF_CONFIG_FILES: &[&str] = &["ruff.toml", ".ruff.toml", "pyproject.toml"];

/// Walk upward from `start` (a file or directory) and return the first ruff
/// configuration file found.
///
/// `pyproject.toml` only counts when it has a `[tool.ruff]` table; a plain
/// packaging manifest does not stop the walk.
#[must_use]
pub fn find_ruff_config(start: &Path) -> Option<PathBuf> {
    let first = if start.is_dir() {
        Some(start)
    } else {
        start.parent()
    };
    for dir in first?.ancestors() {
        for name in RUFF_CONFIG_FILES {
            let candidate = dir.join(name);
            if !candidate.is_file() {
                continue;
            }
            if *name == "pyproject.toml" && !has_ruff_section(&candidate) {
                continue;
            }
            tracing::debug!(path = %candidate.display(), "found ruff configuration");
            return Some(candidate);
        }
    }
    None
}

fn has_ruff_section(pyproject: &Path) -> bool {
    let Ok(text) = std::fs::read_to_string(pyproject) else {
        return false;
    };
    match text.parse::<toml::Table>() {
        Ok(table) => table
            .get("tool")
            .and_then(toml::Value::as_table)
            .is_some_and(|tool| tool.contains_key("ruff")),
        Err(e) => {
            tracing::warn!(path = %pyproject.display(), "unparseable pyproject.toml: {e}");
            false
        }
    }
}
