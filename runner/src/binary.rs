//! Locating the ruff executable.

use std::path::{Path, PathBuf};

use sift_types::RunFailure;

/// Resolve `binary` to an executable path.
///
/// Anything containing a path separator is taken as a path and must name an
/// executable file. A bare name is looked up on `PATH`.
pub fn resolve_binary(binary: &str) -> Result<PathBuf, RunFailure> {
    let candidate = Path::new(binary);
    if candidate.is_absolute() || binary.contains(std::path::MAIN_SEPARATOR) || binary.contains('/')
    {
        if is_executable(candidate) {
            return Ok(candidate.to_path_buf());
        }
        return Err(RunFailure::BinaryMissing {
            binary: binary.to_string(),
            message: format!("ruff binary not found at: {binary}"),
        });
    }

    which::which(binary).map_err(|_| RunFailure::BinaryMissing {
        binary: binary.to_string(),
        message: format!(
            "{binary} not found in PATH. Install ruff or set `binary` under [ruff] in the sift configuration."
        ),
    })
}

/// Name used as the `source` of diagnostics: the binary's file stem.
#[must_use]
pub fn source_name(binary: &str) -> String {
    Path::new(binary)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(binary)
        .to_string()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
