//! Building invocation requests from resolved settings.

use std::path::{Path, PathBuf};

use sift_types::{InvocationRequest, Mode, RunnerSettings, Target};

use crate::discover::find_ruff_config;

/// Build the request for running `mode` against `target` under `settings`.
///
/// Relative target paths are made absolute so they stay valid once the
/// working directory moves to the file's parent. For unnamed buffers the
/// working directory is the workspace root, if any.
#[must_use]
pub fn build_request(settings: &RunnerSettings, mode: Mode, target: Target) -> InvocationRequest {
    let target = absolutize_target(target);
    let working_dir = target
        .path()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| settings.workspace_root().map(Path::to_path_buf));

    let mut extra: Vec<String> = Vec::new();
    if settings.use_config_file() {
        let anchor = target.path().map(Path::to_path_buf).or_else(|| working_dir.clone());
        if let Some(config) = anchor.as_deref().and_then(find_ruff_config) {
            extra.push("--config".into());
            extra.push(config.display().to_string());
        }
    } else {
        extra.push("--isolated".into());
    }
    if let Some(len) = settings.line_length() {
        extra.push("--line-length".into());
        extra.push(len.to_string());
    }

    let mut request = InvocationRequest::new(mode, target, settings.binary())
        .with_extra_args(extra)
        .with_timeout(settings.timeout())
        .with_output_format(settings.output_format());
    if let Some(dir) = working_dir {
        request = request.with_working_dir(dir);
    }
    request
}

fn absolutize_target(target: Target) -> Target {
    match target {
        Target::File(path) => Target::File(absolutize(path)),
        Target::Buffer { text, filename } => Target::Buffer {
            text,
            filename: filename.map(absolutize),
        },
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::path::absolute(&path).unwrap_or(path)
}
