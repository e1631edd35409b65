//! Shared fixtures: fake ruff executables written to a temp directory.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sift_types::{InvocationRequest, Mode, Target};
use tempfile::TempDir;

/// A shell script standing in for ruff.
pub struct FakeRuff {
    dir: TempDir,
    path: PathBuf,
}

impl FakeRuff {
    /// Write `body` (without the shebang) to an executable `ruff` script.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ruff");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        Self { dir, path }
    }

    pub fn binary(&self) -> &str {
        self.path.to_str().expect("utf-8 temp path")
    }

    /// Scratch directory next to the script.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn request(&self, mode: Mode, target: Target) -> InvocationRequest {
        InvocationRequest::new(mode, target, self.binary())
            .with_working_dir(self.dir())
            .with_timeout(Duration::from_secs(10))
    }
}

/// Whether `pid` is still running. A zombie waiting for its reaper counts
/// as dead.
pub fn process_alive(pid: i32) -> bool {
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        let state = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim().chars().next());
        return !matches!(state, Some('Z' | 'X'));
    }
    // SAFETY: signal 0 only performs the existence check.
    unsafe { libc::kill(pid, 0) == 0 }
}
