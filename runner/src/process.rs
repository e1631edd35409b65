//! Bounded subprocess execution.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time;

/// Output cap per stream. Formatted output of a large module fits well
/// within this.
pub const MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// How long to wait for a killed child to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_millis(2_000);

/// RAII guard that kills a child process (and its process group on Unix) on drop.
///
/// Wrap a spawned child immediately after `spawn()` so that cancelling the
/// owning future cannot leak the process. Call `disarm()` once the process
/// has been reaped.
pub struct ChildGuard {
    child: Option<Child>,
    /// Captured at spawn; `Child::id` is `None` once the child is reaped.
    pgid: Option<i32>,
}

impl ChildGuard {
    #[must_use]
    pub fn new(child: Child) -> Self {
        let pgid = child.id().and_then(|pid| i32::try_from(pid).ok());
        Self {
            child: Some(child),
            pgid,
        }
    }

    /// `None` after `disarm()`.
    pub fn child_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }

    pub fn disarm(&mut self) {
        self.child = None;
    }

    /// Kill whatever is left in the child's process group. Safe to call
    /// after the child itself has exited.
    pub fn kill_group(&self) {
        kill_group(self.pgid);
    }

    /// Kill the process group, then the child itself.
    pub async fn kill(&mut self) {
        kill_group(self.pgid);
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill().await;
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        kill_group(self.pgid);
        let _ = child.start_kill();
        let _ = child.try_wait();
    }
}

#[cfg(unix)]
fn kill_group(pgid: Option<i32>) {
    let Some(pgid) = pgid.filter(|&pid| pid > 0) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions; the group id is the
    // child's pid because the child called setsid before exec.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: Option<i32>) {}

/// Put the child process in its own session (Unix only) so the entire process
/// group can be killed via `killpg`.
#[cfg(unix)]
pub fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: the closure only calls async-signal-safe functions.
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            // Linux-only: the child dies with us even on SIGKILL.
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// What to run.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub stdin: Option<String>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl ProcessSpec {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            stdin: None,
            timeout,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<&Path>) -> Self {
        self.working_dir = dir.map(Path::to_path_buf);
        self
    }

    #[must_use]
    pub fn with_stdin(mut self, text: Option<&str>) -> Self {
        self.stdin = text.map(str::to_string);
        self
    }
}

/// Captured result of a process that exited on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub truncated_stdout: bool,
    pub truncated_stderr: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
    /// The deadline passed; the process group was killed.
    #[error("timed out")]
    TimedOut,
    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
}

/// Run `spec` to completion or until its timeout elapses.
///
/// The deadline covers the whole run, including draining the output pipes.
/// Once the child exits its process group is killed, so background
/// processes it started cannot hold the pipes open or outlive the run. If
/// the future is dropped the guard kills everything.
pub async fn run_process(spec: ProcessSpec) -> Result<ProcessOutput, ProcessError> {
    let deadline = time::Instant::now() + spec.timeout;
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    #[cfg(unix)]
    set_new_session(&mut cmd);

    let child = cmd.spawn().map_err(ProcessError::Spawn)?;
    let mut guard = ChildGuard::new(child);
    let Some(child) = guard.child_mut() else {
        return Err(ProcessError::Spawn(std::io::Error::other("child missing")));
    };

    let mut stdin_task = match (child.stdin.take(), spec.stdin) {
        (Some(mut pipe), Some(text)) => Some(tokio::spawn(async move {
            // A tool that exits without draining stdin closes the pipe; the
            // resulting EPIPE is not an error.
            let _ = pipe.write_all(text.as_bytes()).await;
            let _ = pipe.shutdown().await;
        })),
        _ => None,
    };
    let mut stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(read_to_end_limited(out, spec.max_output_bytes)));
    let mut stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(read_to_end_limited(err, spec.max_output_bytes)));

    let io_handles: Vec<AbortHandle> = stdin_task
        .iter()
        .map(JoinHandle::abort_handle)
        .chain(stdout_task.iter().map(JoinHandle::abort_handle))
        .chain(stderr_task.iter().map(JoinHandle::abort_handle))
        .collect();
    let abort_io = || io_handles.iter().for_each(AbortHandle::abort);

    let waited = time::timeout_at(deadline, child.wait()).await;
    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            abort_io();
            return Err(ProcessError::Wait(e));
        }
        Err(_) => {
            guard.kill().await;
            if let Some(child) = guard.child_mut() {
                let _ = time::timeout(REAP_TIMEOUT, child.wait()).await;
            }
            guard.disarm();
            abort_io();
            return Err(ProcessError::TimedOut);
        }
    };
    guard.kill_group();
    guard.disarm();

    let collected = time::timeout_at(deadline, async {
        if let Some(task) = stdin_task.as_mut() {
            let _ = task.await;
        }
        let stdout = match stdout_task.as_mut() {
            Some(task) => task.await.unwrap_or_default(),
            None => (Vec::new(), false),
        };
        let stderr = match stderr_task.as_mut() {
            Some(task) => task.await.unwrap_or_default(),
            None => (Vec::new(), false),
        };
        (stdout, stderr)
    })
    .await;
    let Ok(((stdout_bytes, truncated_stdout), (stderr_bytes, truncated_stderr))) = collected
    else {
        abort_io();
        return Err(ProcessError::TimedOut);
    };

    Ok(ProcessOutput {
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        truncated_stdout,
        truncated_stderr,
    })
}

pub(crate) async fn read_to_end_limited<R: tokio::io::AsyncRead + Unpin + Send + 'static>(
    mut reader: R,
    max_bytes: usize,
) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match reader.read(&mut tmp).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let remaining = max_bytes.saturating_sub(buf.len());
        if remaining == 0 {
            truncated = true;
            break;
        }
        let take = remaining.min(n);
        buf.extend_from_slice(&tmp[..take]);
        if take < n {
            truncated = true;
            break;
        }
    }

    (buf, truncated)
}
