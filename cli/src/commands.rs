//! Subcommand implementations. Each returns the process status; hard errors
//! (unreadable input, invalid configuration) propagate as `anyhow` errors.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use sift_config::{Overrides, SiftConfig, env_binary, find_project_config, user_config_path};
use sift_runner::{RunManager, Runner, build_request, navigate, resolve_binary, tool_version};
use sift_types::{
    BufferId, Diagnostic, FormatResult, LineRange, Mode, Position, RunFailure, RunOutcome, Target,
};
use tokio::io::AsyncReadExt;

use crate::render::{OutputStyle, Status, TargetResult, overall_status, write_results};

const DOCTOR_TIMEOUT: Duration = Duration::from_secs(5);

/// A command-line target: a path, or `-` for stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    Path(PathBuf),
}

impl Input {
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }

    fn display(&self, stdin_filename: Option<&Path>) -> String {
        match self {
            Self::Stdin => stdin_filename.map_or_else(|| "-".to_string(), |p| p.display().to_string()),
            Self::Path(path) => path.display().to_string(),
        }
    }

    /// Where configuration lookup starts for this input.
    fn anchor<'a>(&'a self, stdin_filename: Option<&'a Path>) -> Option<&'a Path> {
        match self {
            Self::Stdin => stdin_filename,
            Self::Path(path) => Some(path),
        }
    }

    async fn into_target(self, stdin_filename: Option<PathBuf>) -> Result<Target> {
        match self {
            Self::Path(path) => Ok(Target::File(path)),
            Self::Stdin => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .context("failed to read stdin")?;
                Ok(Target::Buffer {
                    text,
                    filename: stdin_filename,
                })
            }
        }
    }
}

/// Shared state for one command invocation.
///
/// Configuration is resolved per target: the project file is the nearest
/// `.sift.toml` above the target, not above the current directory.
pub struct Context {
    pub style: OutputStyle,
    overrides: Overrides,
    cwd: PathBuf,
    user_config: Option<PathBuf>,
    env_binary: Option<String>,
}

impl Context {
    /// Context for the running process: real home directory and environment.
    pub fn from_env(overrides: Overrides, style: OutputStyle) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        Ok(Self::new(overrides, style, cwd, user_config_path(), env_binary()))
    }

    #[must_use]
    pub fn new(
        overrides: Overrides,
        style: OutputStyle,
        cwd: PathBuf,
        user_config: Option<PathBuf>,
        env_binary: Option<String>,
    ) -> Self {
        Self {
            style,
            overrides,
            cwd,
            user_config,
            env_binary,
        }
    }

    /// Resolved configuration for a target at `anchor` (the current
    /// directory when there is none).
    pub fn config_for(&self, anchor: Option<&Path>) -> Result<SiftConfig> {
        let start = anchor.map_or_else(|| self.cwd.clone(), |path| self.cwd.join(path));
        let project = find_project_config(&start);
        SiftConfig::load_from(
            self.user_config.as_deref(),
            project.as_deref(),
            self.env_binary.clone(),
            &self.overrides,
        )
        .context("invalid sift configuration")
    }

    fn emit(&self, results: &[TargetResult]) -> Result<Status> {
        let stdout = io::stdout();
        let stderr = io::stderr();
        write_results(self.style, results, &mut stdout.lock(), &mut stderr.lock())
            .context("failed to write output")?;
        Ok(overall_status(results))
    }
}

async fn run_once(config: &SiftConfig, mode: Mode, target: Target) -> RunOutcome {
    let request = build_request(config.settings(), mode, target);
    Runner::from_settings(config.settings()).run(&request).await
}

fn write_stdout(text: &str) -> Result<()> {
    io::stdout()
        .write_all(text.as_bytes())
        .context("failed to write to stdout")
}

/// Format a file in place or stdin to stdout. With `lines`, only those
/// lines are formatted and the rest of the text is left as it is.
pub async fn format(
    ctx: &Context,
    input: Input,
    stdin_filename: Option<PathBuf>,
    lines: Option<LineRange>,
) -> Result<Status> {
    let label = input.display(stdin_filename.as_deref());
    let config = ctx.config_for(input.anchor(stdin_filename.as_deref()))?;

    // A selection is formatted as a buffer; a file is then written back here.
    let (target, write_back) = match (input, lines) {
        (Input::Path(path), Some(_)) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            (Target::named_buffer(text, path.clone()), Some(path))
        }
        (input, _) => (input.into_target(stdin_filename).await?, None),
    };
    let is_stdin = write_back.is_none() && target.stdin_text().is_some();
    let original = target.stdin_text().map(str::to_string);

    let request = build_request(config.settings(), Mode::Format, target);
    let runner = Runner::from_settings(config.settings());
    let outcome = match lines {
        Some(lines) => runner.run_selection(&request, lines).await,
        None => runner.run(&request).await,
    };

    match outcome {
        Ok(report) => {
            let edit = report.edit();
            if let Some(path) = write_back {
                if let Some(FormatResult::Changed(text)) = edit {
                    tokio::fs::write(&path, text)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("reformatted {label}");
                }
            } else if is_stdin {
                let text = edit
                    .and_then(FormatResult::text)
                    .or(original.as_deref())
                    .unwrap_or_default();
                write_stdout(text)?;
            } else if edit.is_some_and(FormatResult::is_changed) {
                println!("reformatted {label}");
            }
            for warning in report.warnings() {
                eprintln!("warning: {label}: {warning}");
            }
            Ok(Status::Clean)
        }
        Err(failure) => {
            if let Some(text) = original.filter(|_| is_stdin) {
                // Leave the buffer untouched on failure.
                write_stdout(&text)?;
            }
            report_failure(&label, &failure);
            Ok(Status::Failure)
        }
    }
}

/// Check every input concurrently, one buffer per input.
pub async fn check(
    ctx: &Context,
    inputs: Vec<Input>,
    stdin_filename: Option<PathBuf>,
) -> Result<Status> {
    let stdin_inputs = inputs.iter().filter(|i| **i == Input::Stdin).count();
    anyhow::ensure!(stdin_inputs <= 1, "`-` (stdin) can be given only once");

    let mut manager = RunManager::new(Runner::default());
    let mut pending: Vec<(BufferId, String)> = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let buffer = BufferId::new(index as u64);
        let label = input.display(stdin_filename.as_deref());
        let config = ctx.config_for(input.anchor(stdin_filename.as_deref()))?;
        let target = input.into_target(stdin_filename.clone()).await?;
        manager.submit_with(
            buffer,
            Runner::from_settings(config.settings()),
            build_request(config.settings(), Mode::Check, target),
        );
        pending.push((buffer, label));
    }

    let mut results = Vec::with_capacity(pending.len());
    for (buffer, label) in pending {
        let result = match manager.settle(buffer).await {
            Some(Ok(report)) => TargetResult::from_report(label, report),
            Some(Err(failure)) => TargetResult::from_failure(label, failure),
            None => anyhow::bail!("run for {label} was lost"),
        };
        results.push(result);
    }
    tracing::debug!(status = %manager.counts().status_string(), "check finished");
    ctx.emit(&results)
}

pub async fn fix(ctx: &Context, input: Input, stdin_filename: Option<PathBuf>) -> Result<Status> {
    let label = input.display(stdin_filename.as_deref());
    let config = ctx.config_for(input.anchor(stdin_filename.as_deref()))?;
    let is_stdin = input == Input::Stdin;
    let target = input.into_target(stdin_filename).await?;
    let original = target.stdin_text().map(str::to_string);

    match run_once(&config, Mode::Fix, target).await {
        Ok(report) => {
            if is_stdin {
                let text = report
                    .edit()
                    .and_then(FormatResult::text)
                    .or(original.as_deref())
                    .unwrap_or_default();
                write_stdout(text)?;
                // Diagnostics must not mix with the fixed source.
                let stderr = io::stderr();
                write_results(
                    OutputStyle::Text,
                    &[TargetResult::from_report(label, &report)],
                    &mut stderr.lock(),
                    &mut io::sink(),
                )
                .context("failed to write diagnostics")?;
                Ok(Status::for_report(&report))
            } else {
                if report.edit().is_some_and(FormatResult::is_changed) {
                    eprintln!("fixed {label}");
                }
                ctx.emit(&[TargetResult::from_report(label, &report)])
            }
        }
        Err(failure) => {
            if let Some(text) = original.filter(|_| is_stdin) {
                write_stdout(&text)?;
            }
            report_failure(&label, &failure);
            Ok(Status::Failure)
        }
    }
}

/// Fix, then format, then lint a saved file, as enabled under `[on_save]`.
///
/// Fix and format work on the buffer text; the file is written once if
/// either changed it. A failed step leaves the text as the previous step
/// produced it. Lint runs last, against the written file.
pub async fn on_save(ctx: &Context, path: PathBuf) -> Result<Status> {
    let config = ctx.config_for(Some(&path))?;
    let actions = config.save_actions();
    if !actions.any() {
        tracing::info!("no [on_save] actions enabled");
        return Ok(Status::Clean);
    }

    let original = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let label = path.display().to_string();
    let buffer = BufferId::new(0);
    let mut manager = RunManager::new(Runner::from_settings(config.settings()));
    let mut text = original.clone();
    let mut status = Status::Clean;

    let edit_steps = [(actions.fix, Mode::Fix), (actions.format, Mode::Format)];
    for (enabled, mode) in edit_steps {
        if !enabled {
            continue;
        }
        let target = Target::named_buffer(text.clone(), path.clone());
        manager.submit(buffer, build_request(config.settings(), mode, target));
        match manager.settle(buffer).await {
            Some(Ok(report)) => {
                if let Some(FormatResult::Changed(new_text)) = report.edit() {
                    text.clone_from(new_text);
                }
            }
            Some(Err(failure)) => {
                report_failure(&label, failure);
                status = status.worst(Status::Failure);
            }
            None => anyhow::bail!("{mode} run for {label} was lost"),
        }
    }

    if text != original {
        tokio::fs::write(&path, &text)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("updated {label}");
    }

    if actions.lint {
        manager.submit(
            buffer,
            build_request(config.settings(), Mode::Check, Target::File(path)),
        );
        let result = match manager.settle(buffer).await {
            Some(Ok(report)) => TargetResult::from_report(label, report),
            Some(Err(failure)) => TargetResult::from_failure(label, failure),
            None => anyhow::bail!("lint run for {label} was lost"),
        };
        status = status.worst(ctx.emit(&[result])?);
    }
    Ok(status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Next,
    Previous,
}

/// Print the diagnostic after (or before) the cursor, wrapping around.
pub async fn jump(ctx: &Context, path: PathBuf, cursor: Position, direction: Jump) -> Result<Status> {
    let diagnostics = match lint_file(ctx, &path).await? {
        Ok(diagnostics) => diagnostics,
        Err(status) => return Ok(status),
    };
    let found = match direction {
        Jump::Next => navigate::next_after(&diagnostics, cursor),
        Jump::Previous => navigate::previous_before(&diagnostics, cursor),
    };
    print_found(found.into_iter().collect())
}

/// Print the diagnostics covering the cursor.
pub async fn hover(ctx: &Context, path: PathBuf, cursor: Position) -> Result<Status> {
    let diagnostics = match lint_file(ctx, &path).await? {
        Ok(diagnostics) => diagnostics,
        Err(status) => return Ok(status),
    };
    print_found(navigate::at(&diagnostics, cursor))
}

async fn lint_file(
    ctx: &Context,
    path: &Path,
) -> Result<std::result::Result<Vec<Diagnostic>, Status>> {
    let config = ctx.config_for(Some(path))?;
    match run_once(&config, Mode::Check, Target::File(path.to_path_buf())).await {
        Ok(report) => Ok(Ok(report.into_diagnostics())),
        Err(failure) => {
            report_failure(&path.display().to_string(), &failure);
            Ok(Err(Status::Failure))
        }
    }
}

fn print_found(found: Vec<&Diagnostic>) -> Result<Status> {
    if found.is_empty() {
        eprintln!("no diagnostics");
        return Ok(Status::Clean);
    }
    let mut stdout = io::stdout().lock();
    for diag in &found {
        writeln!(stdout, "{}", diag.panel_line())?;
        if let Some(url) = diag.url() {
            writeln!(stdout, "  {url}")?;
        }
    }
    Ok(Status::Issues)
}

/// Show which binary would run, its version, and where configuration came from.
pub async fn doctor(ctx: &Context) -> Result<Status> {
    let config = ctx.config_for(None)?;
    let settings = config.settings();
    let mut status = Status::Clean;

    match resolve_binary(settings.binary()) {
        Ok(path) => println!("binary:  {}", path.display()),
        Err(failure) => {
            report_failure(settings.binary(), &failure);
            return Ok(Status::Failure);
        }
    }
    match tool_version(settings.binary(), DOCTOR_TIMEOUT).await {
        Ok(version) => println!("version: {version}"),
        Err(failure) => {
            report_failure(settings.binary(), &failure);
            status = Status::Failure;
        }
    }
    println!("timeout: {}s", settings.timeout().as_secs());
    if config.sources().is_empty() {
        println!("config:  (defaults)");
    }
    for source in config.sources() {
        println!("config:  {}", source.display());
    }
    Ok(status)
}

fn report_failure(label: &str, failure: &RunFailure) {
    tracing::debug!(phase = %failure.phase(), "{failure}");
    eprintln!("error: {label}: {}", failure.user_message());
}
