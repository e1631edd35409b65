//! One invocation, end to end: resolve, spawn, wait, classify.

use std::path::Path;
use std::time::Duration;

use sift_types::{
    FormatResult, InvocationRequest, LineRange, Mode, RunFailure, RunOutcome, RunPhase,
    RunReport, RunnerSettings, SeverityTable, Target,
};
use tracing::{debug, info, warn};

use crate::binary::{resolve_binary, source_name};
use crate::command::{build_args, display_command};
use crate::parse::{ParsedOutput, parse_diagnostics};
use crate::process::{ProcessError, ProcessOutput, ProcessSpec, run_process};

/// Executes invocation requests.
///
/// Stateless apart from the severity table, so one runner can serve any
/// number of concurrent invocations.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    severity: SeverityTable,
}

impl Runner {
    #[must_use]
    pub fn new(severity: SeverityTable) -> Self {
        Self { severity }
    }

    #[must_use]
    pub fn from_settings(settings: &RunnerSettings) -> Self {
        Self::new(settings.severity().clone())
    }

    #[must_use]
    pub fn severity(&self) -> &SeverityTable {
        &self.severity
    }

    /// Run `request` to a terminal outcome.
    ///
    /// Never retries. The subprocess is gone by the time this returns,
    /// including on timeout.
    pub async fn run(&self, request: &InvocationRequest) -> RunOutcome {
        let outcome = self.execute(request).await;
        match &outcome {
            Ok(report) => info!(
                mode = %request.mode(),
                phase = %RunPhase::Parsed,
                diagnostics = report.diagnostics().len(),
                changed = report.edit().is_some_and(FormatResult::is_changed),
                "run finished"
            ),
            Err(failure) => info!(
                mode = %request.mode(),
                phase = %failure.phase(),
                "run failed: {failure}"
            ),
        }
        outcome
    }

    /// Format only `lines` of a buffer.
    ///
    /// The selected lines are formatted as a standalone snippet and spliced
    /// back, so the report's edit is still the whole buffer. File targets,
    /// non-format requests and selections past the end of the buffer run
    /// on the whole input.
    pub async fn run_selection(&self, request: &InvocationRequest, lines: LineRange) -> RunOutcome {
        let (Mode::Format, Target::Buffer { text, filename }) = (request.mode(), request.target())
        else {
            return self.run(request).await;
        };
        let Some(selected) = lines.select(text) else {
            debug!(%lines, "selection is past the end of the buffer; formatting everything");
            return self.run(request).await;
        };

        let snippet = Target::Buffer {
            text: selected.to_string(),
            filename: filename.clone(),
        };
        let report = self.run(&request.clone().with_target(snippet)).await?;
        let edit = match report.edit() {
            Some(FormatResult::Changed(formatted)) => match lines.splice(text, formatted) {
                Some(spliced) => FormatResult::compare(text, spliced),
                None => FormatResult::Unchanged,
            },
            _ => FormatResult::Unchanged,
        };
        Ok(
            RunReport::new(Mode::Format, report.exit_code(), Vec::new(), Some(edit))
                .with_warnings(report.warnings().to_vec()),
        )
    }

    async fn execute(&self, request: &InvocationRequest) -> RunOutcome {
        debug!(mode = %request.mode(), phase = %RunPhase::Spawning, binary = request.binary());
        let program = resolve_binary(request.binary())?;

        let before = match (request.mode().edits(), request.target()) {
            (true, Target::File(path)) => Some(read_file(path).await?),
            _ => None,
        };

        let args = build_args(request);
        debug!(
            command = %display_command(&program.display().to_string(), &args),
            cwd = ?request.working_dir(),
            "spawning"
        );
        let spec = ProcessSpec::new(&program, args, request.timeout())
            .with_working_dir(request.working_dir())
            .with_stdin(request.target().stdin_text());

        debug!(phase = %RunPhase::Running);
        let output = run_process(spec)
            .await
            .map_err(|e| process_failure(request, e))?;
        debug!(phase = %RunPhase::Completed, exit_code = ?output.exit_code);

        match request.mode() {
            Mode::Format => finish_format(request, output, before).await,
            Mode::Check => self.finish_check(request, output),
            Mode::Fix => self.finish_fix(request, output, before).await,
        }
    }

    fn finish_check(
        &self,
        request: &InvocationRequest,
        output: ProcessOutput,
    ) -> Result<RunReport, RunFailure> {
        let parsed = self.parse(request, &output.stdout);
        let mut warnings = stream_lines(&output.stderr);
        if output.truncated_stdout {
            warnings.push("diagnostic output was truncated".to_string());
        }

        if output.exit_code != Some(0) && parsed.is_empty() {
            return Err(tool_failure(request, &output));
        }
        collect_parse_warnings(&parsed, &mut warnings);
        Ok(RunReport::new(Mode::Check, output.exit_code, parsed.diagnostics, None)
            .with_warnings(warnings))
    }

    async fn finish_fix(
        &self,
        request: &InvocationRequest,
        output: ProcessOutput,
        before: Option<String>,
    ) -> RunOutcome {
        // Buffer fixes print the fixed source on stdout and diagnostics on
        // stderr; file fixes rewrite in place and report on stdout.
        let (parsed, mut warnings) = match request.target() {
            Target::Buffer { .. } => (self.parse(request, &output.stderr), Vec::new()),
            Target::File(_) => (
                self.parse(request, &output.stdout),
                stream_lines(&output.stderr),
            ),
        };

        if !matches!(output.exit_code, Some(0 | 1)) {
            if parsed.is_empty() {
                return Err(tool_failure(request, &output));
            }
            collect_parse_warnings(&parsed, &mut warnings);
            return Ok(
                RunReport::new(Mode::Fix, output.exit_code, parsed.diagnostics, None)
                    .with_warnings(warnings),
            );
        }

        collect_parse_warnings(&parsed, &mut warnings);
        let exit_code = output.exit_code;
        let edit = edit_result(request, output, before).await?;
        Ok(
            RunReport::new(Mode::Fix, exit_code, parsed.diagnostics, Some(edit))
                .with_warnings(warnings),
        )
    }

    fn parse(&self, request: &InvocationRequest, stream: &str) -> ParsedOutput {
        let target = request.target();
        let fallback_path = target
            .stdin_filename()
            .or_else(|| target.path().map(|p| p.display().to_string()))
            .unwrap_or_default();
        parse_diagnostics(
            request.output_format(),
            stream,
            &self.severity,
            &source_name(request.binary()),
            &fallback_path,
        )
    }
}

async fn finish_format(
    request: &InvocationRequest,
    output: ProcessOutput,
    before: Option<String>,
) -> RunOutcome {
    if output.exit_code != Some(0) {
        return Err(tool_failure(request, &output));
    }
    let warnings = stream_lines(&output.stderr);
    let exit_code = output.exit_code;
    let edit = edit_result(request, output, before).await?;
    Ok(RunReport::new(Mode::Format, exit_code, Vec::new(), Some(edit)).with_warnings(warnings))
}

/// Replacement text for an edit run: the re-read file for file targets,
/// stdout for buffer targets.
async fn edit_result(
    request: &InvocationRequest,
    output: ProcessOutput,
    before: Option<String>,
) -> Result<FormatResult, RunFailure> {
    match request.target() {
        Target::File(path) => {
            let after = read_file(path).await?;
            Ok(FormatResult::compare(
                before.as_deref().unwrap_or_default(),
                after,
            ))
        }
        Target::Buffer { text, .. } => {
            if output.truncated_stdout {
                return Err(RunFailure::Tool {
                    binary: request.binary().to_string(),
                    exit_code: output.exit_code,
                    message: "output exceeded the capture limit".to_string(),
                });
            }
            Ok(FormatResult::compare(text, output.stdout))
        }
    }
}

fn collect_parse_warnings(parsed: &ParsedOutput, warnings: &mut Vec<String>) {
    if let Some(err) = &parsed.malformed {
        warn!("could not parse diagnostic output: {err}");
        warnings.push(format!("could not parse diagnostic output: {err}"));
    }
    if !parsed.unmatched.is_empty() {
        warn!(lines = parsed.unmatched.len(), "unrecognized diagnostic output");
        warnings.extend(parsed.unmatched.iter().cloned());
    }
}

fn stream_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// The text a Tool Failure carries: stderr when it has content, otherwise
/// stdout, with trailing line terminators removed.
#[must_use]
pub fn failure_text(output: &ProcessOutput) -> String {
    let source = if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    source.trim_end_matches(['\r', '\n']).to_string()
}

fn tool_failure(request: &InvocationRequest, output: &ProcessOutput) -> RunFailure {
    RunFailure::Tool {
        binary: request.binary().to_string(),
        exit_code: output.exit_code,
        message: failure_text(output),
    }
}

fn process_failure(request: &InvocationRequest, err: ProcessError) -> RunFailure {
    let binary = request.binary().to_string();
    match err {
        ProcessError::TimedOut => {
            warn!(binary = %binary, timeout = ?request.timeout(), "killed after timeout");
            RunFailure::Timeout {
                binary,
                timeout: request.timeout(),
            }
        }
        ProcessError::Spawn(e) | ProcessError::Wait(e) => RunFailure::Spawn {
            binary,
            message: e.to_string(),
        },
    }
}

async fn read_file(path: &Path) -> Result<String, RunFailure> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunFailure::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// First line of `<binary> --version`.
pub async fn tool_version(binary: &str, timeout: Duration) -> Result<String, RunFailure> {
    let program = resolve_binary(binary)?;
    let spec = ProcessSpec::new(&program, vec!["--version".to_string()], timeout);
    let output = run_process(spec).await.map_err(|e| match e {
        ProcessError::TimedOut => RunFailure::Timeout {
            binary: binary.to_string(),
            timeout,
        },
        ProcessError::Spawn(e) | ProcessError::Wait(e) => RunFailure::Spawn {
            binary: binary.to_string(),
            message: e.to_string(),
        },
    })?;
    if output.exit_code != Some(0) {
        return Err(RunFailure::Tool {
            binary: binary.to_string(),
            exit_code: output.exit_code,
            message: failure_text(&output),
        });
    }
    Ok(output.stdout.lines().next().unwrap_or_default().trim().to_string())
}
