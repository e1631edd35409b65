//! sift: run ruff against Python files and editor buffers.
//!
//! Exit status is 0 when clean, 1 when diagnostics were reported, and 2 when
//! a run failed or the command could not start.

mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sift_config::Overrides;
use sift_types::{LineRange, OutputFormat, Position};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{Context, Input, Jump};
use render::{OutputStyle, Status};

#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Run ruff against Python files and editor buffers")]
struct Cli {
    /// ruff executable (name on PATH or path)
    #[arg(long, global = true)]
    binary: Option<String>,

    /// Seconds before a run is killed
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Line length passed to ruff
    #[arg(long, global = true)]
    line_length: Option<u32>,

    /// Ignore ruff.toml / pyproject.toml and run ruff with --isolated
    #[arg(long, global = true)]
    no_config_file: bool,

    /// Format ruff is asked to emit
    #[arg(long, global = true, value_parser = parse_output_format)]
    ruff_format: Option<OutputFormat>,

    /// How results are printed
    #[arg(long, global = true, value_enum, default_value_t = OutputStyle::Text)]
    output: OutputStyle,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Format a file in place, or stdin to stdout when the target is `-`
    Format {
        target: String,
        /// Name used for stdin content (config lookup and reported paths)
        #[arg(long)]
        stdin_filename: Option<PathBuf>,
        /// Format only these lines: `N` or `START:END`, 1-based and inclusive
        #[arg(long, value_name = "START:END")]
        lines: Option<LineRange>,
    },
    /// Lint one or more targets
    Check {
        #[arg(required = true)]
        targets: Vec<String>,
        #[arg(long)]
        stdin_filename: Option<PathBuf>,
    },
    /// Apply safe fixes and report what remains
    Fix {
        target: String,
        #[arg(long)]
        stdin_filename: Option<PathBuf>,
    },
    /// Run the `[on_save]` actions for a saved file
    OnSave { path: PathBuf },
    /// Show the next diagnostic after a cursor position
    Next(CursorArgs),
    /// Show the previous diagnostic before a cursor position
    Prev(CursorArgs),
    /// Show the diagnostics covering a cursor position
    Hover(CursorArgs),
    /// Report the resolved binary, its version, and configuration sources
    Doctor,
}

#[derive(clap::Args, Debug)]
struct CursorArgs {
    path: PathBuf,
    /// 1-based line
    #[arg(long)]
    line: u32,
    /// 1-based column
    #[arg(long, default_value_t = 1)]
    column: u32,
}

impl CursorArgs {
    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_label(value).ok_or_else(|| format!("expected `concise` or `json`, got `{value}`"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(env_filter)
        .init();
}

impl Cli {
    fn overrides(&self, workspace_root: Option<PathBuf>) -> Overrides {
        Overrides {
            binary: self.binary.clone(),
            timeout_secs: self.timeout,
            line_length: self.line_length,
            no_config_file: self.no_config_file,
            output_format: self.ruff_format,
            workspace_root,
        }
    }
}

async fn run(cli: Cli) -> Result<Status> {
    let ctx = Context::from_env(cli.overrides(None), cli.output)?;

    match cli.command {
        Commands::Format {
            target,
            stdin_filename,
            lines,
        } => commands::format(&ctx, Input::parse(&target), stdin_filename, lines).await,
        Commands::Check {
            targets,
            stdin_filename,
        } => {
            let inputs = targets.iter().map(|t| Input::parse(t)).collect();
            commands::check(&ctx, inputs, stdin_filename).await
        }
        Commands::Fix {
            target,
            stdin_filename,
        } => commands::fix(&ctx, Input::parse(&target), stdin_filename).await,
        Commands::OnSave { path } => commands::on_save(&ctx, path).await,
        Commands::Next(args) => {
            let cursor = args.position();
            commands::jump(&ctx, args.path, cursor, Jump::Next).await
        }
        Commands::Prev(args) => {
            let cursor = args.position();
            commands::jump(&ctx, args.path, cursor, Jump::Previous).await
        }
        Commands::Hover(args) => {
            let cursor = args.position();
            commands::hover(&ctx, args.path, cursor).await
        }
        Commands::Doctor => commands::doctor(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            Status::Failure.into()
        }
    }
}
