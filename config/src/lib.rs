//! Configuration loading for sift.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. the user file, `~/.sift/config.toml`
//! 3. the nearest `.sift.toml` above the target
//! 4. the `SIFT_RUFF` environment variable (binary only)
//! 5. command-line [`Overrides`]
//!
//! Files that cannot be read or parsed are logged and skipped. Values that
//! parse but are invalid (an empty binary, a zero timeout) are errors.

mod raw;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sift_types::{
    DEFAULT_BINARY, DEFAULT_TIMEOUT_SECS, OutputFormat, RunnerSettings, SaveActions, Severity,
    SettingsError, SeverityTable,
};

use crate::raw::{RawConfig, RawRuff};

/// Name of the per-project override file.
pub const PROJECT_CONFIG_FILE: &str = ".sift.toml";

/// Environment variable that replaces `ruff.binary`.
pub const BINARY_ENV_VAR: &str = "SIFT_RUFF";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid setting: {0}")]
    Settings(#[from] SettingsError),
}

/// Command-line overrides. `None` leaves the configured value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub binary: Option<String>,
    pub timeout_secs: Option<u64>,
    pub line_length: Option<u32>,
    /// `true` forces `use_config_file = false`.
    pub no_config_file: bool,
    pub output_format: Option<OutputFormat>,
    pub workspace_root: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiftConfig {
    settings: RunnerSettings,
    save: SaveActions,
    sources: Vec<PathBuf>,
}

impl SiftConfig {
    /// Load from explicit file paths. Missing files are skipped silently.
    pub fn load_from(
        user: Option<&Path>,
        project: Option<&Path>,
        env_binary: Option<String>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut raw = RawConfig::default();
        let mut sources = Vec::new();
        for path in [user, project].into_iter().flatten() {
            if let Some(layer) = read_layer(path) {
                raw = raw.overlay(layer);
                sources.push(path.to_path_buf());
            }
        }

        let cli = RawConfig {
            ruff: Some(RawRuff {
                binary: env_binary,
                ..RawRuff::default()
            }),
            ..RawConfig::default()
        }
        .overlay(RawConfig {
            ruff: Some(RawRuff {
                binary: overrides.binary.clone(),
                timeout_secs: overrides.timeout_secs,
                line_length: overrides.line_length,
                use_config_file: overrides.no_config_file.then_some(false),
                output_format: overrides
                    .output_format
                    .map(|f| f.flag_value().to_string()),
            }),
            ..RawConfig::default()
        });
        raw = raw.overlay(cli);

        let workspace_root = overrides
            .workspace_root
            .clone()
            .or_else(|| project.and_then(Path::parent).map(Path::to_path_buf));

        let config = resolve(raw, workspace_root, sources)?;
        tracing::debug!(
            binary = config.settings.binary(),
            timeout = ?config.settings.timeout(),
            sources = ?config.sources,
            "configuration resolved"
        );
        Ok(config)
    }

    #[must_use]
    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    #[must_use]
    pub fn save_actions(&self) -> SaveActions {
        self.save
    }

    /// Files that contributed, lowest precedence first.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

fn resolve(
    raw: RawConfig,
    workspace_root: Option<PathBuf>,
    sources: Vec<PathBuf>,
) -> Result<SiftConfig, ConfigError> {
    let ruff = raw.ruff.unwrap_or_default();
    let binary = ruff
        .binary
        .map_or_else(|| DEFAULT_BINARY.to_string(), |b| expand_env_vars(b.trim()));
    let timeout = Duration::from_secs(ruff.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let output_format = match ruff.output_format {
        Some(label) => OutputFormat::from_label(&label)
            .ok_or(SettingsError::UnknownOutputFormat(label))?,
        None => OutputFormat::default(),
    };

    let mut severity = SeverityTable::default();
    if let Some(raw_severity) = raw.severity {
        let lists = [
            (raw_severity.error, Severity::Error),
            (raw_severity.warning, Severity::Warning),
            (raw_severity.info, Severity::Info),
        ];
        for (prefixes, class) in lists {
            if let Some(prefixes) = prefixes {
                severity.extend(prefixes.iter().map(String::as_str), class);
            }
        }
        if let Some(label) = raw_severity.default {
            let fallback =
                Severity::from_label(&label).ok_or(SettingsError::UnknownSeverity(label))?;
            severity.set_fallback(fallback);
        }
    }

    let settings = RunnerSettings::new(binary, timeout)?
        .with_line_length(ruff.line_length)?
        .with_use_config_file(ruff.use_config_file.unwrap_or(true))
        .with_output_format(output_format)
        .with_workspace_root(workspace_root)
        .with_severity(severity);

    let on_save = raw.on_save.unwrap_or_default();
    let save = SaveActions {
        fix: on_save.fix.unwrap_or(false),
        format: on_save.format.unwrap_or(false),
        lint: on_save.lint.unwrap_or(false),
    };

    Ok(SiftConfig {
        settings,
        save,
        sources,
    })
}

fn read_layer(path: &Path) -> Option<RawConfig> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("Failed to read config at {:?}: {}", path, err);
            return None;
        }
    };
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            None
        }
    }
}

/// Non-blank value of `SIFT_RUFF`.
#[must_use]
pub fn env_binary() -> Option<String> {
    env::var(BINARY_ENV_VAR).ok().filter(|v| !v.trim().is_empty())
}

/// `~/.sift/config.toml`, if a home directory is known.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sift").join("config.toml"))
}

/// Nearest `.sift.toml` at or above `start` (a file or directory).
#[must_use]
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let first = if start.is_dir() {
        Some(start)
    } else {
        start.parent()
    };
    first?
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Replace `${VAR}` with the variable's value (empty if unset). An
/// unterminated `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
