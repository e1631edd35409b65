//! Raw TOML shapes. Every field is optional so that layers can be overlaid
//! key by key before resolution.

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct RawConfig {
    pub ruff: Option<RawRuff>,
    pub on_save: Option<RawOnSave>,
    pub severity: Option<RawSeverity>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct RawRuff {
    pub binary: Option<String>,
    pub timeout_secs: Option<u64>,
    pub line_length: Option<u32>,
    pub use_config_file: Option<bool>,
    pub output_format: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct RawOnSave {
    pub format: Option<bool>,
    pub lint: Option<bool>,
    pub fix: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct RawSeverity {
    pub error: Option<Vec<String>>,
    pub warning: Option<Vec<String>>,
    pub info: Option<Vec<String>>,
    pub default: Option<String>,
}

impl RawConfig {
    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn overlay(self, other: Self) -> Self {
        Self {
            ruff: merge(self.ruff, other.ruff, RawRuff::overlay),
            on_save: merge(self.on_save, other.on_save, RawOnSave::overlay),
            severity: merge(self.severity, other.severity, RawSeverity::overlay),
        }
    }
}

impl RawRuff {
    pub fn overlay(self, other: Self) -> Self {
        Self {
            binary: other.binary.or(self.binary),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            line_length: other.line_length.or(self.line_length),
            use_config_file: other.use_config_file.or(self.use_config_file),
            output_format: other.output_format.or(self.output_format),
        }
    }
}

impl RawOnSave {
    pub fn overlay(self, other: Self) -> Self {
        Self {
            format: other.format.or(self.format),
            lint: other.lint.or(self.lint),
            fix: other.fix.or(self.fix),
        }
    }
}

impl RawSeverity {
    pub fn overlay(self, other: Self) -> Self {
        Self {
            error: other.error.or(self.error),
            warning: other.warning.or(self.warning),
            info: other.info.or(self.info),
            default: other.default.or(self.default),
        }
    }
}

fn merge<T>(base: Option<T>, top: Option<T>, f: impl FnOnce(T, T) -> T) -> Option<T> {
    match (base, top) {
        (Some(base), Some(top)) => Some(f(base, top)),
        (base, top) => top.or(base),
    }
}
