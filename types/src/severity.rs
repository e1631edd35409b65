//! Rule-code family to severity mapping.
//!
//! Ruff's rule set evolves independently of this crate, so the table is data:
//! built-in defaults that configuration may extend or override. Lookup picks
//! the longest matching prefix, so a configured `E9` entry beats the built-in
//! `E` family. Every built-in code starting with `E` or `F` is an error,
//! including families such as `ERA` and `FURB`.

use crate::diagnostic::Severity;

/// Built-in error families.
pub const DEFAULT_ERROR_PREFIXES: &[&str] = &["E", "F", "SyntaxError", "invalid-syntax"];

/// Built-in warning families.
pub const DEFAULT_WARNING_PREFIXES: &[&str] = &[
    "W", "N", "D", "UP", "ANN", "S", "B", "A", "C", "DTZ", "T", "ISC", "ICN", "G", "INP", "PIE",
    "PYI", "PT", "Q", "RSE", "RET", "SLF", "SLOT", "SIM", "TID", "TCH", "INT", "ARG", "PTH", "TD",
    "PD", "PGH", "PL", "TRY", "NPY", "AIR", "PERF", "LOG", "RUF",
];

/// Built-in informational families.
pub const DEFAULT_INFO_PREFIXES: &[&str] = &["I"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityTable {
    /// Sorted longest prefix first.
    entries: Vec<(String, Severity)>,
    fallback: Severity,
    missing_code: Severity,
}

impl Default for SeverityTable {
    fn default() -> Self {
        let mut table = Self::empty(Severity::Warning);
        table.extend(DEFAULT_ERROR_PREFIXES.iter().copied(), Severity::Error);
        table.extend(DEFAULT_WARNING_PREFIXES.iter().copied(), Severity::Warning);
        table.extend(DEFAULT_INFO_PREFIXES.iter().copied(), Severity::Info);
        table
    }
}

impl SeverityTable {
    /// A table with no entries; every code resolves to `fallback`.
    #[must_use]
    pub fn empty(fallback: Severity) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
            missing_code: Severity::Error,
        }
    }

    /// Map every prefix to `severity`, replacing existing entries for the
    /// same prefix.
    pub fn extend<'a>(&mut self, prefixes: impl IntoIterator<Item = &'a str>, severity: Severity) {
        for prefix in prefixes {
            let prefix = prefix.trim();
            if prefix.is_empty() {
                continue;
            }
            match self.entries.iter_mut().find(|(p, _)| p == prefix) {
                Some(entry) => entry.1 = severity,
                None => self.entries.push((prefix.to_string(), severity)),
            }
        }
        self.entries
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    }

    pub fn set_fallback(&mut self, severity: Severity) {
        self.fallback = severity;
    }

    #[must_use]
    pub fn fallback(&self) -> Severity {
        self.fallback
    }

    /// Severity for a diagnostic code. A missing code means the tool could not
    /// classify the problem (typically a syntax error).
    #[must_use]
    pub fn classify(&self, code: Option<&str>) -> Severity {
        let Some(code) = code.filter(|c| !c.is_empty()) else {
            return self.missing_code;
        };
        self.entries
            .iter()
            .find(|(prefix, _)| code.starts_with(prefix.as_str()))
            .map_or(self.fallback, |(_, severity)| *severity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
