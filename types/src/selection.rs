//! Line selections for formatting part of a buffer.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::settings::SettingsError;

/// An inclusive, 1-based range of whole lines.
///
/// Invariant: `1 <= start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    start: u32,
    end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Result<Self, SettingsError> {
        if start == 0 || end < start {
            return Err(SettingsError::InvalidLineRange(format!("{start}:{end}")));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn end(self) -> u32 {
        self.end
    }

    /// Byte range of the selected lines in `text`, trailing newline
    /// included. An `end` past the last line is clamped; a `start` past it
    /// selects nothing.
    #[must_use]
    pub fn byte_range(self, text: &str) -> Option<Range<usize>> {
        let mut offset = 0;
        let mut begin = None;
        for (index, line) in text.split_inclusive('\n').enumerate() {
            let number = index as u32 + 1;
            if number == self.start {
                begin = Some(offset);
            }
            offset += line.len();
            if number == self.end {
                break;
            }
        }
        begin.map(|begin| begin..offset)
    }

    #[must_use]
    pub fn select(self, text: &str) -> Option<&str> {
        self.byte_range(text).map(|range| &text[range])
    }

    /// `text` with the selected lines replaced by `replacement`.
    ///
    /// A selection that ends without a newline (the last line of a file
    /// with no final newline) keeps ending without one.
    #[must_use]
    pub fn splice(self, text: &str, replacement: &str) -> Option<String> {
        let range = self.byte_range(text)?;
        let replacement = if text[range.clone()].ends_with('\n') {
            replacement
        } else {
            replacement.strip_suffix('\n').unwrap_or(replacement)
        };
        let mut out = String::with_capacity(text.len() - range.len() + replacement.len());
        out.push_str(&text[..range.start]);
        out.push_str(replacement);
        out.push_str(&text[range.end..]);
        Some(out)
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// `N` selects one line, `START:END` an inclusive range.
impl FromStr for LineRange {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SettingsError::InvalidLineRange(s.to_string());
        let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());
        let (start, end) = match s.split_once(':') {
            Some((start, end)) => (parse(start)?, parse(end)?),
            None => {
                let line = parse(s)?;
                (line, line)
            }
        };
        Self::new(start, end).map_err(|_| invalid())
    }
}
