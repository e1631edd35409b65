//! Cursor-relative queries over a buffer's sorted diagnostics.

use sift_types::{Diagnostic, Position};

/// First diagnostic starting strictly after `cursor`, wrapping to the first
/// one in the buffer.
#[must_use]
pub fn next_after(diagnostics: &[Diagnostic], cursor: Position) -> Option<&Diagnostic> {
    diagnostics
        .iter()
        .find(|d| d.start() > cursor)
        .or_else(|| diagnostics.first())
}

/// Last diagnostic starting strictly before `cursor`, wrapping to the last
/// one in the buffer.
#[must_use]
pub fn previous_before(diagnostics: &[Diagnostic], cursor: Position) -> Option<&Diagnostic> {
    diagnostics
        .iter()
        .rev()
        .find(|d| d.start() < cursor)
        .or_else(|| diagnostics.last())
}

/// Diagnostics whose span covers `pos`.
#[must_use]
pub fn at(diagnostics: &[Diagnostic], pos: Position) -> Vec<&Diagnostic> {
    diagnostics.iter().filter(|d| d.covers(pos)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_types::Severity;

    fn diag(line: u32, column: u32) -> Diagnostic {
        Diagnostic::new(
            "a.py",
            Position::new(line, column),
            Severity::Warning,
            Some("W291".into()),
            format!("at {line}:{column}"),
            "ruff",
        )
    }

    fn sample() -> Vec<Diagnostic> {
        vec![diag(2, 1), diag(2, 9), diag(10, 4)]
    }

    #[test]
    fn next_moves_forward_and_wraps() {
        let items = sample();
        let nav = |l, c| next_after(&items, Position::new(l, c)).map(Diagnostic::start);
        assert_eq!(nav(1, 1), Some(Position::new(2, 1)));
        assert_eq!(nav(2, 1), Some(Position::new(2, 9)));
        assert_eq!(nav(5, 1), Some(Position::new(10, 4)));
        assert_eq!(nav(10, 4), Some(Position::new(2, 1)));
    }

    #[test]
    fn previous_moves_backward_and_wraps() {
        let items = sample();
        let nav = |l, c| previous_before(&items, Position::new(l, c)).map(Diagnostic::start);
        assert_eq!(nav(20, 1), Some(Position::new(10, 4)));
        assert_eq!(nav(10, 4), Some(Position::new(2, 9)));
        assert_eq!(nav(2, 5), Some(Position::new(2, 1)));
        assert_eq!(nav(1, 1), Some(Position::new(10, 4)));
    }

    #[test]
    fn empty_list() {
        assert!(next_after(&[], Position::new(1, 1)).is_none());
        assert!(previous_before(&[], Position::new(1, 1)).is_none());
        assert!(at(&[], Position::new(1, 1)).is_empty());
    }

    #[test]
    fn hover_uses_spans() {
        let items = vec![
            diag(3, 5),
            diag(3, 1).with_end(Position::new(3, 4)),
            diag(4, 1).with_end(Position::new(6, 2)),
        ];
        assert_eq!(at(&items, Position::new(3, 7)).len(), 1);
        assert_eq!(at(&items, Position::new(3, 2)).len(), 1);
        assert!(at(&items, Position::new(3, 4)).iter().all(|d| d.line() == 3));
        assert_eq!(at(&items, Position::new(5, 80)).len(), 1);
        assert!(at(&items, Position::new(7, 1)).is_empty());
    }
}
