//! Per-buffer run bookkeeping.
//!
//! Each buffer has a generation counter. Starting a run or clearing the
//! buffer bumps it; a result is applied only if it carries the current
//! generation. Applied results fully replace the previous ones.

use std::collections::HashMap;

use sift_types::{
    BufferId, Diagnostic, DiagnosticCounts, Generation, Mode, RunFailure, RunOutcome, RunPhase,
    RunReport,
};

/// Whether a completed run was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    /// A newer run started (or the buffer was cleared) after this one.
    Stale,
}

#[derive(Debug, Default)]
struct BufferState {
    generation: Generation,
    phase: Option<RunPhase>,
    diagnostics: Vec<Diagnostic>,
    last: Option<RunOutcome>,
}

#[derive(Debug, Default)]
pub struct RunStore {
    buffers: HashMap<BufferId, BufferState>,
}

impl RunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a run and return its generation.
    pub fn begin(&mut self, buffer: BufferId) -> Generation {
        let state = self.buffers.entry(buffer).or_default();
        state.generation = state.generation.next();
        state.phase = Some(RunPhase::Running);
        state.generation
    }

    /// Apply a finished run if it is still the latest for `buffer`.
    ///
    /// Runs that report diagnostics (check, fix) replace the buffer's list;
    /// a failed reporting run leaves it empty. Format runs only update the
    /// phase and last outcome.
    pub fn complete(
        &mut self,
        buffer: BufferId,
        generation: Generation,
        mode: Mode,
        outcome: RunOutcome,
    ) -> Applied {
        let Some(state) = self.buffers.get_mut(&buffer) else {
            return Applied::Stale;
        };
        if state.generation != generation {
            return Applied::Stale;
        }

        state.phase = Some(match &outcome {
            Ok(_) => RunPhase::Parsed,
            Err(failure) => failure.phase(),
        });
        if mode.reports() {
            state.diagnostics = match &outcome {
                Ok(report) => report.diagnostics().to_vec(),
                Err(_) => Vec::new(),
            };
        }
        state.last = Some(outcome);
        Applied::Current
    }

    /// Drop the buffer's results and invalidate any run in flight.
    pub fn clear(&mut self, buffer: BufferId) -> Generation {
        let state = self.buffers.entry(buffer).or_default();
        state.generation = state.generation.next();
        state.phase = Some(RunPhase::Idle);
        state.diagnostics.clear();
        state.last = None;
        state.generation
    }

    #[must_use]
    pub fn generation(&self, buffer: BufferId) -> Generation {
        self.buffers
            .get(&buffer)
            .map_or_else(Generation::default, |s| s.generation)
    }

    /// Latest phase; `Idle` for buffers never run.
    #[must_use]
    pub fn phase(&self, buffer: BufferId) -> RunPhase {
        self.buffers
            .get(&buffer)
            .and_then(|s| s.phase)
            .unwrap_or(RunPhase::Idle)
    }

    #[must_use]
    pub fn is_pending(&self, buffer: BufferId) -> bool {
        self.phase(buffer) == RunPhase::Running
    }

    /// Sorted by (line, column).
    #[must_use]
    pub fn diagnostics(&self, buffer: BufferId) -> &[Diagnostic] {
        self.buffers
            .get(&buffer)
            .map(|s| s.diagnostics.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last_outcome(&self, buffer: BufferId) -> Option<&RunOutcome> {
        self.buffers.get(&buffer).and_then(|s| s.last.as_ref())
    }

    #[must_use]
    pub fn last_report(&self, buffer: BufferId) -> Option<&RunReport> {
        self.last_outcome(buffer).and_then(|o| o.as_ref().ok())
    }

    #[must_use]
    pub fn last_failure(&self, buffer: BufferId) -> Option<&RunFailure> {
        self.last_outcome(buffer).and_then(|o| o.as_ref().err())
    }

    /// Buffers with diagnostics: buffers with errors first, then by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(BufferId, Vec<Diagnostic>)> {
        let mut buffers: Vec<(BufferId, Vec<Diagnostic>)> = self
            .buffers
            .iter()
            .filter(|(_, s)| !s.diagnostics.is_empty())
            .map(|(id, s)| (*id, s.diagnostics.clone()))
            .collect();

        buffers.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|d| d.severity().is_error());
            let b_has_errors = b.1.iter().any(|d| d.severity().is_error());
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });
        buffers
    }

    /// Totals across all buffers.
    #[must_use]
    pub fn counts(&self) -> DiagnosticCounts {
        let mut total = DiagnosticCounts::default();
        for state in self.buffers.values() {
            let c = DiagnosticCounts::tally(&state.diagnostics);
            total.errors += c.errors;
            total.warnings += c.warnings;
            total.infos += c.infos;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_types::{FormatResult, Position, Severity};
    use std::time::Duration;

    fn diag(line: u32, severity: Severity) -> Diagnostic {
        Diagnostic::new(
            "a.py",
            Position::new(line, 1),
            severity,
            Some("E501".into()),
            "msg",
            "ruff",
        )
    }

    fn report(items: Vec<Diagnostic>) -> RunOutcome {
        Ok(RunReport::new(Mode::Check, Some(1), items, None))
    }

    #[test]
    fn empty_store() {
        let store = RunStore::new();
        let buf = BufferId::new(1);
        assert_eq!(store.phase(buf), RunPhase::Idle);
        assert!(store.diagnostics(buf).is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.counts().total(), 0);
    }

    #[test]
    fn current_result_applies() {
        let mut store = RunStore::new();
        let buf = BufferId::new(1);
        let generation = store.begin(buf);
        assert!(store.is_pending(buf));

        let applied = store.complete(
            buf,
            generation,
            Mode::Check,
            report(vec![diag(3, Severity::Error)]),
        );
        assert_eq!(applied, Applied::Current);
        assert_eq!(store.phase(buf), RunPhase::Parsed);
        assert_eq!(store.diagnostics(buf).len(), 1);
        assert!(store.last_report(buf).is_some());
    }

    #[test]
    fn last_started_wins() {
        let mut store = RunStore::new();
        let buf = BufferId::new(7);
        let first = store.begin(buf);
        let second = store.begin(buf);
        assert!(second > first);

        // The newer run finishes first.
        let applied = store.complete(buf, second, Mode::Check, report(vec![diag(1, Severity::Warning)]));
        assert_eq!(applied, Applied::Current);

        let late = store.complete(
            buf,
            first,
            Mode::Check,
            report(vec![diag(1, Severity::Error), diag(2, Severity::Error)]),
        );
        assert_eq!(late, Applied::Stale);
        assert_eq!(store.diagnostics(buf).len(), 1);
        assert_eq!(store.diagnostics(buf)[0].severity(), Severity::Warning);
    }

    #[test]
    fn newer_run_fully_replaces() {
        let mut store = RunStore::new();
        let buf = BufferId::new(1);
        let g1 = store.begin(buf);
        store.complete(buf, g1, Mode::Check, report(vec![diag(1, Severity::Error), diag(2, Severity::Error)]));
        let g2 = store.begin(buf);
        store.complete(buf, g2, Mode::Check, report(vec![diag(9, Severity::Info)]));
        assert_eq!(store.diagnostics(buf).len(), 1);
        assert_eq!(store.diagnostics(buf)[0].line(), 9);
    }

    #[test]
    fn clear_discards_in_flight() {
        let mut store = RunStore::new();
        let buf = BufferId::new(1);
        let generation = store.begin(buf);
        store.clear(buf);
        let applied = store.complete(buf, generation, Mode::Check, report(vec![diag(1, Severity::Error)]));
        assert_eq!(applied, Applied::Stale);
        assert!(store.diagnostics(buf).is_empty());
        assert_eq!(store.phase(buf), RunPhase::Idle);
    }

    #[test]
    fn unknown_buffer_is_stale() {
        let mut store = RunStore::new();
        let applied = store.complete(
            BufferId::new(99),
            Generation::new(1),
            Mode::Check,
            report(Vec::new()),
        );
        assert_eq!(applied, Applied::Stale);
    }

    #[test]
    fn failed_check_empties_diagnostics() {
        let mut store = RunStore::new();
        let buf = BufferId::new(1);
        let g1 = store.begin(buf);
        store.complete(buf, g1, Mode::Check, report(vec![diag(1, Severity::Error)]));
        let g2 = store.begin(buf);
        store.complete(
            buf,
            g2,
            Mode::Check,
            Err(RunFailure::Timeout {
                binary: "ruff".into(),
                timeout: Duration::from_secs(1),
            }),
        );
        assert!(store.diagnostics(buf).is_empty());
        assert_eq!(store.phase(buf), RunPhase::TimedOut);
        assert!(store.last_failure(buf).is_some());
    }

    #[test]
    fn format_run_keeps_lint_diagnostics() {
        let mut store = RunStore::new();
        let buf = BufferId::new(1);
        let g1 = store.begin(buf);
        store.complete(buf, g1, Mode::Check, report(vec![diag(1, Severity::Error)]));
        let g2 = store.begin(buf);
        store.complete(
            buf,
            g2,
            Mode::Format,
            Ok(RunReport::new(Mode::Format, Some(0), Vec::new(), Some(FormatResult::Unchanged))),
        );
        assert_eq!(store.diagnostics(buf).len(), 1);
        assert_eq!(
            store.last_report(buf).and_then(RunReport::edit),
            Some(&FormatResult::Unchanged)
        );
    }

    #[test]
    fn snapshot_orders_errors_first() {
        let mut store = RunStore::new();
        let a = BufferId::new(1);
        let b = BufferId::new(2);
        let ga = store.begin(a);
        store.complete(a, ga, Mode::Check, report(vec![diag(1, Severity::Warning)]));
        let gb = store.begin(b);
        store.complete(b, gb, Mode::Check, report(vec![diag(1, Severity::Error)]));

        let snap = store.snapshot();
        assert_eq!(snap[0].0, b);
        assert_eq!(snap[1].0, a);
        let counts = store.counts();
        assert_eq!((counts.errors, counts.warnings), (1, 1));
    }
}
