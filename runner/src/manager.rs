//! RunManager facade: the host-facing entry point.
//!
//! The host submits runs per buffer and drains results with
//! `poll_events`. Runs execute on their own tokio tasks and report back over
//! a channel; the manager applies them to the store, discarding results that
//! a newer run or a `clear` has superseded.

use std::collections::HashMap;
use std::sync::Arc;

use sift_types::{
    BufferId, Diagnostic, DiagnosticCounts, Generation, InvocationRequest, Mode, RunFailure,
    RunOutcome, RunPhase, RunReport,
};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::invoke::Runner;
use crate::store::{Applied, RunStore};

/// Channel capacity between run tasks and the manager.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A finished run, as delivered by its task.
#[derive(Debug)]
pub struct RunEvent {
    pub buffer: BufferId,
    pub generation: Generation,
    pub mode: Mode,
    pub outcome: RunOutcome,
}

pub struct RunManager {
    runner: Arc<Runner>,
    store: RunStore,
    in_flight: HashMap<BufferId, AbortHandle>,
    event_rx: mpsc::Receiver<RunEvent>,
    event_tx: mpsc::Sender<RunEvent>,
}

impl RunManager {
    #[must_use]
    pub fn new(runner: Runner) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            runner: Arc::new(runner),
            store: RunStore::new(),
            in_flight: HashMap::new(),
            event_rx,
            event_tx,
        }
    }

    /// Start a run for `buffer`. Must be called from within a tokio runtime.
    ///
    /// Any run still in flight for the same buffer is superseded: its task
    /// is aborted (which kills its subprocess) and a result it already sent
    /// is discarded on arrival.
    pub fn submit(&mut self, buffer: BufferId, request: InvocationRequest) -> Generation {
        let runner = Arc::clone(&self.runner);
        self.spawn_run(buffer, runner, request)
    }

    /// Like [`submit`](Self::submit), with a runner of its own. Buffers whose
    /// projects configure different severity tables use this.
    pub fn submit_with(
        &mut self,
        buffer: BufferId,
        runner: Runner,
        request: InvocationRequest,
    ) -> Generation {
        self.spawn_run(buffer, Arc::new(runner), request)
    }

    fn spawn_run(
        &mut self,
        buffer: BufferId,
        runner: Arc<Runner>,
        request: InvocationRequest,
    ) -> Generation {
        let generation = self.store.begin(buffer);
        let tx = self.event_tx.clone();
        let mode = request.mode();
        tracing::debug!(%buffer, %generation, %mode, "submitting run");

        let handle = tokio::spawn(async move {
            let outcome = runner.run(&request).await;
            let _ = tx
                .send(RunEvent {
                    buffer,
                    generation,
                    mode,
                    outcome,
                })
                .await;
        });
        if let Some(previous) = self.in_flight.insert(buffer, handle.abort_handle()) {
            previous.abort();
        }
        generation
    }

    /// Forget `buffer`'s results and discard whatever is in flight for it.
    pub fn clear(&mut self, buffer: BufferId) {
        if let Some(task) = self.in_flight.remove(&buffer) {
            task.abort();
        }
        let generation = self.store.clear(buffer);
        tracing::debug!(%buffer, %generation, "cleared");
    }

    /// Drain finished runs, up to `budget`.
    ///
    /// Non-blocking: returns immediately if nothing has finished. Returns the
    /// number of events handled, stale ones included.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Wait for the next finished run and apply it.
    pub async fn next_event(&mut self) -> Option<(BufferId, Applied)> {
        let event = self.event_rx.recv().await?;
        let buffer = event.buffer;
        Some((buffer, self.handle_event(event)))
    }

    /// Wait until `buffer` has no run in flight, then return its last outcome.
    pub async fn settle(&mut self, buffer: BufferId) -> Option<&RunOutcome> {
        while self.store.is_pending(buffer) {
            self.next_event().await?;
        }
        self.store.last_outcome(buffer)
    }

    fn handle_event(&mut self, event: RunEvent) -> Applied {
        let RunEvent {
            buffer,
            generation,
            mode,
            outcome,
        } = event;
        let applied = self.store.complete(buffer, generation, mode, outcome);
        match applied {
            Applied::Current => {
                self.in_flight.remove(&buffer);
                tracing::debug!(
                    %buffer,
                    %generation,
                    phase = %self.store.phase(buffer),
                    count = self.store.diagnostics(buffer).len(),
                    "run applied"
                );
            }
            Applied::Stale => {
                tracing::warn!(
                    %buffer,
                    %generation,
                    current = %self.store.generation(buffer),
                    "discarding stale run result"
                );
            }
        }
        applied
    }

    #[must_use]
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    #[must_use]
    pub fn phase(&self, buffer: BufferId) -> RunPhase {
        self.store.phase(buffer)
    }

    #[must_use]
    pub fn generation(&self, buffer: BufferId) -> Generation {
        self.store.generation(buffer)
    }

    #[must_use]
    pub fn diagnostics(&self, buffer: BufferId) -> &[Diagnostic] {
        self.store.diagnostics(buffer)
    }

    #[must_use]
    pub fn last_report(&self, buffer: BufferId) -> Option<&RunReport> {
        self.store.last_report(buffer)
    }

    #[must_use]
    pub fn last_failure(&self, buffer: BufferId) -> Option<&RunFailure> {
        self.store.last_failure(buffer)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<(BufferId, Vec<Diagnostic>)> {
        self.store.snapshot()
    }

    #[must_use]
    pub fn counts(&self) -> DiagnosticCounts {
        self.store.counts()
    }

    #[cfg(test)]
    pub(crate) fn event_tx(&self) -> &mpsc::Sender<RunEvent> {
        &self.event_tx
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut RunStore {
        &mut self.store
    }
}

impl Drop for RunManager {
    fn drop(&mut self) {
        for (_, task) in self.in_flight.drain() {
            task.abort();
        }
    }
}
