use std::time::Duration;

use sift_runner::{Applied, RunManager, Runner};
use sift_types::{BufferId, Mode, RunPhase, Severity, SeverityTable, Target};

use crate::common::FakeRuff;

/// Echoes one diagnostic whose line number is the first line of stdin.
const ECHO_LINE: &str = "read n\necho \"a.py:$n:1: E501 line too long\"\nexit 1";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn buffers_run_concurrently_and_independently() {
    let ruff = FakeRuff::new(ECHO_LINE);
    let mut manager = RunManager::new(Runner::default());
    let a = BufferId::new(1);
    let b = BufferId::new(2);

    manager.submit(a, ruff.request(Mode::Check, Target::buffer("4\n")));
    manager.submit(b, ruff.request(Mode::Check, Target::buffer("7\n")));
    manager.settle(a).await;
    manager.settle(b).await;

    assert_eq!(manager.diagnostics(a)[0].line(), 4);
    assert_eq!(manager.diagnostics(b)[0].line(), 7);
    assert_eq!(manager.counts().errors, 2);
    assert_eq!(manager.snapshot().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_started_wins() {
    let slow = FakeRuff::new("sleep 2\necho 'a.py:1:1: F401 old result'\nexit 1");
    let fast = FakeRuff::new(ECHO_LINE);
    let mut manager = RunManager::new(Runner::default());
    let buf = BufferId::new(1);

    let first = manager.submit(buf, slow.request(Mode::Check, Target::buffer("")));
    let second = manager.submit(buf, fast.request(Mode::Check, Target::buffer("12\n")));
    assert!(second > first);

    manager.settle(buf).await;
    assert_eq!(manager.generation(buf), second);
    assert_eq!(manager.phase(buf), RunPhase::Parsed);
    let diags = manager.diagnostics(buf);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].line(), 12);

    // The superseded run was aborted, so nothing more arrives.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.poll_events(10), 0);
    assert_eq!(manager.diagnostics(buf)[0].line(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clear_drops_results() {
    let ruff = FakeRuff::new(ECHO_LINE);
    let mut manager = RunManager::new(Runner::default());
    let buf = BufferId::new(5);

    manager.submit(buf, ruff.request(Mode::Check, Target::buffer("3\n")));
    manager.settle(buf).await;
    assert_eq!(manager.diagnostics(buf).len(), 1);

    manager.clear(buf);
    assert!(manager.diagnostics(buf).is_empty());
    assert_eq!(manager.phase(buf), RunPhase::Idle);
    assert!(manager.last_report(buf).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn next_event_reports_application() {
    let ruff = FakeRuff::new(ECHO_LINE);
    let mut manager = RunManager::new(Runner::default());
    let buf = BufferId::new(9);
    manager.submit(buf, ruff.request(Mode::Check, Target::buffer("2\n")));
    assert_eq!(manager.next_event().await, Some((buf, Applied::Current)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_with_uses_its_own_severity_table() {
    let ruff = FakeRuff::new(ECHO_LINE);
    let mut manager = RunManager::new(Runner::default());
    let mut table = SeverityTable::default();
    table.extend(["E501"], Severity::Info);

    let plain = BufferId::new(1);
    let custom = BufferId::new(2);
    manager.submit(plain, ruff.request(Mode::Check, Target::buffer("1\n")));
    manager.submit_with(
        custom,
        Runner::new(table),
        ruff.request(Mode::Check, Target::buffer("1\n")),
    );
    manager.settle(plain).await;
    manager.settle(custom).await;

    assert_eq!(manager.diagnostics(plain)[0].severity(), Severity::Error);
    assert_eq!(manager.diagnostics(custom)[0].severity(), Severity::Info);
}
