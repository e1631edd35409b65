use std::time::{Duration, Instant};

use sift_runner::{Runner, build_request};
use sift_types::{
    Mode, OutputFormat, RunFailure, RunPhase, RunnerSettings, Severity, Target,
};

use crate::common::{FakeRuff, process_alive};

#[tokio::test]
async fn exit_zero_without_output_is_clean() {
    let ruff = FakeRuff::new("cat >/dev/null\nexit 0");
    let report = Runner::default()
        .run(&ruff.request(Mode::Check, Target::buffer("x = 1\n")))
        .await
        .unwrap();
    assert!(report.is_clean());
    assert!(report.warnings().is_empty());
    assert_eq!(report.exit_code(), Some(0));
}

#[tokio::test]
async fn exit_one_with_diagnostic_line() {
    let ruff = FakeRuff::new("echo 'foo.py:3:5: E501 line too long'\nexit 1");
    let report = Runner::default()
        .run(&ruff.request(Mode::Check, Target::named_buffer("", "foo.py")))
        .await
        .unwrap();

    assert_eq!(report.diagnostics().len(), 1);
    let d = &report.diagnostics()[0];
    assert_eq!((d.line(), d.column()), (3, 5));
    assert_eq!(d.code(), Some("E501"));
    assert_eq!(d.message(), "line too long");
    assert_eq!(d.severity(), Severity::Error);
    assert_eq!(d.source(), "ruff");
}

#[tokio::test]
async fn diagnostics_come_back_sorted() {
    let ruff = FakeRuff::new(
        "printf 'a.py:9:1: F401 unused\\na.py:1:4: W291 trailing\\na.py:1:2: I001 unsorted\\n'\nexit 1",
    );
    let report = Runner::default()
        .run(&ruff.request(Mode::Check, Target::File(ruff.dir().join("a.py"))))
        .await
        .unwrap();
    let positions: Vec<(u32, u32)> = report
        .diagnostics()
        .iter()
        .map(|d| (d.line(), d.column()))
        .collect();
    assert_eq!(positions, vec![(1, 2), (1, 4), (9, 1)]);
    let counts = report.counts();
    assert_eq!((counts.errors, counts.warnings, counts.infos), (1, 1, 1));
}

#[tokio::test]
async fn exit_two_with_error_text_is_tool_failure() {
    let ruff = FakeRuff::new("echo 'error: invalid TOML in ruff.toml' >&2\nexit 2");
    let err = Runner::default()
        .run(&ruff.request(Mode::Check, Target::buffer("x = 1\n")))
        .await
        .unwrap_err();
    assert_eq!(err.phase(), RunPhase::ToolFailure);
    assert_eq!(err.user_message(), "error: invalid TOML in ruff.toml");
    assert!(matches!(err, RunFailure::Tool { exit_code: Some(2), .. }));
}

#[tokio::test]
async fn timeout_kills_the_process() {
    let ruff = FakeRuff::new("echo $$ > \"$(dirname \"$0\")/pid\"\nexec sleep 30");
    let request = ruff
        .request(Mode::Check, Target::buffer("x = 1\n"))
        .with_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let err = Runner::default().run(&request).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(err, RunFailure::Timeout { .. }), "{err}");
    assert_eq!(err.phase(), RunPhase::TimedOut);
    assert!(err.user_message().contains("timeout_secs"));

    let pid: i32 = std::fs::read_to_string(ruff.dir().join("pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(!process_alive(pid), "process {pid} survived the timeout");
}

#[tokio::test]
async fn missing_binary_fails_without_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("ruff");
    let request = sift_types::InvocationRequest::new(
        Mode::Check,
        Target::buffer("x = 1\n"),
        binary.to_str().unwrap(),
    );
    let err = Runner::default().run(&request).await.unwrap_err();
    assert!(matches!(err, RunFailure::BinaryMissing { .. }));
    assert!(err.user_message().contains("not found"));
}

#[tokio::test]
async fn passes_arguments_and_stdin() {
    let ruff = FakeRuff::new(
        "dir=\"$(dirname \"$0\")\"\necho \"$@\" > \"$dir/args\"\ncat > \"$dir/stdin\"\nexit 0",
    );
    let request = ruff
        .request(Mode::Check, Target::named_buffer("import os\n", "pkg/mod.py"))
        .with_extra_args(["--isolated"]);
    Runner::default().run(&request).await.unwrap();

    let args = std::fs::read_to_string(ruff.dir().join("args")).unwrap();
    assert_eq!(
        args.trim_end(),
        "check --output-format concise --quiet --isolated --stdin-filename pkg/mod.py -"
    );
    let stdin = std::fs::read_to_string(ruff.dir().join("stdin")).unwrap();
    assert_eq!(stdin, "import os\n");
}

#[tokio::test]
async fn json_output_format() {
    let ruff = FakeRuff::new(
        r#"cat <<'JSON'
[{"code":"F401","message":"`os` imported but unused","filename":"/w/a.py","location":{"row":1,"column":8},"end_location":{"row":1,"column":10},"url":null,"fix":{"applicability":"safe"}}]
JSON
exit 1"#,
    );
    let request = ruff
        .request(Mode::Check, Target::named_buffer("import os\n", "/w/a.py"))
        .with_output_format(OutputFormat::Json);
    let report = Runner::default().run(&request).await.unwrap();
    let d = &report.diagnostics()[0];
    assert_eq!(d.code(), Some("F401"));
    assert_eq!(d.column(), 8);
    assert!(d.fixable());
}

#[tokio::test]
async fn malformed_json_degrades_to_warning() {
    let ruff = FakeRuff::new("echo 'not json'\nexit 0");
    let request = ruff
        .request(Mode::Check, Target::buffer(""))
        .with_output_format(OutputFormat::Json);
    let report = Runner::default().run(&request).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.warnings().len(), 1);
}

#[tokio::test]
async fn build_request_runs_against_file() {
    let ruff = FakeRuff::new("for last; do :; done\necho \"$last:2:1: F821 undefined name\"\nexit 1");
    let file = ruff.dir().join("mod.py");
    std::fs::write(&file, "print(x)\n").unwrap();
    let settings = RunnerSettings::default()
        .with_binary(ruff.binary())
        .unwrap()
        .with_use_config_file(false);

    let request = build_request(&settings, Mode::Check, Target::File(file.clone()));
    let report = Runner::from_settings(&settings).run(&request).await.unwrap();
    let d = &report.diagnostics()[0];
    assert_eq!(d.path(), file.display().to_string());
    assert_eq!(d.line(), 2);
}

#[tokio::test]
async fn background_process_does_not_extend_the_run() {
    let ruff = FakeRuff::new(
        "cat >/dev/null\nsleep 8 &\necho $! > \"$(dirname \"$0\")/pid\"\necho 'a.py:1:1: E501 long'\nexit 1",
    );
    let request = ruff
        .request(Mode::Check, Target::buffer("x = 1\n"))
        .with_timeout(Duration::from_secs(1));

    let started = Instant::now();
    let report = Runner::default().run(&request).await.unwrap();
    assert!(
        started.elapsed() < Duration::from_millis(1_500),
        "run took {:?} with a 1s timeout",
        started.elapsed()
    );
    assert_eq!(report.diagnostics().len(), 1);

    let pid: i32 = std::fs::read_to_string(ruff.dir().join("pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let mut alive = process_alive(pid);
    for _ in 0..50 {
        if !alive {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        alive = process_alive(pid);
    }
    assert!(!alive, "background process {pid} outlived the run");
}
