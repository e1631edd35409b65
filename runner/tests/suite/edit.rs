use sift_runner::Runner;
use sift_types::{FormatResult, LineRange, Mode, RunPhase, Target};

use crate::common::FakeRuff;

/// A "formatter" that puts spaces around `=`.
const SPACING_FORMATTER: &str = "exec sed -e 's/ *= */ = /g'";

#[tokio::test]
async fn format_buffer_then_reformat_is_unchanged() {
    let ruff = FakeRuff::new(SPACING_FORMATTER);
    let runner = Runner::default();

    let first = runner
        .run(&ruff.request(Mode::Format, Target::named_buffer("x=1\ny  =  2\n", "a.py")))
        .await
        .unwrap();
    let formatted = first.edit().and_then(FormatResult::text).unwrap().to_string();
    assert_eq!(formatted, "x = 1\ny = 2\n");
    assert!(first.is_clean());

    let second = runner
        .run(&ruff.request(Mode::Format, Target::named_buffer(formatted, "a.py")))
        .await
        .unwrap();
    assert_eq!(second.edit(), Some(&FormatResult::Unchanged));
}

#[tokio::test]
async fn format_file_in_place() {
    let ruff = FakeRuff::new(
        "for last; do :; done\nsed -e 's/ *= */ = /g' \"$last\" > \"$last.tmp\" && mv \"$last.tmp\" \"$last\"",
    );
    let file = ruff.dir().join("a.py");
    std::fs::write(&file, "x=1\n").unwrap();

    let report = Runner::default()
        .run(&ruff.request(Mode::Format, Target::File(file.clone())))
        .await
        .unwrap();
    assert_eq!(report.edit(), Some(&FormatResult::Changed("x = 1\n".into())));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "x = 1\n");

    let again = Runner::default()
        .run(&ruff.request(Mode::Format, Target::File(file)))
        .await
        .unwrap();
    assert_eq!(again.edit(), Some(&FormatResult::Unchanged));
}

#[tokio::test]
async fn format_syntax_error_is_tool_failure() {
    let ruff = FakeRuff::new(
        "cat >/dev/null\necho 'error: Failed to parse a.py:1:3: Expected an expression' >&2\nexit 2",
    );
    let err = Runner::default()
        .run(&ruff.request(Mode::Format, Target::named_buffer("x = (\n", "a.py")))
        .await
        .unwrap_err();
    assert_eq!(err.phase(), RunPhase::ToolFailure);
    assert_eq!(
        err.user_message(),
        "error: Failed to parse a.py:1:3: Expected an expression"
    );
}

#[tokio::test]
async fn fix_buffer_returns_text_and_remaining_diagnostics() {
    let ruff = FakeRuff::new(
        "cat >/dev/null\nprintf 'import sys\\n'\necho 'a.py:1:8: F401 [*] `sys` imported but unused' >&2\nexit 1",
    );
    let report = Runner::default()
        .run(&ruff.request(
            Mode::Fix,
            Target::named_buffer("import os\nimport sys\n", "a.py"),
        ))
        .await
        .unwrap();

    assert_eq!(report.edit().and_then(FormatResult::text), Some("import sys\n"));
    assert_eq!(report.diagnostics().len(), 1);
    assert!(report.diagnostics()[0].fixable());
    assert_eq!(report.exit_code(), Some(1));
}

#[tokio::test]
async fn fix_file_rereads_the_file() {
    let ruff = FakeRuff::new(
        "for last; do :; done\nprintf 'import sys\\n' > \"$last\"\necho \"$last:1:8: F401 unused\"\nexit 1",
    );
    let file = ruff.dir().join("a.py");
    std::fs::write(&file, "import os\nimport sys\n").unwrap();

    let report = Runner::default()
        .run(&ruff.request(Mode::Fix, Target::File(file)))
        .await
        .unwrap();
    assert_eq!(report.edit(), Some(&FormatResult::Changed("import sys\n".into())));
    assert_eq!(report.diagnostics().len(), 1);
}

#[tokio::test]
async fn fix_with_nothing_to_do() {
    let ruff = FakeRuff::new("exec cat");
    let report = Runner::default()
        .run(&ruff.request(Mode::Fix, Target::named_buffer("x = 1\n", "a.py")))
        .await
        .unwrap();
    assert_eq!(report.edit(), Some(&FormatResult::Unchanged));
    assert!(report.is_clean());
}

#[tokio::test]
async fn format_selection_touches_only_selected_lines() {
    let ruff = FakeRuff::new(
        "dir=\"$(dirname \"$0\")\"\ntee \"$dir/stdin\" | sed -e 's/ *= */ = /g'",
    );
    let text = "a=1\nb=2\nc=3\n";
    let request = ruff.request(Mode::Format, Target::named_buffer(text, "a.py"));

    let report = Runner::default()
        .run_selection(&request, LineRange::new(2, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(
        report.edit(),
        Some(&FormatResult::Changed("a=1\nb = 2\nc=3\n".into()))
    );
    // Only the selection is sent to the tool.
    let sent = std::fs::read_to_string(ruff.dir().join("stdin")).unwrap();
    assert_eq!(sent, "b=2\n");
}

#[tokio::test]
async fn format_selection_already_formatted() {
    let ruff = FakeRuff::new(SPACING_FORMATTER);
    let request = ruff.request(Mode::Format, Target::named_buffer("a=1\nb = 2\n", "a.py"));
    let report = Runner::default()
        .run_selection(&request, "2".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(report.edit(), Some(&FormatResult::Unchanged));
}

#[tokio::test]
async fn format_selection_past_the_end_formats_everything() {
    let ruff = FakeRuff::new(SPACING_FORMATTER);
    let request = ruff.request(Mode::Format, Target::named_buffer("a=1\n", "a.py"));
    let report = Runner::default()
        .run_selection(&request, LineRange::new(7, 9).unwrap())
        .await
        .unwrap();
    assert_eq!(report.edit().and_then(FormatResult::text), Some("a = 1\n"));
}

#[tokio::test]
async fn format_selection_failure_is_reported() {
    let ruff = FakeRuff::new("cat >/dev/null\necho 'error: Failed to parse' >&2\nexit 2");
    let request = ruff.request(Mode::Format, Target::named_buffer("a=1\n    b=(\n", "a.py"));
    let err = Runner::default()
        .run_selection(&request, LineRange::new(2, 2).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "error: Failed to parse");
}
