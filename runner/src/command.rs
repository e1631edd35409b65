//! Argument list construction.

use sift_types::{InvocationRequest, Mode, Target};

/// Build the argument list for `request`, excluding the program itself.
///
/// Deterministic in the request: the same request always yields the same
/// vector.
#[must_use]
pub fn build_args(request: &InvocationRequest) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    match request.mode() {
        Mode::Format => args.push("format".into()),
        Mode::Check | Mode::Fix => {
            args.extend([
                "check".into(),
                "--output-format".into(),
                request.output_format().flag_value().into(),
                "--quiet".into(),
            ]);
            if request.mode() == Mode::Fix {
                args.push("--fix".into());
            }
        }
    }

    args.extend(request.extra_args().iter().cloned());

    match request.target() {
        Target::File(path) => args.push(path.display().to_string()),
        target @ Target::Buffer { .. } => {
            args.push("--stdin-filename".into());
            args.push(target.stdin_filename().unwrap_or_default());
            args.push("-".into());
        }
    }
    args
}

/// Shell-ish rendering of a command line for logs.
#[must_use]
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut out = String::from(program);
    for arg in args {
        out.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            out.push('\'');
            out.push_str(arg);
            out.push('\'');
        } else {
            out.push_str(arg);
        }
    }
    out
}
