// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use storyloom_common::path::PathError;
use storyloom_common::section::MergeError;
use storyloom_studio::session::SessionError;
use storyloom_studio::store::StoreError;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line("error", message, io::stderr().is_terminal());
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a command failure with a stable error code.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    print_error(format, error_code(error), &format!("{error:#}"));
}

fn error_code(error: &anyhow::Error) -> &'static str {
    for cause in error.chain() {
        if let Some(session) = cause.downcast_ref::<SessionError>() {
            return match session {
                SessionError::Store(store) => store_code(store),
                SessionError::Merge(_) => "TITLE_REQUIRED",
                SessionError::NoView => "NO_VIEW",
                SessionError::ReadOnlyView => "READ_ONLY",
            };
        }
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return store_code(store);
        }
        if cause.downcast_ref::<MergeError>().is_some() {
            return "TITLE_REQUIRED";
        }
        if cause.downcast_ref::<PathError>().is_some() {
            return "INVALID_NAME";
        }
        if cause.downcast_ref::<io::Error>().is_some() {
            return "IO_ERROR";
        }
    }
    "ERROR"
}

fn store_code(error: &StoreError) -> &'static str {
    match error {
        StoreError::NotFound(_) => "STORY_NOT_FOUND",
        StoreError::AlreadyExists(_) => "ALREADY_EXISTS",
        StoreError::InvalidName(_) => "INVALID_NAME",
        StoreError::InvalidFile(_) => "INVALID_FILE",
        StoreError::Io { .. } => "IO_ERROR",
        StoreError::Json(_) => "CORRUPT_DATA",
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{ANSI_RED}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
        }
        let info = Info { name: "Anne".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &info, |i| format!("Name: {}", i.name))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Name: Anne\n");
    }

    #[test]
    fn write_output_json_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
            mentions: u32,
        }
        let info = Info { name: "Villain".into(), mentions: 42 };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &info, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["name"], "Villain");
        assert_eq!(parsed["mentions"], 42);
    }

    #[test]
    fn print_error_does_not_panic() {
        print_error(OutputFormat::Human, "TEST_ERR", "something broke");
        print_error(OutputFormat::Json, "TEST_ERR", "something broke");
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_error_without_tty_is_plain() {
        assert_eq!(render_human_stderr_line("error", "careful", false), "error: careful");
    }

    #[test]
    fn error_codes_follow_the_typed_cause() {
        let missing = anyhow::Error::new(SessionError::Store(StoreError::NotFound("Tale".into())));
        assert_eq!(error_code(&missing), "STORY_NOT_FOUND");

        let merge: anyhow::Result<()> = Err(SessionError::Merge(MergeError::TitleRequired))
            .context("failed to save entity");
        assert_eq!(error_code(&merge.unwrap_err()), "TITLE_REQUIRED");

        let taken = anyhow::Error::new(StoreError::AlreadyExists("Tale".into()));
        assert_eq!(error_code(&taken), "ALREADY_EXISTS");

        let read_only = anyhow::Error::new(SessionError::ReadOnlyView);
        assert_eq!(error_code(&read_only), "READ_ONLY");

        assert_eq!(error_code(&anyhow::anyhow!("something else")), "ERROR");
    }
}
