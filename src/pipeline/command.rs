use std::ffi::OsStr;
use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use anyhow::{Context, Result};

/// Captured result of an external command
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Renders a command line for messages
pub fn describe(command: &Command) -> String {
    let mut line = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Runs `command`, optionally feeding `input` on stdin, and captures its output.
///
/// Stdin is written from a separate thread so a filter that produces output
/// before consuming all of its input cannot deadlock.
pub fn run_captured(mut command: Command, input: Option<&[u8]>) -> Result<Captured> {
    let line = describe(&command);
    command
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().with_context(|| format!("Failed to run `{line}`"))?;

    let writer = match (child.stdin.take(), input) {
        (Some(mut stdin), Some(input)) => {
            let input = input.to_vec();
            Some(thread::spawn(move || stdin.write_all(&input)))
        }
        _ => None,
    };
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut captured = String::new();
            let _ = stderr.read_to_string(&mut captured);
            captured
        })
    });

    let mut stdout = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout).with_context(|| format!("Failed to read output of `{line}`"))?;
    }
    let status = child.wait().with_context(|| format!("Failed to wait for `{line}`"))?;

    if let Some(writer) = writer {
        match writer.join() {
            Ok(Ok(())) => {}
            // The filter may legitimately stop reading early
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(e).with_context(|| format!("Failed to write input to `{line}`"));
            }
            Err(_) => anyhow::bail!("Input writer for `{line}` panicked"),
        }
    }
    let stderr = stderr_reader.and_then(|h| h.join().ok()).unwrap_or_default();

    Ok(Captured { status, stdout, stderr })
}

/// Builds a command from a program name and arguments
pub fn command<I, S>(program: impl AsRef<OsStr>, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    command
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_captured_pipes_stdin() {
        let captured = run_captured(command("tr", ["a-z", "A-Z"]), Some(b"diff\n")).unwrap();
        assert!(captured.status.success());
        assert_eq!(captured.stdout, b"DIFF\n");
    }

    #[test]
    fn test_run_captured_collects_stderr() {
        let captured =
            run_captured(command("sh", ["-c", "echo oops >&2; exit 2"]), None).unwrap();
        assert_eq!(captured.status.code(), Some(2));
        assert_eq!(captured.stderr.trim(), "oops");
    }

    #[test]
    fn test_missing_program() {
        let err = run_captured(command("/nonexistent/filter", ["-x"]), None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/filter -x"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&command("diff", ["-r", "a", "b"])), "diff -r a b");
    }
}
