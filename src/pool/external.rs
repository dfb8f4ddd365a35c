//! XML profiles are canonicalized by an external converter.
//!
//! The converter reads one document and prints canonical text on stdout. Its
//! output goes through the same writer as native conversions, so naming,
//! compression, caching and cleanup behave identically for both formats.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use super::error::JobError;
use crate::canonical::{
    ConvertError, ConvertOptions, ConvertOutcome, ConvertStats, EscapeMode, OutputTarget,
    PendingOutput, plan_output,
};
use crate::utils::CancelToken;

/// Command used to convert XML documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConverter {
    program: PathBuf,
}

impl ExternalConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Converter flags mirroring the option set
    pub fn args(&self, options: &ConvertOptions) -> Vec<OsString> {
        let mut args = Vec::new();
        if options.escape == EscapeMode::Unescape {
            args.push("-e".into());
        }
        if !options.show_terminals {
            args.push("-h".into());
        }
        if !options.generate_indices {
            args.push("-I".into());
        }
        if options.multiline_prefix {
            args.push("-p".into());
        }
        args
    }

    fn command_line(&self, args: &[OsString], input: &Path) -> String {
        let mut line = self.program.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line.push(' ');
        line.push_str(&input.display().to_string());
        line
    }

    /// Converts one XML document, honouring the cache policy
    pub fn convert(
        &self,
        input: &Path,
        target: &OutputTarget,
        options: &ConvertOptions,
        cancel: &CancelToken,
    ) -> Result<ConvertOutcome, JobError> {
        let (output, decision) = plan_output(input, target, options)?;
        if decision.is_fresh() {
            tracing::debug!(input = %input.display(), "output exists and is newer, skipping");
            return Ok(ConvertOutcome::Skipped { output });
        }

        let args = self.args(options);
        let command = self.command_line(&args, input);
        tracing::debug!(command = %command, "running XML converter");

        let mut child = Command::new(&self.program)
            .args(&args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| JobError::Spawn { command: command.clone(), source })?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = String::new();
                let _ = stderr.read_to_string(&mut captured);
                captured
            })
        });

        let mut pending = match PendingOutput::create(input, target, options) {
            Ok(pending) => pending,
            Err(e) => {
                stop(&mut child);
                return Err(e.into());
            }
        };

        let copied = copy_output(&mut child, &mut pending, options, cancel, input);
        if copied.is_err() {
            let _ = child.kill();
        }
        let status = child.wait().map_err(|e| ConvertError::io("wait for", &self.program, e));
        let stderr = stderr_reader.and_then(|h| h.join().ok()).unwrap_or_default();

        let stats = match (copied, status) {
            (Ok(stats), Ok(status)) if status.success() => stats,
            (Ok(_), Ok(status)) => {
                pending.discard();
                return Err(JobError::Subprocess { command, exit_code: status.code(), stderr });
            }
            (Err(e), _) | (_, Err(e)) => {
                pending.discard();
                return Err(e.into());
            }
        };

        let output = pending.commit()?;
        Ok(ConvertOutcome::Converted { output, stats })
    }
}

/// Streams converter stdout into the pending output, capturing slice lines
fn copy_output(
    child: &mut Child,
    pending: &mut PendingOutput,
    options: &ConvertOptions,
    cancel: &CancelToken,
    input: &Path,
) -> Result<ConvertStats, ConvertError> {
    let Some(stdout) = child.stdout.take() else {
        return Ok(ConvertStats::default());
    };
    let mut reader = BufReader::new(stdout);
    let mut stats = ConvertStats::default();
    let mut line = Vec::with_capacity(256);
    loop {
        if cancel.is_cancelled() {
            return Err(ConvertError::Interrupted { file: input.display().to_string() });
        }
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| ConvertError::io("read converter output for", input, e))?;
        if read == 0 {
            break;
        }
        stats.input_lines += 1;
        if contains(&line, b" = ") {
            stats.value_lines += 1;
        } else {
            stats.terminal_lines += 1;
        }
        pending
            .writer
            .write_all(&line)
            .map_err(|e| ConvertError::io("write", &pending.path, e))?;
        if is_slice_line(&line, options) {
            pending.slices.write_all(&line)?;
            stats.slice_lines += 1;
        }
    }
    Ok(stats)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Slice lines are those whose path is exactly one of the configured slices
fn is_slice_line(line: &[u8], options: &ConvertOptions) -> bool {
    options.slices.iter().any(|slice| {
        let slice = slice.as_bytes();
        line.starts_with(slice) && line.get(slice.len()) == Some(&b' ')
    })
}

fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
