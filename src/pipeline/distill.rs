use std::path::PathBuf;

use anyhow::{Result, bail};

use super::command::{command, describe, run_captured};

/// Marker preceding the files a distilled hunk belongs to
pub const MODIFIED_MARKER: &str = "@@ Modified in: ";

/// Post-processor collapsing duplicate hunks across files
pub trait Distiller: Send + Sync {
    fn distill(&self, diff: &[u8]) -> Result<Vec<u8>>;
}

/// Distiller running an external filter: diff text on stdin, result on stdout
#[derive(Debug, Clone)]
pub struct CommandDistiller {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandDistiller {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }
}

impl Distiller for CommandDistiller {
    fn distill(&self, diff: &[u8]) -> Result<Vec<u8>> {
        let cmd = command(&self.program, &self.args);
        let line = describe(&cmd);
        tracing::debug!(command = %line, bytes = diff.len(), "distilling diff output");
        let captured = run_captured(cmd, Some(diff))?;
        if !captured.status.success() {
            bail!("`{line}` failed ({}): {}", captured.status, captured.stderr.trim());
        }
        Ok(captured.stdout)
    }
}

/// Keeps the diff text as is, adding a provenance marker after each file header
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDistiller;

impl Distiller for PassthroughDistiller {
    fn distill(&self, diff: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(diff.len() + diff.len() / 8);
        for line in diff.split_inclusive(|&b| b == b'\n') {
            out.extend_from_slice(line);
            if let Some(left) = header_left_file(line) {
                if !line.ends_with(b"\n") {
                    out.push(b'\n');
                }
                out.extend_from_slice(MODIFIED_MARKER.as_bytes());
                out.extend_from_slice(left);
                out.push(b'\n');
            }
        }
        Ok(out)
    }
}

/// Left-hand file of a `diff ... <left> <right>` header line
fn header_left_file(line: &[u8]) -> Option<&[u8]> {
    if !line.starts_with(b"diff ") {
        return None;
    }
    let mut tokens = line.split(|b| b.is_ascii_whitespace()).filter(|t| !t.is_empty()).rev();
    let _right = tokens.next()?;
    let left = tokens.next()?;
    (left != b"diff").then_some(left)
}
