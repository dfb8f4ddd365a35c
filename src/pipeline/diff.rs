use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::Serialize;

use super::command::{command, describe, run_captured};

/// Raw output of a recursive diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutput {
    pub text: Vec<u8>,
    pub differences: bool,
}

/// Recursive comparison of two canonical trees
pub trait DiffEngine: Send + Sync {
    /// Compares `left` and `right`, ignoring files with the given extensions
    fn diff(&self, left: &Path, right: &Path, exclude_extensions: &[&str]) -> Result<DiffOutput>;

    /// Whether gzip-compressed canonical files can be compared
    fn reads_compressed(&self) -> bool;
}

/// Command line flavour of the external diff program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStyle {
    /// `diff -r -U<n> -x <glob>` (plain files only)
    Gnu,
    /// `razor -G -d -p <n> -x <regex> -- -U<n>` (parallel, reads `.gz`)
    Razor,
}

impl DiffStyle {
    pub fn default_program(self) -> &'static str {
        match self {
            DiffStyle::Gnu => "diff",
            DiffStyle::Razor => "razor",
        }
    }
}

/// Diff engine running an external program
#[derive(Debug, Clone)]
pub struct ExternalDiff {
    pub program: PathBuf,
    pub style: DiffStyle,
    pub context: u32,
    pub workers: usize,
}

impl ExternalDiff {
    pub fn new(style: DiffStyle, program: Option<PathBuf>, context: u32, workers: usize) -> Self {
        let program = program.unwrap_or_else(|| PathBuf::from(style.default_program()));
        Self { program, style, context, workers }
    }

    pub fn args(&self, left: &Path, right: &Path, exclude_extensions: &[&str]) -> Vec<String> {
        let mut args = Vec::new();
        match self.style {
            DiffStyle::Gnu => {
                args.push("-r".to_string());
                args.push(format!("-U{}", self.context));
                for ext in exclude_extensions {
                    args.push("-x".to_string());
                    args.push(format!("*{ext}"));
                }
            }
            DiffStyle::Razor => {
                args.extend(["-G".to_string(), "-d".to_string()]);
                args.push("-p".to_string());
                args.push(self.workers.max(1).to_string());
                for ext in exclude_extensions {
                    args.push("-x".to_string());
                    args.push(format!("{}$", ext.replace('.', "\\.")));
                }
                args.push("--".to_string());
                args.push(format!("-U{}", self.context));
            }
        }
        args.push(left.display().to_string());
        args.push(right.display().to_string());
        args
    }
}

impl DiffEngine for ExternalDiff {
    fn diff(&self, left: &Path, right: &Path, exclude_extensions: &[&str]) -> Result<DiffOutput> {
        let cmd = command(&self.program, self.args(left, right, exclude_extensions));
        let line = describe(&cmd);
        tracing::debug!(command = %line, "running diff");

        let captured = run_captured(cmd, None)?;
        // 0: identical, 1: differences, anything else: trouble
        match captured.status.code() {
            Some(0) => Ok(DiffOutput { text: captured.stdout, differences: false }),
            Some(1) => Ok(DiffOutput { text: captured.stdout, differences: true }),
            code => bail!(
                "`{line}` failed ({}): {}",
                code.map_or_else(|| "killed by signal".to_string(), |c| format!("status {c}")),
                captured.stderr.trim()
            ),
        }
    }

    fn reads_compressed(&self) -> bool {
        self.style == DiffStyle::Razor
    }
}
