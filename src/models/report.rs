use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use super::job::TreeSide;

/// A job that did not produce canonical output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub side: TreeSide,
    pub input: PathBuf,
    /// Command line of the external converter, for subprocess jobs
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    pub line: Option<u64>,
    pub message: String,
    /// Captured stderr of the external converter
    pub output: String,
}

impl JobFailure {
    pub fn new(side: TreeSide, input: PathBuf, message: impl Into<String>) -> Self {
        Self {
            side,
            input,
            command: None,
            exit_code: None,
            line: None,
            message: message.into(),
            output: String::new(),
        }
    }
}

/// Aggregate result of one translation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub workers: usize,
    pub chunks: usize,
    pub elapsed_ms: u128,
    pub failures: Vec<JobFailure>,
}

impl PoolReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of jobs accounted for so far
    pub fn finished(&self) -> usize {
        self.converted + self.skipped + self.failures.len()
    }
}

/// Distilled difference text plus the data for its summary lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub body: String,
    pub profiles: BTreeSet<String>,
    /// `None` when no personality slice was configured
    pub personalities: Option<BTreeSet<String>>,
    pub list_personalities: bool,
}

impl DiffReport {
    pub fn has_differences(&self) -> bool {
        !self.profiles.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut out = format!("Profiles with differences: {}\n", self.profiles.len());
        if let Some(personalities) = &self.personalities {
            let _ = write!(out, "Personalities with differences: {}", personalities.len());
            if self.list_personalities && !personalities.is_empty() {
                let names: Vec<&str> = personalities.iter().map(String::as_str).collect();
                let _ = write!(out, " ({})", names.join(", "));
            }
            out.push('\n');
        }
        out
    }

    /// Full report: distilled body followed by the summary
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 128);
        out.push_str(&self.body);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.summary());
        out
    }
}
