use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::canonical::ConvertError;
use crate::models::PoolReport;

/// Why a single job failed
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {}", status_text(.exit_code))]
    Subprocess { command: String, exit_code: Option<i32>, stderr: String },

    #[error("no XML converter configured, cannot translate {}", .0.display())]
    NoXmlConverter(PathBuf),
}

fn status_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

impl JobError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, JobError::Convert(e) if e.is_interrupted())
    }
}

/// Run-level failure of the worker pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("interrupted after {finished} of {total} files")]
    Interrupted { finished: usize, total: usize },

    #[error("{} of {} files failed to translate", .0.failures.len(), .0.total)]
    JobsFailed(Box<PoolReport>),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PoolError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, PoolError::Interrupted { .. })
    }
}
