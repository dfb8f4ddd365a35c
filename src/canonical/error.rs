use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort the conversion of a single document.
///
/// None of these are fatal to a whole run: the orchestrator records them per
/// file and carries on with the remaining jobs.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("error reading '{file}': {message} at line {line}")]
    Format { file: String, line: u64, message: String },

    #[error("error reading '{file}': string unicode error at line {line}: {message}")]
    Unicode { file: String, line: u64, message: String },

    #[error("error reading '{file}': path name exceeded {limit} bytes at line {line}")]
    PathTooLong { file: String, line: u64, limit: usize },

    #[error("error reading '{file}': path name component exceeded {limit} bytes at line {line}")]
    NameTooLong { file: String, line: u64, limit: usize },

    #[error("error reading '{file}': value exceeded {limit} bytes at line {line}")]
    ValueTooLong { file: String, line: u64, limit: usize },

    #[error("cannot {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion of '{file}' interrupted")]
    Interrupted { file: String },
}

impl ConvertError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConvertError::Io { action, path: path.into(), source }
    }

    /// True when the conversion stopped because cancellation was requested.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ConvertError::Interrupted { .. })
    }

    /// Input line the error was detected on, when it concerns document content.
    pub fn line(&self) -> Option<u64> {
        match self {
            ConvertError::Format { line, .. }
            | ConvertError::Unicode { line, .. }
            | ConvertError::PathTooLong { line, .. }
            | ConvertError::NameTooLong { line, .. }
            | ConvertError::ValueTooLong { line, .. } => Some(*line),
            ConvertError::Io { .. } | ConvertError::Interrupted { .. } => None,
        }
    }
}
