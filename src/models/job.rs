use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::canonical::OutputTarget;

/// Which of the two compared trees a job belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSide {
    Left,
    Right,
}

impl TreeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TreeSide::Left => "left",
            TreeSide::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Json,
    Xml,
}

impl DocumentFormat {
    /// Format implied by the file name (`.xml` and `.xml.gz` are XML)
    pub fn from_path(path: &Path) -> Self {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".xml") { DocumentFormat::Xml } else { DocumentFormat::Json }
    }
}

/// One file to canonicalize.
///
/// The option set is shared by every job of a run and passed alongside the
/// job list rather than copied into each job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub side: TreeSide,
    pub input: PathBuf,
    /// Input path relative to its tree root, used for logging and ordering
    pub relative: PathBuf,
    pub target: OutputTarget,
    pub format: DocumentFormat,
}

impl ConversionJob {
    pub fn new(side: TreeSide, root: &Path, relative: PathBuf, target: OutputTarget) -> Self {
        let input = root.join(&relative);
        let format = DocumentFormat::from_path(&input);
        Self { side, input, relative, target, format }
    }
}
