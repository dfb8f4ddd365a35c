use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::canonical::OutputTarget;
use crate::models::{ConversionJob, TreeSide};
use crate::utils::paths::{is_profile_name, mirror_dir};

/// Where canonical trees are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Canonical files next to their sources
    InPlace,
    /// Canonical files mirrored under separate roots
    Mirror { left: PathBuf, right: PathBuf },
}

impl Layout {
    /// Mirror layout under `<root>/left` and `<root>/right`
    pub fn under(root: &Path) -> Self {
        Layout::Mirror { left: root.join("left"), right: root.join("right") }
    }

    /// Root of the canonical tree for one side
    pub fn canonical_root<'a>(&'a self, side: TreeSide, source: &'a Path) -> &'a Path {
        match (self, side) {
            (Layout::InPlace, _) => source,
            (Layout::Mirror { left, .. }, TreeSide::Left) => left,
            (Layout::Mirror { right, .. }, TreeSide::Right) => right,
        }
    }

    fn target(&self, side: TreeSide, relative: &Path) -> OutputTarget {
        match self {
            Layout::InPlace => OutputTarget::InPlace,
            Layout::Mirror { .. } => {
                OutputTarget::Directory(mirror_dir(self.canonical_root(side, Path::new("")), relative))
            }
        }
    }
}

/// Finds profile documents below `root`.
///
/// Returns paths relative to `root`, sorted, so job order (and therefore
/// every log and report) is stable across runs.
///
/// # Errors
///
/// Returns an error if `root` is not a directory or any entry below it cannot
/// be read.
pub fn find_profiles(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Directory not found: {}", root.display());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to read directory tree: {}", root.display()))?;
        if entry.depth() > 0 && entry.path_is_symlink() {
            tracing::warn!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_profile_name(&name) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("Path escapes tree root: {}", entry.path().display()))?;
        found.push(relative.to_path_buf());
    }

    found.sort();
    Ok(found)
}

/// Builds the conversion jobs for both trees, left tree first
pub fn plan_jobs(left: &Path, right: &Path, layout: &Layout) -> Result<Vec<ConversionJob>> {
    let mut jobs = Vec::new();
    for (side, root) in [(TreeSide::Left, left), (TreeSide::Right, right)] {
        let files = find_profiles(root)?;
        tracing::debug!(root = %root.display(), files = files.len(), "discovered profiles");
        for relative in files {
            let target = layout.target(side, &relative);
            jobs.push(ConversionJob::new(side, root, relative, target));
        }
    }
    Ok(jobs)
}
