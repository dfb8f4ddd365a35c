//! Compare two profile trees: translate, diff, distill, summarize.
//!
//! # Error Handling Strategy
//!
//! Each stage either completes or aborts the whole comparison. Translation
//! failures surface as [`PoolError`](crate::pool::PoolError) inside the
//! returned [`anyhow::Error`] so callers can tell an interrupt from a failed
//! file. No report is produced from a partial translation, since missing
//! canonical files would show up as bogus differences.

pub mod command;
pub mod diff;
pub mod distill;
pub mod report;
pub mod sink;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use diff::{DiffEngine, DiffOutput, DiffStyle, ExternalDiff};
pub use distill::{CommandDistiller, Distiller, MODIFIED_MARKER, PassthroughDistiller};
pub use report::{ReportContext, build_report};
pub use sink::emit_report;

use crate::canonical::ConvertOptions;
use crate::discovery::{Layout, plan_jobs};
use crate::models::{DiffReport, PoolReport, TreeSide};
use crate::pool::{PoolConfig, PoolError, run_jobs};
use crate::utils::CancelToken;
use crate::utils::paths::{ARTIFACT_EXTENSIONS, PROFILE_EXTENSIONS};

/// Where translated trees live during a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationMode {
    /// Canonical files are written next to the sources
    InPlace,
    /// Canonical trees persist under `<root>/left` and `<root>/right`
    OutputRoot(PathBuf),
    /// Canonical trees go to a scratch directory removed afterwards
    Scratch,
}

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub left: PathBuf,
    pub right: PathBuf,
    /// When false the trees are assumed to hold canonical files already
    pub translate: bool,
    pub mode: TranslationMode,
    pub convert: ConvertOptions,
    pub pool: PoolConfig,
    /// Slice path holding the personality name
    pub personality: Option<String>,
    pub list_personalities: bool,
}

#[derive(Debug)]
pub struct CompareOutcome {
    pub report: DiffReport,
    pub translation: Option<PoolReport>,
}

/// Conversion options actually used for a comparison with `engine`
pub fn effective_options(opts: &CompareOptions, engine: &dyn DiffEngine) -> ConvertOptions {
    let mut convert = opts.convert.clone();
    if let Some(personality) = &opts.personality
        && !convert.slices.contains(personality)
    {
        convert.slices.push(personality.clone());
    }
    if convert.compressed() && !engine.reads_compressed() {
        tracing::warn!(
            level = convert.compression,
            "diff engine cannot read compressed files, writing uncompressed canonical files"
        );
        convert.compression = 0;
    }
    convert
}

/// Extensions the diff engine must skip
pub fn excluded_extensions<'a>(opts: &CompareOptions, convert: &'a ConvertOptions) -> Vec<&'a str> {
    let mut excluded: Vec<&str> = ARTIFACT_EXTENSIONS.to_vec();
    if !excluded.contains(&convert.slice_suffix.as_str()) {
        excluded.push(&convert.slice_suffix);
    }
    if !opts.translate || opts.mode == TranslationMode::InPlace {
        excluded.extend_from_slice(PROFILE_EXTENSIONS);
    }
    excluded
}

/// Runs the full comparison and returns the report, ready to emit.
///
/// # Errors
///
/// Fails if translation fails or is interrupted, or if the diff or
/// distillation command fails.
pub fn compare(
    opts: &CompareOptions,
    engine: &dyn DiffEngine,
    distiller: &dyn Distiller,
    cancel: &CancelToken,
) -> Result<CompareOutcome> {
    let convert = effective_options(opts, engine);

    let scratch;
    let layout = match &opts.mode {
        TranslationMode::InPlace => Layout::InPlace,
        TranslationMode::OutputRoot(root) => Layout::under(root),
        TranslationMode::Scratch => {
            scratch = tempfile::Builder::new()
                .prefix("profile-diff.")
                .tempdir()
                .context("Failed to create scratch directory")?;
            Layout::under(scratch.path())
        }
    };

    let (left, right, translation) = if opts.translate {
        let jobs = plan_jobs(&opts.left, &opts.right, &layout)?;
        let report = run_jobs(&jobs, &convert, &opts.pool, cancel)?;
        let left = layout.canonical_root(TreeSide::Left, &opts.left).to_path_buf();
        let right = layout.canonical_root(TreeSide::Right, &opts.right).to_path_buf();
        for root in [&left, &right] {
            ensure_dir(root)?;
        }
        (left, right, Some(report))
    } else {
        (opts.left.clone(), opts.right.clone(), None)
    };

    unless_interrupted(Ok(()), cancel)?;

    let excluded = excluded_extensions(opts, &convert);
    let diff = unless_interrupted(engine.diff(&left, &right, &excluded), cancel)?;
    tracing::info!(differences = diff.differences, bytes = diff.text.len(), "diff finished");

    let distilled = if diff.text.is_empty() {
        Vec::new()
    } else {
        unless_interrupted(distiller.distill(&diff.text), cancel)?
    };
    let ctx = ReportContext {
        left: &left,
        right: &right,
        options: &convert,
        personalities: opts.personality.is_some(),
        list_personalities: opts.list_personalities,
    };
    let report = build_report(&distilled, &ctx);

    Ok(CompareOutcome { report, translation })
}

/// Replaces the outcome of a stage with [`PoolError::Interrupted`] once the run is cancelled.
///
/// A SIGINT also reaches child processes in the foreground group, so their
/// failure after a cancel is the interrupt itself.
pub fn unless_interrupted<T>(result: Result<T>, cancel: &CancelToken) -> Result<T> {
    if !cancel.is_cancelled() {
        return result;
    }
    if let Err(e) = &result {
        tracing::debug!("stage failed after interrupt: {e:#}");
    }
    Err(PoolError::Interrupted { finished: 0, total: 0 }.into())
}

/// Mirror roots only appear when a tree holds at least one profile
fn ensure_dir(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create directory: {}", root.display()))
}
