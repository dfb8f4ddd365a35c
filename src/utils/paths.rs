use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::canonical::ConvertOptions;

const GZ_SUFFIX: &str = ".gz";

/// Extensions of profile documents picked up by tree discovery
pub const PROFILE_EXTENSIONS: &[&str] = &[".xml", ".xml.gz", ".json", ".json.gz"];

/// Extensions of auxiliary conversion artifacts kept out of diffs
pub const ARTIFACT_EXTENSIONS: &[&str] = &[".slice", ".dep"];

/// Removes `suffix` from the end of `name` unless nothing would be left
fn strip_once<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    if name.len() > suffix.len() { name.strip_suffix(suffix) } else { None }
}

/// Returns true if `name` ends with one of the profile document extensions
pub fn is_profile_name(name: &str) -> bool {
    PROFILE_EXTENSIONS.iter().any(|ext| strip_once(name, ext).is_some())
}

/// Computes the canonical output file name for an input file name.
///
/// A trailing `.gz` is dropped, then the first matching strip suffix, then the
/// output suffix is appended (plus `.gz` when compressing).
///
/// # Examples
///
/// ```
/// use profile_diff::canonical::ConvertOptions;
/// use profile_diff::utils::paths::output_file_name;
///
/// let opts = ConvertOptions::default();
/// assert_eq!(output_file_name("web1.json.gz", &opts), "web1.txt.gz");
/// ```
pub fn output_file_name(input_name: &str, options: &ConvertOptions) -> String {
    let mut stem = strip_once(input_name, GZ_SUFFIX).unwrap_or(input_name);
    for suffix in &options.strip_suffixes {
        if let Some(stripped) = strip_once(stem, suffix) {
            stem = stripped;
            break;
        }
    }

    let mut name = String::with_capacity(stem.len() + options.output_suffix.len() + 3);
    name.push_str(stem);
    name.push_str(&options.output_suffix);
    if options.compressed() {
        name.push_str(GZ_SUFFIX);
    }
    name
}

/// Full output path: next to the input, or inside `dir` when given
pub fn output_path(input: &Path, dir: Option<&Path>, options: &ConvertOptions) -> PathBuf {
    let file_name = file_name_lossy(input);
    let name = output_file_name(&file_name, options);
    match dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Slice file belonging to a canonical output file (`.gz` is never kept)
pub fn slice_path(output: &Path, options: &ConvertOptions) -> PathBuf {
    let file_name = file_name_lossy(output);
    let stem = strip_once(&file_name, GZ_SUFFIX).unwrap_or(&file_name);
    output.with_file_name(format!("{}{}", stem, options.slice_suffix))
}

/// Profile name shown in reports: the file name without canonical suffixes
pub fn profile_name(canonical: &Path, options: &ConvertOptions) -> String {
    let file_name = file_name_lossy(canonical);
    let stem = strip_once(&file_name, GZ_SUFFIX).unwrap_or(&file_name);
    let stem = strip_once(stem, &options.output_suffix).unwrap_or(stem);
    stem.to_string()
}

fn file_name_lossy(path: &Path) -> Cow<'_, str> {
    path.file_name().map(|n| n.to_string_lossy()).unwrap_or(Cow::Borrowed(""))
}

/// Joins the parent directory of `relative` onto `root`
pub fn mirror_dir(root: &Path, relative: &Path) -> PathBuf {
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
        _ => root.to_path_buf(),
    }
}
