//! Turns distilled diff text into a [`DiffReport`].

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::distill::MODIFIED_MARKER;
use crate::canonical::ConvertOptions;
use crate::models::DiffReport;
use crate::utils::{profile_name, sanitize_for_display, slice_path, strip_quotes};

const ONLY_IN: &str = "Only in ";

/// Roots and options needed to resolve files named in the diff text
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub left: &'a Path,
    pub right: &'a Path,
    pub options: &'a ConvertOptions,
    pub personalities: bool,
    pub list_personalities: bool,
}

/// Collects changed profiles (and their personalities) from distilled text
pub fn build_report(distilled: &[u8], ctx: &ReportContext<'_>) -> DiffReport {
    let body = String::from_utf8_lossy(distilled).into_owned();
    let mut profiles = BTreeSet::new();
    let mut personalities = BTreeSet::new();

    for line in body.lines() {
        if let Some(files) = line.strip_prefix(MODIFIED_MARKER) {
            for file in files.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                record(Path::new(file), ctx, &mut profiles, &mut personalities);
            }
        } else if let Some(rest) = line.strip_prefix(ONLY_IN)
            && let Some((dir, name)) = rest.split_once(": ")
        {
            for file in only_in_files(&Path::new(dir).join(name), ctx.options) {
                record(&file, ctx, &mut profiles, &mut personalities);
            }
        }
    }

    DiffReport {
        body,
        profiles,
        personalities: ctx.personalities.then_some(personalities),
        list_personalities: ctx.list_personalities,
    }
}

/// Canonical files behind an `Only in` entry; a directory stands for everything below it
fn only_in_files(path: &Path, options: &ConvertOptions) -> Vec<PathBuf> {
    if path.is_dir() {
        return WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| is_canonical_name(&e.file_name().to_string_lossy(), options))
            .map(|e| e.into_path())
            .collect();
    }
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if is_canonical_name(&name, options) { vec![path.to_path_buf()] } else { Vec::new() }
}

fn is_canonical_name(name: &str, options: &ConvertOptions) -> bool {
    let name = name.strip_suffix(".gz").unwrap_or(name);
    name.ends_with(&options.output_suffix)
}

fn record(
    file: &Path,
    ctx: &ReportContext<'_>,
    profiles: &mut BTreeSet<String>,
    personalities: &mut BTreeSet<String>,
) {
    profiles.insert(profile_name(file, ctx.options));
    if !ctx.personalities {
        return;
    }
    for candidate in counterparts(file, ctx) {
        if let Some(personality) = read_personality(&slice_path(&candidate, ctx.options)) {
            personalities.insert(personality);
        }
    }
}

/// The file itself plus the same relative file in the other tree
fn counterparts(file: &Path, ctx: &ReportContext<'_>) -> Vec<PathBuf> {
    let mut files = vec![file.to_path_buf()];
    if let Ok(relative) = file.strip_prefix(ctx.left) {
        files.push(ctx.right.join(relative));
    } else if let Ok(relative) = file.strip_prefix(ctx.right) {
        files.push(ctx.left.join(relative));
    }
    files
}

/// Value of the first line of a slice file, unquoted and safe to print
pub fn read_personality(slice: &Path) -> Option<String> {
    let file = File::open(slice).ok()?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).ok()?;
    let line = first.trim_end_matches(['\n', '\r']);
    let value = line.split_once(" = ").map_or(line, |(_, value)| value);
    let value = sanitize_for_display(strip_quotes(value.trim()));
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn options() -> ConvertOptions {
        ConvertOptions {
            compression: 0,
            slices: vec!["/system/personality/name".to_string()],
            ..ConvertOptions::default()
        }
    }

    #[test]
    fn test_profiles_from_markers_and_only_in() {
        let opts = options();
        let ctx = ReportContext {
            left: Path::new("/l"),
            right: Path::new("/r"),
            options: &opts,
            personalities: false,
            list_personalities: false,
        };
        let text = b"@@ Modified in: /l/a/web1.txt, /l/web2.txt\nOnly in /r: web3.txt\nOnly in /r: web3.txt.slice\n";
        let report = build_report(text, &ctx);

        let names: Vec<&str> = report.profiles.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["web1", "web2", "web3"]);
        assert_eq!(report.personalities, None);
    }

    #[test]
    fn test_personalities_resolved_in_both_trees() {
        let left = TempDir::new().expect("Failed to create temp dir");
        let right = TempDir::new().expect("Failed to create temp dir");
        fs::write(left.path().join("web1.txt.slice"), "/system/personality/name = \"web-old\"\n")
            .unwrap();
        fs::write(right.path().join("web1.txt.slice"), "/system/personality/name = \"web\"\n")
            .unwrap();

        let opts = options();
        let ctx = ReportContext {
            left: left.path(),
            right: right.path(),
            options: &opts,
            personalities: true,
            list_personalities: true,
        };
        let marker = format!("@@ Modified in: {}\n", left.path().join("web1.txt").display());
        let report = build_report(marker.as_bytes(), &ctx);

        let found: Vec<&str> =
            report.personalities.as_ref().unwrap().iter().map(String::as_str).collect();
        assert_eq!(found, vec!["web", "web-old"]);
        assert!(report.render().ends_with("Personalities with differences: 2 (web, web-old)\n"));
    }

    #[test]
    fn test_modified_list_keeps_spaces_in_paths() {
        let opts = options();
        let ctx = ReportContext {
            left: Path::new("/l"),
            right: Path::new("/r"),
            options: &opts,
            personalities: false,
            list_personalities: false,
        };
        let report = build_report(b"@@ Modified in: /l/lab hosts/web 1.txt, /l/db1.txt\n", &ctx);

        let names: Vec<&str> = report.profiles.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["db1", "web 1"]);
    }

    #[test]
    fn test_only_in_directory_counts_every_profile_below() {
        let left = TempDir::new().expect("Failed to create temp dir");
        let right = TempDir::new().expect("Failed to create temp dir");
        let cluster = right.path().join("cluster2/rack1");
        fs::create_dir_all(&cluster).unwrap();
        fs::write(cluster.join("web7.txt"), "/a = 1\n").unwrap();
        fs::write(cluster.join("web7.txt.slice"), "/system/personality/name = \"web\"\n").unwrap();
        fs::write(right.path().join("cluster2/db9.txt.gz"), b"").unwrap();

        let opts = options();
        let ctx = ReportContext {
            left: left.path(),
            right: right.path(),
            options: &opts,
            personalities: true,
            list_personalities: false,
        };
        let line = format!("Only in {}: cluster2\n", right.path().display());
        let report = build_report(line.as_bytes(), &ctx);

        let names: Vec<&str> = report.profiles.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["db9", "web7"]);
        let found: Vec<&str> =
            report.personalities.as_ref().unwrap().iter().map(String::as_str).collect();
        assert_eq!(found, vec!["web"]);
    }

    #[test]
    fn test_read_personality_sanitizes() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let slice = dir.path().join("x.txt.slice");
        fs::write(&slice, "/p = \"evil\u{1b}[31m\"\n").unwrap();
        assert_eq!(read_personality(&slice), Some("evil".to_string()));
        assert_eq!(read_personality(&dir.path().join("missing.slice")), None);
    }
}
