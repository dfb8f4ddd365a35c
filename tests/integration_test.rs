/// End-to-end tests for translation and comparison through the library API
mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use common::{
    HostProfileBuilder, PERSONALITY, ProfileTreeBuilder, backdate_sources, changed_trees,
};
use profile_diff::canonical::{ConvertOptions, canonicalize_bytes};
use profile_diff::discovery::{Layout, plan_jobs};
use profile_diff::pipeline::{
    CompareOptions, DiffEngine, DiffOutput, PassthroughDistiller, TranslationMode, compare,
};
use profile_diff::pool::{PoolConfig, run_jobs};
use profile_diff::utils::CancelToken;
use serde_json::Value;
use tempfile::TempDir;
use walkdir::WalkDir;

/// In-process recursive diff printing GNU-style headers and `Only in` lines
struct TreeDiff;

impl TreeDiff {
    fn files(root: &Path, excluded: &[&str]) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
            .filter(|p| {
                let name = p.to_string_lossy();
                !excluded.iter().any(|ext| name.ends_with(ext))
            })
            .collect();
        files.sort();
        files
    }
}

impl DiffEngine for TreeDiff {
    fn diff(&self, left: &Path, right: &Path, excluded: &[&str]) -> Result<DiffOutput> {
        let left_files = Self::files(left, excluded);
        let right_files = Self::files(right, excluded);
        let mut text = String::new();
        for file in &left_files {
            let (l, r) = (left.join(file), right.join(file));
            if !right_files.contains(file) {
                text.push_str(&only_in(&l));
            } else if fs::read(&l)? != fs::read(&r)? {
                text.push_str(&format!("diff -r {} {}\n", l.display(), r.display()));
            }
        }
        for file in right_files.iter().filter(|f| !left_files.contains(f)) {
            text.push_str(&only_in(&right.join(file)));
        }
        Ok(DiffOutput { differences: !text.is_empty(), text: text.into_bytes() })
    }

    fn reads_compressed(&self) -> bool {
        true
    }
}

fn only_in(file: &Path) -> String {
    let name = file.file_name().unwrap().to_string_lossy();
    format!("Only in {}: {}\n", file.parent().unwrap().display(), name)
}

fn pool(workers: usize) -> PoolConfig {
    PoolConfig { workers, progress: false, grace: Duration::from_millis(100), ..PoolConfig::default() }
}

fn compare_options(left: &Path, right: &Path, mode: TranslationMode, workers: usize) -> CompareOptions {
    CompareOptions {
        left: left.to_path_buf(),
        right: right.to_path_buf(),
        translate: true,
        mode,
        convert: ConvertOptions::default(),
        pool: pool(workers),
        personality: Some(PERSONALITY.to_string()),
        list_personalities: true,
    }
}

/// Relative path and content of every file below `root`
fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

fn many_hosts(count: usize) -> (TempDir, TempDir) {
    let mut left = ProfileTreeBuilder::new();
    let mut right = ProfileTreeBuilder::new();
    for i in 0..count {
        let name = format!("cluster{}/host{i:03}.json", i % 4);
        let host = HostProfileBuilder::new(&format!("host{i:03}"))
            .with_personality(if i % 3 == 0 { "db" } else { "web" });
        left = left.with_host(&name, &host);
        let host = if i % 5 == 0 { host.with_motd(&format!("host {i}\nwelcome")) } else { host };
        right = right.with_host(&name, &host);
    }
    (left.build(), right.build())
}

#[test]
fn test_translation_independent_of_worker_count() {
    let (left, right) = many_hosts(40);
    let serial = TempDir::new().expect("Failed to create temp dir");
    let parallel = TempDir::new().expect("Failed to create temp dir");
    let opts = ConvertOptions { slices: vec![PERSONALITY.to_string()], ..ConvertOptions::default() };

    for (out, workers) in [(&serial, 1), (&parallel, 8)] {
        let jobs = plan_jobs(left.path(), right.path(), &Layout::under(out.path())).unwrap();
        let report = run_jobs(&jobs, &opts, &pool(workers), &CancelToken::new()).unwrap();
        assert_eq!(report.converted, 80);
    }

    let serial = snapshot(serial.path());
    assert_eq!(serial.len(), 160);
    assert_eq!(serial, snapshot(parallel.path()));
}

#[test]
fn test_compare_report_independent_of_worker_count() {
    let (left, right) = many_hosts(24);
    let serial = TempDir::new().expect("Failed to create temp dir");
    let parallel = TempDir::new().expect("Failed to create temp dir");
    let cancel = CancelToken::new();

    let mut reports = Vec::new();
    for (out, workers) in [(&serial, 1), (&parallel, 8)] {
        let mode = TranslationMode::OutputRoot(out.path().to_path_buf());
        let opts = compare_options(left.path(), right.path(), mode, workers);
        let outcome = compare(&opts, &TreeDiff, &PassthroughDistiller, &cancel).unwrap();
        reports.push(outcome.report);
    }

    let (serial, parallel) = (&reports[0], &reports[1]);
    assert_eq!(serial.profiles, parallel.profiles);
    assert_eq!(serial.summary(), parallel.summary());
    // hosts 0, 5, 10, 15 and 20 gained a motd
    assert_eq!(serial.profiles.len(), 5);
    assert_eq!(
        serial.summary(),
        "Profiles with differences: 5\nPersonalities with differences: 2 (db, web)\n"
    );
}

#[test]
fn test_compare_reports_changed_and_added_profiles() {
    let (left, right) = changed_trees();
    let out = TempDir::new().expect("Failed to create temp dir");
    let mode = TranslationMode::OutputRoot(out.path().to_path_buf());
    let opts = compare_options(left.path(), right.path(), mode, 2);

    let outcome = compare(&opts, &TreeDiff, &PassthroughDistiller, &CancelToken::new()).unwrap();

    let profiles: Vec<&str> = outcome.report.profiles.iter().map(String::as_str).collect();
    assert_eq!(profiles, vec!["db2", "web1"]);
    assert_eq!(
        outcome.report.personalities.as_ref().map(|p| p.iter().cloned().collect::<Vec<_>>()),
        Some(vec!["db-replica".to_string(), "web".to_string()])
    );
    assert!(outcome.report.body.contains("@@ Modified in: "));
    assert_eq!(outcome.translation.map(|t| t.converted), Some(7));
}

#[test]
fn test_compare_in_place_keeps_sources_out_of_diff() {
    let (left, right) = changed_trees();
    let opts = compare_options(left.path(), right.path(), TranslationMode::InPlace, 2);

    let outcome = compare(&opts, &TreeDiff, &PassthroughDistiller, &CancelToken::new()).unwrap();

    assert!(left.path().join("cluster1/web1.txt.gz").exists());
    assert!(!outcome.report.body.contains(".json"));
    assert!(!outcome.report.body.contains(".slice"));
    assert_eq!(outcome.report.profiles.len(), 2);
}

#[test]
fn test_compare_scratch_directory_removed() {
    let (left, right) = changed_trees();
    let opts = compare_options(left.path(), right.path(), TranslationMode::Scratch, 2);

    let outcome = compare(&opts, &TreeDiff, &PassthroughDistiller, &CancelToken::new()).unwrap();

    let scratch = outcome
        .report
        .body
        .lines()
        .find_map(|l| l.strip_prefix("diff -r "))
        .and_then(|l| l.split_whitespace().next())
        .map(PathBuf::from)
        .expect("diff header missing");
    assert!(!scratch.exists());
    assert!(!left.path().join("cluster1/web1.txt.gz").exists());
}

#[test]
fn test_compare_interrupted_before_diff() {
    let (left, right) = changed_trees();
    let out = TempDir::new().expect("Failed to create temp dir");
    let mode = TranslationMode::OutputRoot(out.path().to_path_buf());
    let opts = compare_options(left.path(), right.path(), mode, 2);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = compare(&opts, &TreeDiff, &PassthroughDistiller, &cancel).unwrap_err();
    let pool_err = err.downcast_ref::<profile_diff::PoolError>().expect("pool error");
    assert!(pool_err.is_interrupted());
}

#[test]
fn test_second_translation_is_idempotent() {
    let (left, right) = changed_trees();
    let out = TempDir::new().expect("Failed to create temp dir");
    let jobs = plan_jobs(left.path(), right.path(), &Layout::under(out.path())).unwrap();
    let opts = ConvertOptions::default();

    let first = run_jobs(&jobs, &opts, &pool(3), &CancelToken::new()).unwrap();
    assert_eq!(first.converted, 7);
    let before = snapshot(out.path());
    let mtimes: Vec<_> = WalkDir::new(out.path())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().unwrap().modified().unwrap())
        .collect();
    backdate_sources(left.path());
    backdate_sources(right.path());

    let second = run_jobs(&jobs, &opts, &pool(3), &CancelToken::new()).unwrap();
    assert_eq!(second.converted, 0);
    assert_eq!(second.skipped, 7);
    assert_eq!(snapshot(out.path()), before);
    let after: Vec<_> = WalkDir::new(out.path())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().unwrap().modified().unwrap())
        .collect();
    assert_eq!(mtimes, after);
}

/// Counts scalar leaves and reports the deepest nesting level holding one
fn leaves(value: &Value, depth: usize, count: &mut usize, max_depth: &mut usize) {
    match value {
        Value::Object(map) => map.values().for_each(|v| leaves(v, depth + 1, count, max_depth)),
        Value::Array(items) => items.iter().for_each(|v| leaves(v, depth + 1, count, max_depth)),
        _ => {
            *count += 1;
            *max_depth = (*max_depth).max(depth);
        }
    }
}

#[test]
fn test_one_line_per_scalar_leaf() {
    let doc = r#"{
        "hardware": {"cpu": [{"cores": 8, "model": "x86"}, {"cores": 8, "model": "x86"}], "ram": [[1, 2], [3]]},
        "system": {"enabled": true, "kernel": null, "label": "a = b", "weight": -1.5e3, "empty": {}, "none": []}
    }"#;
    let parsed: Value = serde_json::from_str(doc).unwrap();
    let (mut count, mut max_depth) = (0, 0);
    leaves(&parsed, 0, &mut count, &mut max_depth);

    let opts = ConvertOptions { show_terminals: false, ..ConvertOptions::default() };
    let (text, _) = canonicalize_bytes(doc.as_bytes(), &opts).unwrap();
    let text = String::from_utf8(text).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), count);
    let deepest = lines
        .iter()
        .map(|l| l.split_once(" = ").unwrap().0.matches('/').count())
        .max()
        .unwrap();
    assert_eq!(deepest, max_depth);
    assert!(lines.contains(&"/system/label = \"a = b\""));
    assert!(lines.contains(&"/system/weight = -1.5e3"));
    assert!(lines.contains(&"/hardware/ram/1/0 = 3"));
}

#[test]
fn test_index_placeholder_example() {
    let opts = ConvertOptions { generate_indices: false, ..ConvertOptions::default() };
    let (text, _) = canonicalize_bytes(br#"{"a":[10,20,30]}"#, &opts).unwrap();
    assert_eq!(String::from_utf8(text).unwrap(), "/a\n/a/# = 10\n/a/# = 20\n/a/# = 30\n");
}

#[test]
fn test_slice_file_next_to_mirrored_output() {
    let tree = ProfileTreeBuilder::new()
        .with_host("c1/web1.json", &HostProfileBuilder::new("web1").with_personality("frontend"))
        .build();
    let empty = ProfileTreeBuilder::new().build();
    let out = TempDir::new().expect("Failed to create temp dir");
    let opts = ConvertOptions {
        compression: 0,
        slices: vec![PERSONALITY.to_string()],
        ..ConvertOptions::default()
    };

    let jobs = plan_jobs(tree.path(), empty.path(), &Layout::under(out.path())).unwrap();
    run_jobs(&jobs, &opts, &pool(1), &CancelToken::new()).unwrap();

    let slice = fs::read_to_string(out.path().join("left/c1/web1.txt.slice")).unwrap();
    assert_eq!(slice, "/system/personality/name = \"frontend\"\n");
    let text = fs::read_to_string(out.path().join("left/c1/web1.txt")).unwrap();
    assert!(text.contains("/system/personality/name = \"frontend\"\n"));
}
