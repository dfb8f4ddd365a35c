use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Reads profile paths from a list file, one per line.
///
/// Blank lines and lines starting with `#` are ignored, surrounding
/// whitespace is trimmed. `-` reads the list from stdin.
pub fn read_file_list(list: &Path) -> Result<Vec<PathBuf>> {
    if list == Path::new("-") {
        return parse_list(io::stdin().lock()).context("Failed to read file list from stdin");
    }
    let file =
        File::open(list).with_context(|| format!("Failed to open file list: {}", list.display()))?;
    parse_list(BufReader::new(file))
        .with_context(|| format!("Failed to read file list: {}", list.display()))
}

fn parse_list<R: BufRead>(reader: R) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        paths.push(PathBuf::from(entry));
    }
    Ok(paths)
}
