//! Output freshness checks based on modification times

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

use crate::canonical::ConvertError;

/// Modification time and size of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub mtime: SystemTime,
    pub size: u64,
}

impl FileStamp {
    /// Reads the stamp of an existing file
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self { mtime: metadata.modified()?, size: metadata.len() })
    }

    /// Like [`FileStamp::from_path`] but maps a missing file to `None`
    pub fn stat(path: &Path) -> io::Result<Option<Self>> {
        match Self::from_path(path) {
            Ok(stamp) => Ok(Some(stamp)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Why an output has to be regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleReason {
    Missing,
    Empty,
    Older,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Output exists, is non-empty and newer than the input
    Fresh,
    Stale(StaleReason),
}

impl CacheDecision {
    pub fn is_fresh(self) -> bool {
        matches!(self, CacheDecision::Fresh)
    }
}

/// Compares an input document against its canonical output.
///
/// The output is reused only when it exists, is non-empty and its mtime is
/// strictly newer than the input's; `force` always asks for regeneration.
///
/// # Errors
///
/// Returns an error if the input cannot be stat'ed, or if the output exists
/// but its metadata cannot be read.
pub fn check_output(input: &Path, output: &Path, force: bool) -> Result<CacheDecision, ConvertError> {
    let input_stamp =
        FileStamp::from_path(input).map_err(|e| ConvertError::io("open", input, e))?;

    if force {
        return Ok(CacheDecision::Stale(StaleReason::Forced));
    }

    let output_stamp = match FileStamp::stat(output) {
        Ok(Some(stamp)) => stamp,
        Ok(None) => return Ok(CacheDecision::Stale(StaleReason::Missing)),
        Err(e) => return Err(ConvertError::io("stat output", output, e)),
    };

    Ok(decide(&input_stamp, &output_stamp))
}

fn decide(input: &FileStamp, output: &FileStamp) -> CacheDecision {
    if output.size == 0 {
        CacheDecision::Stale(StaleReason::Empty)
    } else if output.mtime > input.mtime {
        CacheDecision::Fresh
    } else {
        CacheDecision::Stale(StaleReason::Older)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn stamp(secs: u64, size: u64) -> FileStamp {
        FileStamp { mtime: SystemTime::UNIX_EPOCH + Duration::from_secs(secs), size }
    }

    #[test]
    fn test_decide_newer_non_empty_is_fresh() {
        assert_eq!(decide(&stamp(100, 10), &stamp(101, 5)), CacheDecision::Fresh);
    }

    #[test]
    fn test_decide_same_mtime_is_stale() {
        assert_eq!(decide(&stamp(100, 10), &stamp(100, 5)), CacheDecision::Stale(StaleReason::Older));
    }

    #[test]
    fn test_decide_empty_output_is_stale() {
        assert_eq!(decide(&stamp(100, 10), &stamp(200, 0)), CacheDecision::Stale(StaleReason::Empty));
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).expect("Failed to open file");
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .expect("Failed to set mtime");
    }

    #[test]
    fn test_check_output_on_disk() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let input = dir.path().join("host.json");
        let output = dir.path().join("host.txt");
        fs::write(&input, "{}").unwrap();

        assert_eq!(
            check_output(&input, &output, false).unwrap(),
            CacheDecision::Stale(StaleReason::Missing)
        );

        fs::write(&output, "/a = 1\n").unwrap();
        set_mtime(&input, 1_000_000);
        set_mtime(&output, 2_000_000);
        assert!(check_output(&input, &output, false).unwrap().is_fresh());
        assert_eq!(
            check_output(&input, &output, true).unwrap(),
            CacheDecision::Stale(StaleReason::Forced)
        );

        set_mtime(&input, 3_000_000);
        assert_eq!(
            check_output(&input, &output, false).unwrap(),
            CacheDecision::Stale(StaleReason::Older)
        );
    }

    #[test]
    fn test_check_output_missing_input() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = check_output(&dir.path().join("nope.json"), &dir.path().join("nope.txt"), false)
            .unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }
}
