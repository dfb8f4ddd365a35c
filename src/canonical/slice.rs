use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::ConvertError;

/// Side channel receiving the lines of configured slice paths.
///
/// The file variant is opened on the first write only, so documents without a
/// slice hit never leave an empty slice file behind.
#[derive(Debug)]
pub enum SliceOutput {
    Disabled,
    Memory(Vec<u8>),
    File { path: PathBuf, writer: Option<BufWriter<File>> },
}

impl SliceOutput {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        SliceOutput::File { path: path.into(), writer: None }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            SliceOutput::File { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> Result<(), ConvertError> {
        match self {
            SliceOutput::Disabled => Ok(()),
            SliceOutput::Memory(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            SliceOutput::File { path, writer } => {
                if writer.is_none() {
                    let file =
                        File::create(&*path).map_err(|e| ConvertError::io("create", &*path, e))?;
                    *writer = Some(BufWriter::new(file));
                }
                match writer {
                    Some(w) => w.write_all(bytes).map_err(|e| ConvertError::io("write", &*path, e)),
                    None => Ok(()),
                }
            }
        }
    }

    /// Flushes and closes the slice file, returning captured bytes for the memory variant
    pub fn finish(self) -> Result<Option<Vec<u8>>, ConvertError> {
        match self {
            SliceOutput::Disabled => Ok(None),
            SliceOutput::Memory(buf) => Ok(Some(buf)),
            SliceOutput::File { path, writer } => {
                if let Some(w) = writer {
                    let file = w
                        .into_inner()
                        .map_err(|e| ConvertError::io("write", &path, e.into_error()))?;
                    file.sync_all().map_err(|e| ConvertError::io("close", &path, e))?;
                }
                Ok(None)
            }
        }
    }

    /// Drops a partially written slice file
    pub fn discard(self) {
        if let SliceOutput::File { path, writer: Some(w) } = self {
            drop(w);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(file = %path.display(), error = %e, "failed to remove partial slice file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_file_slice_created_lazily() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("host.txt.slice");

        let slice = SliceOutput::to_file(&path);
        slice.finish().unwrap();
        assert!(!path.exists(), "No slice file without a slice hit");

        let mut slice = SliceOutput::to_file(&path);
        slice.write_all(b"/a = 1\n").unwrap();
        slice.finish().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "/a = 1\n");
    }

    #[test]
    fn test_discard_removes_partial_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("host.txt.slice");

        let mut slice = SliceOutput::to_file(&path);
        slice.write_all(b"/a = ").unwrap();
        slice.discard();
        assert!(!path.exists());
    }

    #[test]
    fn test_memory_slice_returns_bytes() {
        let mut slice = SliceOutput::Memory(Vec::new());
        slice.write_all(b"/a = 1\n").unwrap();
        assert_eq!(slice.finish().unwrap(), Some(b"/a = 1\n".to_vec()));
    }
}
