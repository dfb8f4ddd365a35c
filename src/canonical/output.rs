//! File-level conversion: naming, caching, compression and cleanup.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use super::error::ConvertError;
use super::machine::{ConvertStats, Labels, canonicalize};
use super::options::ConvertOptions;
use super::slice::SliceOutput;
use crate::cache::{CacheDecision, check_output};
use crate::utils::{CancelToken, output_path, slice_path};

/// Buffer size used for compressed and plain streams
const STREAM_BUFFER_SIZE: usize = 512 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where canonical text for a file goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Next to the input file
    InPlace,
    /// Inside the given directory, created on demand
    Directory(PathBuf),
}

impl OutputTarget {
    fn dir(&self) -> Option<&Path> {
        match self {
            OutputTarget::InPlace => None,
            OutputTarget::Directory(dir) => Some(dir),
        }
    }
}

/// Result of converting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    Converted { output: PathBuf, stats: ConvertStats },
    /// Existing output was newer than the input
    Skipped { output: PathBuf },
}

/// Opens a document for reading, transparently decompressing gzip input.
///
/// Compression is detected from the magic bytes rather than the file name.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, ConvertError> {
    let file = File::open(path).map_err(|e| ConvertError::io("open", path, e))?;
    decode_stream(BufReader::with_capacity(STREAM_BUFFER_SIZE, file))
        .map_err(|e| ConvertError::io("read", path, e))
}

/// Wraps `reader` in a gzip decoder when the stream starts with the gzip magic
pub fn decode_stream<'a, R: BufRead + 'a>(mut reader: R) -> io::Result<Box<dyn BufRead + 'a>> {
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        let decoder = MultiGzDecoder::new(reader);
        Ok(Box::new(BufReader::with_capacity(STREAM_BUFFER_SIZE, decoder)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Canonical output file, plain or gzip-compressed
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputWriter {
    pub fn create(path: &Path, compression: u32) -> Result<Self, ConvertError> {
        let file = File::create(path).map_err(|e| ConvertError::io("open for writing", path, e))?;
        let buffered = BufWriter::with_capacity(STREAM_BUFFER_SIZE, file);
        Ok(if compression > 0 {
            OutputWriter::Gzip(GzEncoder::new(buffered, Compression::new(compression)))
        } else {
            OutputWriter::Plain(buffered)
        })
    }

    /// Writes the gzip trailer (if any) and flushes everything to disk
    pub fn finish(self) -> io::Result<()> {
        let buffered = match self {
            OutputWriter::Plain(w) => w,
            OutputWriter::Gzip(gz) => gz.finish()?,
        };
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(w) => w.write(buf),
            OutputWriter::Gzip(w) => w.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            OutputWriter::Plain(w) => w.write_all(buf),
            OutputWriter::Gzip(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(w) => w.flush(),
            OutputWriter::Gzip(w) => w.flush(),
        }
    }
}

/// Output and slice files of one conversion in progress.
///
/// Both are removed again unless [`PendingOutput::commit`] succeeds.
pub struct PendingOutput {
    pub path: PathBuf,
    pub writer: OutputWriter,
    pub slices: SliceOutput,
}

impl PendingOutput {
    /// Creates the output file (and parent directory) and clears any stale slice file
    pub fn create(
        input: &Path,
        target: &OutputTarget,
        options: &ConvertOptions,
    ) -> Result<Self, ConvertError> {
        let path = output_path(input, target.dir(), options);
        if let Some(parent) = target.dir() {
            fs::create_dir_all(parent).map_err(|e| ConvertError::io("create directory", parent, e))?;
        }

        let slices = if options.has_slices() {
            let slice_file = slice_path(&path, options);
            remove_if_exists(&slice_file)?;
            SliceOutput::to_file(slice_file)
        } else {
            SliceOutput::Disabled
        };

        let writer = OutputWriter::create(&path, options.compression)?;
        Ok(Self { path, writer, slices })
    }

    pub fn commit(self) -> Result<PathBuf, ConvertError> {
        let PendingOutput { path, writer, slices } = self;
        if let Err(e) = writer.finish() {
            slices.discard();
            discard_file(&path);
            return Err(ConvertError::io("close", path, e));
        }
        slices.finish()?;
        Ok(path)
    }

    pub fn discard(self) {
        let PendingOutput { path, writer, slices } = self;
        drop(writer);
        slices.discard();
        discard_file(&path);
    }
}

/// Resolves the output location of `input` and applies the cache policy
pub fn plan_output(
    input: &Path,
    target: &OutputTarget,
    options: &ConvertOptions,
) -> Result<(PathBuf, CacheDecision), ConvertError> {
    let output = output_path(input, target.dir(), options);
    let decision = check_output(input, &output, options.force)?;
    Ok((output, decision))
}

/// Converts one JSON document file to its canonical text file.
///
/// Skips the conversion when the existing output is still fresh. On any
/// error, including interruption, partially written output and slice files
/// are deleted.
///
/// # Errors
///
/// Returns the [`ConvertError`] that aborted this file.
pub fn convert_file(
    input: &Path,
    target: &OutputTarget,
    options: &ConvertOptions,
    cancel: &CancelToken,
) -> Result<ConvertOutcome, ConvertError> {
    let (output, decision) = plan_output(input, target, options)?;
    if decision.is_fresh() {
        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            "output exists and is newer, skipping"
        );
        return Ok(ConvertOutcome::Skipped { output });
    }

    let reader = open_input(input)?;
    let mut pending = PendingOutput::create(input, target, options)?;
    let labels = Labels { input, output: &output };
    match canonicalize(reader, &mut pending.writer, &mut pending.slices, options, cancel, labels) {
        Ok(stats) => {
            let output = pending.commit()?;
            tracing::debug!(
                input = %input.display(),
                output = %output.display(),
                values = stats.value_lines,
                "converted"
            );
            Ok(ConvertOutcome::Converted { output, stats })
        }
        Err(e) => {
            pending.discard();
            Err(e)
        }
    }
}

/// Converts a document stream straight to a writer (stdin/stdout use)
pub fn convert_stream<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    options: &ConvertOptions,
    cancel: &CancelToken,
    input_label: &Path,
) -> Result<ConvertStats, ConvertError> {
    let mut slices = SliceOutput::Disabled;
    let labels = Labels { input: input_label, output: Path::new("<stdout>") };
    canonicalize(input, output, &mut slices, options, cancel, labels)
}

fn remove_if_exists(path: &Path) -> Result<(), ConvertError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConvertError::io("remove", path, e)),
    }
}

fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(file = %path.display(), error = %e, "failed to remove partial output");
    }
}
