//! Streaming conversion of profile documents into canonical `path = value` text.
//!
//! # Error Handling Strategy
//!
//! Every failure is fatal to the single document being converted and is
//! reported as a [`ConvertError`] carrying the file and, for content errors,
//! the input line. File-level entry points delete partial output before
//! returning, so a failed or interrupted conversion never leaves a truncated
//! canonical file behind for the cache policy to mistake as fresh.
//!
//! # Example
//!
//! ```
//! use profile_diff::canonical::{ConvertOptions, EscapeMode, canonicalize_bytes};
//!
//! let opts = ConvertOptions { escape: EscapeMode::Escape, ..ConvertOptions::default() };
//! let (text, _) = canonicalize_bytes(br#"{"a:b":"x"}"#, &opts)?;
//! assert_eq!(String::from_utf8_lossy(&text), "/{a_3Ab} = \"x\"\n");
//! # Ok::<(), profile_diff::canonical::ConvertError>(())
//! ```

pub mod error;
pub mod escape;
pub mod machine;
pub mod options;
pub mod output;
pub mod path;
pub mod slice;

pub use error::ConvertError;
pub use machine::{ConvertStats, Labels, canonicalize, canonicalize_bytes};
pub use options::{ConvertOptions, EscapeMode, Limits};
pub use output::{
    ConvertOutcome, OutputTarget, OutputWriter, PendingOutput, convert_file, convert_stream,
    decode_stream, open_input, plan_output,
};
pub use path::ResourcePath;
pub use slice::SliceOutput;
