//! Profile Diff - canonicalize Quattor host profiles and compare profile trees
//!
//! This library turns hierarchical JSON profile documents into flat, line
//! oriented `path = value` text and uses that form to diff large trees of
//! profiles efficiently. It provides:
//!
//! - A streaming canonicalizer with escaping, slicing, compression and caching
//! - A worker pool translating whole trees in parallel
//! - A pipeline running an external recursive diff and distillation filter and
//!   summarizing changed profiles and personalities
//!
//! # Example
//!
//! ```
//! use profile_diff::canonical::{ConvertOptions, canonicalize_bytes};
//!
//! let opts = ConvertOptions { generate_indices: false, ..ConvertOptions::default() };
//! let (text, _) = canonicalize_bytes(br#"{"a":[10,20,30]}"#, &opts)?;
//! assert_eq!(String::from_utf8_lossy(&text), "/a\n/a/# = 10\n/a/# = 20\n/a/# = 30\n");
//! # Ok::<(), profile_diff::canonical::ConvertError>(())
//! ```

pub mod cache;
pub mod canonical;
pub mod cli;
pub mod discovery;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod utils;

// Re-export commonly used types
pub use canonical::{ConvertError, ConvertOptions, EscapeMode, canonicalize, convert_file};
pub use discovery::{Layout, plan_jobs};
pub use pipeline::{CompareOptions, compare};
pub use pool::{PoolConfig, PoolError, run_jobs};
pub use utils::CancelToken;
