//! Profile tree discovery and job planning.
//!
//! # Error Handling Strategy
//!
//! A tree root that cannot be read is fatal: comparing against a partially
//! listed tree would report bogus differences. Symlinks are never followed and
//! are skipped with a warning, and unreadable entries below the root are
//! fatal for the same reason.

pub mod file_list;
pub mod tree;

pub use file_list::read_file_list;
pub use tree::{Layout, find_profiles, plan_jobs};
