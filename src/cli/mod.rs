//! Command line interface: `convert`, `translate` and `compare`.
//!
//! Exit status: 0 on success, 1 when a file, the diff or a filter failed,
//! 2 when interrupted or invoked with invalid arguments.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::run;
