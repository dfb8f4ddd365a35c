//! Data models shared by the orchestration layers.
//!
//! - [`ConversionJob`] - one input document and where its canonical text goes
//! - [`JobFailure`] / [`PoolReport`] - outcome of a translation run
//! - [`DiffReport`] - distilled differences with summary data

pub mod job;
pub mod report;

pub use job::{ConversionJob, DocumentFormat, TreeSide};
pub use report::{DiffReport, JobFailure, PoolReport};
