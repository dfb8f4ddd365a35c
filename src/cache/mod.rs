//! Conversion cache policy
//!
//! Decides from filesystem metadata alone whether a canonical output is still
//! current for its input. Repeated runs over mostly unchanged trees only
//! convert the documents that changed since the last run.

pub mod policy;

pub use policy::{CacheDecision, FileStamp, StaleReason, check_output};
