//! Parallel translation of profile trees.
//!
//! # Error Handling Strategy
//!
//! - **Job-level failures** are logged as they happen and collected in job
//!   order; other jobs keep running. Any failure makes the run fail with
//!   [`PoolError::JobsFailed`] once every job has been accounted for.
//! - **Interruption** stops workers from starting new jobs; in-flight
//!   conversions notice the cancel flag and delete their partial output. The
//!   coordinating thread waits a short grace period for that cleanup, then
//!   returns [`PoolError::Interrupted`] whether or not every worker has
//!   finished.
//! - **Worker panics** are logged by the pool's panic handler; the jobs that
//!   never reported back are recorded as failures.

pub mod chunk;
pub mod error;
pub mod external;
pub mod progress;
mod worker;

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

pub use chunk::chunk_ranges;
pub use error::{JobError, PoolError};
pub use external::ExternalConverter;
use progress::{Counter, Progress};
use worker::{JobOutcome, run_job};

use crate::canonical::{ConvertOptions, EscapeMode};
use crate::models::{ConversionJob, DocumentFormat, JobFailure, PoolReport};
use crate::utils::{CancelToken, default_workers};

/// How often the coordinating thread refreshes progress
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// How long to wait for workers to clean up after an interrupt
const DEFAULT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub progress: bool,
    pub xml_converter: Option<ExternalConverter>,
    pub grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: default_workers(), progress: true, xml_converter: None, grace: DEFAULT_GRACE }
    }
}

/// Converts every job, spreading contiguous chunks over a worker pool.
///
/// Output content never depends on the worker count or on completion order;
/// failures are reported in job order.
///
/// # Errors
///
/// Returns [`PoolError::Interrupted`] on cancellation, [`PoolError::JobsFailed`]
/// if any job failed and [`PoolError::ThreadPool`] if the pool cannot start.
pub fn run_jobs(
    jobs: &[ConversionJob],
    options: &ConvertOptions,
    config: &PoolConfig,
    cancel: &CancelToken,
) -> Result<PoolReport, PoolError> {
    let started = Instant::now();
    let total = jobs.len();
    let mut report = PoolReport { total, ..PoolReport::default() };
    if total == 0 {
        return Ok(report);
    }

    if options.escape == EscapeMode::Escape
        && config.xml_converter.is_some()
        && jobs.iter().any(|j| j.format == DocumentFormat::Xml)
    {
        tracing::warn!("the XML converter cannot escape path components, XML paths stay unescaped");
    }

    let ranges = chunk_ranges(total, config.workers);
    report.workers = config.workers.clamp(1, total);
    report.chunks = ranges.len();
    tracing::info!(jobs = total, workers = report.workers, "translating profiles");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(report.workers)
        .thread_name(|i| format!("translate-{i}"))
        .panic_handler(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("translation worker panicked: {message}");
        })
        .build()?;

    let shared_jobs: Arc<[ConversionJob]> = Arc::from(jobs);
    let shared_options = Arc::new(options.clone());
    let counter = Counter::default();
    let (tx, rx) = mpsc::channel::<(usize, JobOutcome)>();

    for range in ranges {
        let jobs = Arc::clone(&shared_jobs);
        let options = Arc::clone(&shared_options);
        let converter = config.xml_converter.clone();
        let counter = counter.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();
        pool.spawn(move || {
            for index in range {
                let outcome = run_job(&jobs[index], &options, converter.as_ref(), &cancel);
                counter.increment();
                if tx.send((index, outcome)).is_err() {
                    return;
                }
            }
        });
    }
    drop(tx);

    let mut outcomes: Vec<Option<JobOutcome>> = (0..total).map(|_| None).collect();
    let mut received = 0;
    let mut progress = Progress::new(total, config.progress);
    let mut interrupted_at: Option<Instant> = None;
    while received < total {
        match rx.recv_timeout(PROGRESS_INTERVAL) {
            Ok((index, outcome)) => {
                outcomes[index] = Some(outcome);
                received += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        progress.update(counter.get());
        if cancel.is_cancelled() {
            let since = *interrupted_at.get_or_insert_with(Instant::now);
            if since.elapsed() >= config.grace {
                break;
            }
        }
    }
    progress.finish();

    if cancel.is_cancelled() {
        tracing::warn!(finished = counter.get(), total, "translation interrupted");
        return Err(PoolError::Interrupted { finished: counter.get(), total });
    }

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(JobOutcome::Converted) => report.converted += 1,
            Some(JobOutcome::Skipped) => report.skipped += 1,
            Some(JobOutcome::Failed(failure)) => report.failures.push(failure),
            Some(JobOutcome::Cancelled) | None => {
                let job = &jobs[index];
                report.failures.push(JobFailure::new(
                    job.side,
                    job.input.clone(),
                    "worker stopped before finishing this file",
                ));
            }
        }
    }
    report.elapsed_ms = started.elapsed().as_millis();

    tracing::info!(
        converted = report.converted,
        skipped = report.skipped,
        failed = report.failures.len(),
        elapsed_ms = report.elapsed_ms as u64,
        "translation finished"
    );

    if report.succeeded() { Ok(report) } else { Err(PoolError::JobsFailed(Box::new(report))) }
}
