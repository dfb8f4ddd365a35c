use super::error::JobError;
use super::external::ExternalConverter;
use crate::canonical::{ConvertOptions, ConvertOutcome, convert_file};
use crate::models::{ConversionJob, DocumentFormat, JobFailure};
use crate::utils::CancelToken;

/// What happened to one job
#[derive(Debug)]
pub(crate) enum JobOutcome {
    Converted,
    Skipped,
    Failed(JobFailure),
    /// Not started, or stopped, because cancellation was requested
    Cancelled,
}

pub(crate) fn run_job(
    job: &ConversionJob,
    options: &ConvertOptions,
    converter: Option<&ExternalConverter>,
    cancel: &CancelToken,
) -> JobOutcome {
    if cancel.is_cancelled() {
        return JobOutcome::Cancelled;
    }

    let result = match (job.format, converter) {
        (DocumentFormat::Json, _) => {
            convert_file(&job.input, &job.target, options, cancel).map_err(JobError::from)
        }
        (DocumentFormat::Xml, Some(converter)) => {
            converter.convert(&job.input, &job.target, options, cancel)
        }
        (DocumentFormat::Xml, None) => Err(JobError::NoXmlConverter(job.input.clone())),
    };

    match result {
        Ok(ConvertOutcome::Converted { .. }) => JobOutcome::Converted,
        Ok(ConvertOutcome::Skipped { .. }) => JobOutcome::Skipped,
        Err(e) if e.is_interrupted() => JobOutcome::Cancelled,
        Err(e) => {
            let failure = failure_for(job, e);
            tracing::error!(
                file = %failure.input.display(),
                line = failure.line,
                "{}",
                failure.message
            );
            JobOutcome::Failed(failure)
        }
    }
}

fn failure_for(job: &ConversionJob, error: JobError) -> JobFailure {
    let mut failure = JobFailure::new(job.side, job.input.clone(), error.to_string());
    match error {
        JobError::Convert(e) => failure.line = e.line(),
        JobError::Subprocess { command, exit_code, stderr } => {
            failure.command = Some(command);
            failure.exit_code = exit_code;
            failure.output = stderr;
        }
        JobError::Spawn { command, .. } => {
            failure.command = Some(command);
        }
        JobError::NoXmlConverter(_) => {}
    }
    failure
}
