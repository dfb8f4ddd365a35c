use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;

use super::args::{Cli, Commands, CompareArgs, ConvertArgs, TranslateArgs};
use crate::canonical::escape::UNESCAPE_WARNING;
use crate::canonical::{
    ConvertError, ConvertOptions, ConvertOutcome, EscapeMode, OutputTarget, convert_file,
    convert_stream, decode_stream, open_input,
};
use crate::discovery::{Layout, plan_jobs, read_file_list};
use crate::models::PoolReport;
use crate::pipeline::{
    CommandDistiller, CompareOptions, Distiller, ExternalDiff, PassthroughDistiller,
    TranslationMode, compare, emit_report, unless_interrupted,
};
use crate::pool::{PoolError, run_jobs};
use crate::utils::{CancelToken, init_logging};

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 2;

/// Parses the command line, runs the command and maps the outcome to an exit status
pub fn run() -> ExitCode {
    // Invalid invocations exit with status 2 from clap itself
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancelToken::with_signals();
    let result = match &cli.command {
        Commands::Convert(args) => run_convert(args, &cancel),
        Commands::Translate(args) => run_translate(args, &cancel),
        Commands::Compare(args) => run_compare(args, &cancel),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupted(&e) => {
            eprintln!("profile-diff: interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<PoolError>().is_some_and(PoolError::is_interrupted)
            || cause.downcast_ref::<ConvertError>().is_some_and(ConvertError::is_interrupted)
    })
}

fn warn_if_unescaping(options: &ConvertOptions) {
    if options.escape == EscapeMode::Unescape {
        tracing::warn!("{UNESCAPE_WARNING}");
    }
}

fn run_convert(args: &ConvertArgs, cancel: &CancelToken) -> Result<()> {
    let options = args.conversion.to_options();
    warn_if_unescaping(&options);

    let files = if args.file_list {
        let mut files = Vec::new();
        for list in &args.files {
            files.extend(read_file_list(list)?);
        }
        files
    } else {
        args.files.clone()
    };

    let target = match &args.output_dir {
        Some(dir) => OutputTarget::Directory(dir.clone()),
        None => OutputTarget::InPlace,
    };

    let mut failed = 0;
    for file in &files {
        let result = if args.stdout || file == Path::new("-") {
            convert_to_stdout(file, &options, cancel)
        } else {
            convert_file(file, &target, &options, cancel).map(|outcome| {
                if let ConvertOutcome::Converted { output, stats } = outcome {
                    tracing::info!(
                        input = %file.display(),
                        output = %output.display(),
                        values = stats.value_lines,
                        "converted"
                    );
                }
            })
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_interrupted() => return Err(e.into()),
            Err(e) => {
                failed += 1;
                tracing::error!(file = %file.display(), line = e.line(), "{e}");
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed to convert", failed, files.len());
    }
    Ok(())
}

fn convert_to_stdout(
    file: &Path,
    options: &ConvertOptions,
    cancel: &CancelToken,
) -> Result<(), ConvertError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    if file == Path::new("-") {
        let label = Path::new("<stdin>");
        let input =
            decode_stream(io::stdin().lock()).map_err(|e| ConvertError::io("read", label, e))?;
        convert_stream(input, &mut out, options, cancel, label)?;
    } else {
        convert_stream(open_input(file)?, &mut out, options, cancel, file)?;
    }
    out.flush().map_err(|e| ConvertError::io("write", "<stdout>", e))
}

fn run_translate(args: &TranslateArgs, cancel: &CancelToken) -> Result<()> {
    let options = args.conversion.to_options();
    warn_if_unescaping(&options);
    let config = args.pool.to_config();

    let layout = match &args.output_root {
        Some(root) => Layout::under(root),
        None => Layout::InPlace,
    };
    let jobs = plan_jobs(&args.dir1, &args.dir2, &layout)?;

    match run_jobs(&jobs, &options, &config, cancel) {
        Ok(report) => print_translation(&report, args.json),
        Err(PoolError::JobsFailed(report)) => {
            print_translation(&report, args.json)?;
            Err(PoolError::JobsFailed(report).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_translation(report: &PoolReport, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        let text = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        writeln!(stdout, "{text}").context("Failed to write report")?;
    } else {
        writeln!(
            stdout,
            "Translated {} profiles: {} converted, {} up to date, {} failed",
            report.total,
            report.converted,
            report.skipped,
            report.failures.len()
        )
        .context("Failed to write report")?;
    }
    Ok(())
}

fn run_compare(args: &CompareArgs, cancel: &CancelToken) -> Result<()> {
    let convert = args.conversion.to_options();
    if !args.no_translate {
        warn_if_unescaping(&convert);
    }
    let pool = args.pool.to_config();

    let mode = match (&args.output_root, args.in_place) {
        (Some(root), _) => TranslationMode::OutputRoot(root.clone()),
        (None, true) => TranslationMode::InPlace,
        (None, false) => TranslationMode::Scratch,
    };

    let engine = ExternalDiff::new(
        args.diff_style.into(),
        args.diff_command.clone(),
        args.context,
        pool.workers,
    );
    let distiller: Box<dyn Distiller> = match &args.distill_command {
        Some(program) => Box::new(CommandDistiller::new(program)),
        None => Box::new(PassthroughDistiller),
    };

    let opts = CompareOptions {
        left: args.dir1.clone(),
        right: args.dir2.clone(),
        translate: !args.no_translate,
        mode,
        convert,
        pool,
        personality: args.personality.clone(),
        list_personalities: args.list_personalities,
    };

    let outcome = compare(&opts, &engine, distiller.as_ref(), cancel)?;
    let emitted =
        emit_report(&outcome.report.render(), args.colorize.as_deref(), args.output.as_deref());
    unless_interrupted(emitted, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_detected_through_context() {
        let err = anyhow::Error::from(PoolError::Interrupted { finished: 1, total: 4 })
            .context("translating");
        assert!(is_interrupted(&err));

        let err = anyhow::Error::from(ConvertError::Interrupted { file: "a.json".to_string() });
        assert!(is_interrupted(&err));

        assert!(!is_interrupted(&anyhow::anyhow!("diff failed")));
    }

    #[test]
    fn test_colorizer_killed_by_interrupt_is_interrupted() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = unless_interrupted::<()>(
            Err(anyhow::anyhow!("Colorizer `ccze` failed (signal: 2 (SIGINT))")),
            &cancel,
        )
        .unwrap_err();
        assert!(is_interrupted(&err));
    }
}
