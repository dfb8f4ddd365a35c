use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::command::{command, run_captured};

/// Writes the report to `output` (stdout when `None`), optionally through a colorizing filter
pub fn emit_report(text: &str, colorize: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let colored;
    let bytes = match colorize {
        Some(program) => {
            let filter = command(program, std::iter::empty::<&str>());
            let captured = run_captured(filter, Some(text.as_bytes()))?;
            if !captured.status.success() {
                bail!(
                    "Colorizer `{}` failed ({}): {}",
                    program.display(),
                    captured.status,
                    captured.stderr.trim()
                );
            }
            colored = captured.stdout;
            &colored[..]
        }
        None => text.as_bytes(),
    };

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create report file: {}", path.display()))?;
            file.write_all(bytes)
                .with_context(|| format!("Failed to write report file: {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            match stdout.write_all(bytes).and_then(|()| stdout.flush()) {
                Ok(()) => {}
                // Reader went away (e.g. `| head`), nothing left to report to
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e).context("Failed to write report"),
            }
        }
    }
    Ok(())
}
