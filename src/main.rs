use std::process::ExitCode;

fn main() -> ExitCode {
    profile_diff::cli::run()
}
