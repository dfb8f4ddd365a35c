use std::env;
use std::thread;

/// Environment variable overriding the default worker count
pub const WORKERS_ENV: &str = "PROFILE_DIFF_WORKERS";

/// Default number of conversion workers: `PROFILE_DIFF_WORKERS` if set to a
/// positive number, otherwise the number of available CPU cores
pub fn default_workers() -> usize {
    workers_from(env::var(WORKERS_ENV).ok().as_deref())
}

fn workers_from(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
}
