use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Completed-job counter shared by all workers
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Single updating progress line on stderr
#[derive(Debug)]
pub struct Progress {
    total: usize,
    enabled: bool,
    last: Option<usize>,
}

impl Progress {
    /// Progress display, active only when requested and stderr is a terminal
    pub fn new(total: usize, requested: bool) -> Self {
        Self { total, enabled: requested && io::stderr().is_terminal(), last: None }
    }

    pub fn update(&mut self, done: usize) {
        if !self.enabled || self.last == Some(done) {
            return;
        }
        self.last = Some(done);
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{}", render(done, self.total));
        let _ = stderr.flush();
    }

    pub fn finish(&mut self) {
        if self.enabled && self.last.is_some() {
            let _ = writeln!(io::stderr().lock());
        }
        self.last = None;
    }
}

fn render(done: usize, total: usize) -> String {
    let percent = if total == 0 { 100 } else { done * 100 / total };
    format!("Translating profiles: {done}/{total} ({percent}%)")
}
