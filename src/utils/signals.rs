//! Cooperative cancellation
//!
//! SIGINT and SIGTERM only flip a process-wide flag; conversions poll a
//! [`CancelToken`] at fine granularity and clean up after themselves.

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

static SIGNALLED: AtomicBool = AtomicBool::new(false);
static INSTALL: Once = Once::new();

/// Shared cancellation flag, cheap to clone into every worker
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    signals: bool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also trips when SIGINT or SIGTERM is received
    pub fn with_signals() -> Self {
        install_signal_handlers();
        Self { flag: Arc::new(AtomicBool::new(false)), signals: true }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || (self.signals && SIGNALLED.load(Ordering::Relaxed))
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT and SIGTERM to the cancellation flag (idempotent)
pub fn install_signal_handlers() {
    INSTALL.call_once(|| {
        #[cfg(unix)]
        {
            let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            // SAFETY: the handler only stores to a static atomic, which is
            // async-signal-safe, and is installed once before workers start.
            unsafe {
                libc::signal(libc::SIGINT, handler);
                libc::signal(libc::SIGTERM, handler);
            }
        }
    });
}
