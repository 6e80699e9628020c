//! Process-wide logging bootstrap.
//!
//! Library code only emits `tracing` events; an application (or a test that
//! wants console output) calls [`init`] once to install a formatter. The
//! filter is read from `RUST_LOG` and defaults to `info`.

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::diagnostics::DiagnosticRecorder;

static INIT: OnceCell<()> = OnceCell::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global fmt subscriber. Subsequent calls are no-ops.
pub fn init() {
    INIT.get_or_init(|| {
        if let Err(e) = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(true)
            .try_init()
        {
            eprintln!("logging already initialized: {e}");
        }
    });
}

/// Install the global fmt subscriber together with a [`DiagnosticRecorder`]
/// so warnings and errors are also collected for later inspection.
///
/// Returns `false` if logging was already initialized, in which case the
/// recorder is not attached.
pub fn init_with_recorder(recorder: &DiagnosticRecorder) -> bool {
    let mut installed = false;
    INIT.get_or_init(|| {
        installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(recorder.clone())
            .try_init()
            .is_ok();
    });
    installed
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;
