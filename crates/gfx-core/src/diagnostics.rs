//! Capture of non-fatal diagnostics.
//!
//! Reflection, layout construction and binding report recoverable problems
//! as `tracing` warnings and errors rather than failing. A
//! [`DiagnosticRecorder`] is a subscriber layer that keeps those events so a
//! caller can inspect them after the fact.
//!
//! ```rust,ignore
//! let (result, diags) = DiagnosticRecorder::capture(|| build_pipeline());
//! assert!(diags.warnings().is_empty());
//! ```

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One recorded warning or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Subscriber layer collecting WARN and ERROR events.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticRecorder {
    records: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with a scoped subscriber that records into a fresh recorder.
    pub fn capture<R>(f: impl FnOnce() -> R) -> (R, DiagnosticRecorder) {
        let recorder = DiagnosticRecorder::new();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, recorder)
    }

    /// Snapshot of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(Level::WARN)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(Level::ERROR)
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.level == level)
            .map(|d| d.message.clone())
            .collect()
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // More verbose levels compare greater.
        if *metadata.level() > Level::WARN {
            return;
        }

        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message,
            });
    }
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod diagnostics_tests;
