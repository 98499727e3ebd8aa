//! Diagnostic accumulator shared by all passes of a run.

use crate::diagnostic::{Diagnostic, Event};
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// An accumulator for diagnostics emitted during synthesis.
///
/// The sink is the only I/O interaction during synthesis; passes receive a
/// `&DiagnosticSink` and emit into it. The error count is tracked
/// atomically so `has_errors` never locks the event stream.
pub struct DiagnosticSink {
    events: Mutex<Vec<Event>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Emits a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.events.lock().unwrap().push(Event::Message(diag));
    }

    /// Emits a note.
    pub fn note(&self, message: impl Into<String>) {
        self.emit(Diagnostic::note(message));
    }

    /// Emits a warning.
    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Diagnostic::warning(message));
    }

    /// Emits an error.
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Diagnostic::error(message));
    }

    /// Opens a named diagnostic group. Groups may nest.
    pub fn begin_group(&self, name: impl Into<String>) {
        self.events.lock().unwrap().push(Event::BeginGroup(name.into()));
    }

    /// Closes the innermost open group.
    pub fn end_group(&self) {
        self.events.lock().unwrap().push(Event::EndGroup);
    }

    /// Runs `f` inside a named group, closing it even on early return.
    pub fn group<R>(&self, name: impl Into<String>, f: impl FnOnce(&Self) -> R) -> R {
        self.begin_group(name);
        let result = f(self);
        self.end_group();
        result
    }

    /// Returns `true` if any error diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated events, leaving the sink empty.
    ///
    /// The error count is not reset; it reflects the whole run.
    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Returns a snapshot of the message diagnostics (group markers
    /// filtered out), without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Message(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.take_events().is_empty());
    }

    #[test]
    fn error_counting() {
        let sink = DiagnosticSink::new();
        sink.warning("w");
        assert!(!sink.has_errors());
        sink.error("e1");
        sink.error("e2");
        assert_eq!(sink.error_count(), 2);
    }

    #[test]
    fn group_brackets_events() {
        let sink = DiagnosticSink::new();
        sink.group("loading library", |s| {
            s.warning("cell X skipped");
        });
        let events = sink.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::BeginGroup(_)));
        assert!(matches!(events[1], Event::Message(_)));
        assert!(matches!(events[2], Event::EndGroup));
    }

    #[test]
    fn diagnostics_filters_markers() {
        let sink = DiagnosticSink::new();
        sink.begin_group("g");
        sink.note("n");
        sink.end_group();
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn take_events_drains_but_keeps_count() {
        let sink = DiagnosticSink::new();
        sink.error("e");
        let _ = sink.take_events();
        assert!(sink.take_events().is_empty());
        assert_eq!(sink.error_count(), 1);
    }
}
