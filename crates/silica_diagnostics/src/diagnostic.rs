//! Structured diagnostic messages.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// One event in the diagnostic stream.
///
/// Besides plain messages, the stream carries group markers so related
/// diagnostics (e.g. all cells skipped while loading one library) render
/// as an indented block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    /// A diagnostic message.
    Message(Diagnostic),
    /// Opens a named group; subsequent events nest under it.
    BeginGroup(String),
    /// Closes the innermost open group.
    EndGroup,
}

/// A diagnostic message with severity and optional context notes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level.
    pub severity: Severity,
    /// The main message.
    pub message: String,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// The subnet entry the diagnostic refers to, if any.
    pub entry: Option<u32>,
}

impl Diagnostic {
    /// Creates a note diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            notes: Vec::new(),
            entry: None,
        }
    }

    /// Adds a footnote.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attaches the offending subnet entry index.
    pub fn with_entry(mut self, entry: u32) -> Self {
        self.entry = Some(entry);
        self
    }
}
