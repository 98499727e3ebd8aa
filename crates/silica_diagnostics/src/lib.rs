//! Diagnostics for the Silica synthesis pipeline.
//!
//! Passes report through a [`DiagnosticSink`] handed to them explicitly;
//! there is no process-global logger. A sink accumulates [`Diagnostic`]s
//! with a severity and optional nested grouping, and a renderer turns the
//! accumulated stream into terminal output at the end of a run.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use diagnostic::Diagnostic;
pub use renderer::render;
pub use severity::Severity;
pub use sink::DiagnosticSink;
