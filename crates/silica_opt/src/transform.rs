//! The trait seams between passes, resynthesis algorithms, and the shell.

use silica_diagnostics::DiagnosticSink;
use silica_subnet::{Subnet, SubnetBuilder, SubnetView};

/// An in-place transformation of a subnet builder.
///
/// Passes are constructed with their collaborators (resynthesizer, cost
/// function, bounds) injected, and report through the sink they are
/// handed; they own no global state.
pub trait SubnetTransformer {
    /// A short name for diagnostics.
    fn name(&self) -> &str;

    /// Transforms the builder in place.
    fn transform(&self, builder: &mut SubnetBuilder, sink: &DiagnosticSink);
}

/// Produces a replacement cone for a window.
///
/// `None` means "no replacement found"; the caller keeps the original
/// logic. The returned subnet has one input per view input (same order)
/// and one output per view output, and every cell respects `max_arity`.
pub trait Resynthesizer {
    /// Synthesizes a replacement for the view's function under its care.
    fn resynthesize(&self, view: &SubnetView, max_arity: u16) -> Option<Subnet>;
}
