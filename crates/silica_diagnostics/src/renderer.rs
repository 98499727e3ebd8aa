//! Terminal rendering of the diagnostic stream.

use crate::diagnostic::Event;
use std::io::Write;

/// Renders accumulated events as indented plain text.
///
/// Each open group indents its contents by two spaces. Returns any I/O
/// error from the writer unchanged.
pub fn render(events: &[Event], out: &mut impl Write) -> std::io::Result<()> {
    let mut depth: usize = 0;
    for event in events {
        match event {
            Event::BeginGroup(name) => {
                writeln!(out, "{}{name}:", "  ".repeat(depth))?;
                depth += 1;
            }
            Event::EndGroup => {
                depth = depth.saturating_sub(1);
            }
            Event::Message(d) => {
                write!(out, "{}{}: {}", "  ".repeat(depth), d.severity, d.message)?;
                if let Some(entry) = d.entry {
                    write!(out, " (entry #{entry})")?;
                }
                writeln!(out)?;
                for note in &d.notes {
                    writeln!(out, "{}  note: {note}", "  ".repeat(depth))?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::sink::DiagnosticSink;

    fn render_to_string(events: &[Event]) -> String {
        let mut buf = Vec::new();
        render(events, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn plain_message() {
        let sink = DiagnosticSink::new();
        sink.warning("no area for cell FOO");
        let text = render_to_string(&sink.take_events());
        assert_eq!(text, "warning: no area for cell FOO\n");
    }

    #[test]
    fn groups_indent() {
        let sink = DiagnosticSink::new();
        sink.group("mapping", |s| s.error("no match"));
        let text = render_to_string(&sink.take_events());
        assert!(text.contains("mapping:\n"));
        assert!(text.contains("  error: no match"));
    }

    #[test]
    fn entry_and_notes() {
        let sink = DiagnosticSink::new();
        sink.emit(
            Diagnostic::error("incomplete mapping")
                .with_entry(42)
                .with_note("try a larger cut size"),
        );
        let text = render_to_string(&sink.take_events());
        assert!(text.contains("(entry #42)"));
        assert!(text.contains("note: try a larger cut size"));
    }

    #[test]
    fn unbalanced_end_group_is_tolerated() {
        let sink = DiagnosticSink::new();
        sink.end_group();
        sink.note("still fine");
        let text = render_to_string(&sink.take_events());
        assert!(text.contains("note: still fine"));
    }
}
