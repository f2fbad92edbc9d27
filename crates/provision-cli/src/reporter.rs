//! Colored terminal output for pipeline messages.

use std::io::{self, Write};

use console::style;

use provision_core::step::{MessageKind, Reporter};

/// Prints pipeline messages to the terminal, one line each.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    writer: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn new() -> Self {
        Self {
            writer: io::stdout(),
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Create a reporter with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn message(&mut self, kind: MessageKind, text: &str) {
        let line = match kind {
            MessageKind::Section => format!("\n{}", style(format!("==> {text}")).bold().cyan()),
            MessageKind::Start => format!("  {} {}", style("•").dim(), text),
            MessageKind::Success => format!("  {} {}", style("✓").green(), style(text).green()),
            MessageKind::Failure => format!("  {} {}", style("✗").red(), style(text).red().bold()),
            MessageKind::Detail => {
                let mut block = String::new();
                for detail in text.lines() {
                    block.push_str(&format!("      {}\n", style(detail).red()));
                }
                block.trim_end().to_string()
            }
            MessageKind::Info => format!("    {text}"),
            MessageKind::Warning => format!("  {} {}", style("⚠").yellow(), style(text).yellow()),
        };
        // A closed stdout must not abort the run.
        let _ = writeln!(self.writer, "{line}");
    }
}
