//! Operator-facing messages emitted while a pipeline runs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Start,
    Success,
    Failure,
    /// Error detail recorded for a failed step.
    Detail,
    Info,
    Warning,
    Section,
}

/// Receives messages for the operator. Frontends decide how to show them.
pub trait Reporter {
    fn message(&mut self, kind: MessageKind, text: &str);

    fn start(&mut self, text: &str) {
        self.message(MessageKind::Start, text);
    }

    fn success(&mut self, text: &str) {
        self.message(MessageKind::Success, text);
    }

    fn failure(&mut self, text: &str) {
        self.message(MessageKind::Failure, text);
    }

    fn info(&mut self, text: &str) {
        self.message(MessageKind::Info, text);
    }

    fn warning(&mut self, text: &str) {
        self.message(MessageKind::Warning, text);
    }

    fn section(&mut self, text: &str) {
        self.message(MessageKind::Section, text);
    }
}

/// Forwards every message to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn message(&mut self, kind: MessageKind, text: &str) {
        match kind {
            MessageKind::Failure | MessageKind::Detail => tracing::error!("{text}"),
            MessageKind::Warning => tracing::warn!("{text}"),
            MessageKind::Section => tracing::info!("== {text} =="),
            MessageKind::Start | MessageKind::Success | MessageKind::Info => {
                tracing::info!("{text}")
            }
        }
    }
}
