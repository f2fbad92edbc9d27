//! Steps: named, messaged units of work.
//!
//! A step carries optional start/success/failure messages and a body. The
//! body runs later, when its pipeline executes, and receives a `StepEnv`
//! with the collaborators it may use. Building a step never does any work.

pub mod pipeline;
pub mod reporter;

use std::fmt;

use crate::error::StepError;
use crate::process::ProcessRunner;
use crate::render::TemplateRenderer;
use crate::types::Phase;

pub use pipeline::{PipelineReport, StepPipeline, StepRecord, StepStatus};
pub use reporter::{MessageKind, Reporter, TracingReporter};

/// Body of a step: returns an exit status, `0` meaning success.
pub type StepBody = Box<dyn FnOnce(&mut StepEnv<'_>) -> Result<i32, StepError>>;

/// Collaborators available to a running step.
pub struct StepEnv<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub renderer: &'a dyn TemplateRenderer,
    pub reporter: &'a mut dyn Reporter,
}

impl<'a> StepEnv<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        renderer: &'a dyn TemplateRenderer,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            runner,
            renderer,
            reporter,
        }
    }
}

pub struct Step {
    title: String,
    phase: Phase,
    start: Option<String>,
    success: Option<String>,
    failure: Option<String>,
    body: Option<StepBody>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("title", &self.title)
            .field("phase", &self.phase)
            .field("start", &self.start)
            .field("success", &self.success)
            .field("failure", &self.failure)
            .field("body", &self.body.is_some())
            .finish()
    }
}

impl Step {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            phase: Phase::Verify,
            start: None,
            success: None,
            failure: None,
            body: None,
        }
    }

    /// A step that only announces the start of a new section of output.
    pub fn section(title: impl Into<String>, heading: impl Into<String>) -> Self {
        let heading = heading.into();
        Self::new(title).execute(move |env| {
            env.reporter.section(&heading);
            Ok(0)
        })
    }

    pub fn start(mut self, message: impl Into<String>) -> Self {
        self.start = Some(message.into());
        self
    }

    pub fn success(mut self, message: impl Into<String>) -> Self {
        self.success = Some(message.into());
        self
    }

    pub fn failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn execute<F>(mut self, body: F) -> Self
    where
        F: FnOnce(&mut StepEnv<'_>) -> Result<i32, StepError> + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }

    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_message(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success.as_deref()
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Consume the step and run its body. A step without a body succeeds.
    pub(crate) fn run_body(self, env: &mut StepEnv<'_>) -> Result<i32, StepError> {
        match self.body {
            Some(body) => body(env),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ShellRunner;
    use crate::render::BuiltinTemplates;

    #[test]
    fn missing_body_is_a_successful_noop() {
        let runner = ShellRunner::default();
        let renderer = BuiltinTemplates::new();
        let mut reporter = TracingReporter;
        let mut env = StepEnv::new(&runner, &renderer, &mut reporter);

        let step = Step::new("noop").start("Nothing to do...");
        assert_eq!(step.run_body(&mut env).unwrap(), 0);
    }

    #[test]
    fn builder_sets_messages() {
        let step = Step::new("db_connect")
            .start("Checking connection...")
            .success("Connected.")
            .failure("Unable to connect.")
            .in_phase(Phase::PreVerify);
        assert_eq!(step.title(), "db_connect");
        assert_eq!(step.phase(), Phase::PreVerify);
        assert_eq!(step.start_message(), Some("Checking connection..."));
        assert_eq!(step.success_message(), Some("Connected."));
        assert_eq!(step.failure_message(), Some("Unable to connect."));
    }
}
