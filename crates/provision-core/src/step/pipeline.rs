//! Ordered, title-keyed step pipelines with fail-fast execution.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::{Step, StepEnv};
use crate::error::StepError;
use crate::types::Phase;

/// Steps keyed by title, in insertion order.
///
/// Adding a step whose title is already present keeps the original position
/// and replaces the step with the newer one.
#[derive(Debug, Default)]
pub struct StepPipeline {
    steps: IndexMap<String, Step>,
}

impl StepPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step, returning the step it replaced, if any.
    pub fn add(&mut self, step: Step) -> Option<Step> {
        match self.steps.entry(step.title().to_string()) {
            Entry::Occupied(mut entry) => {
                tracing::warn!(
                    title = entry.key().as_str(),
                    "Step title already present; the later step replaces the earlier one"
                );
                Some(entry.insert(step))
            }
            Entry::Vacant(entry) => {
                entry.insert(step);
                None
            }
        }
    }

    /// Add every step in order, tagging each with `phase`.
    pub fn extend_phase(&mut self, phase: Phase, steps: impl IntoIterator<Item = Step>) {
        for step in steps {
            self.add(step.in_phase(phase));
        }
    }

    /// Append another pipeline, following the same collision rule as `add`.
    pub fn append(&mut self, other: StepPipeline) {
        for (_, step) in other.steps {
            self.add(step);
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.steps.contains_key(title)
    }

    pub fn get(&self, title: &str) -> Option<&Step> {
        self.steps.get(title)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// Step errors never escape: they are reported through `env.reporter` and
    /// recorded in the returned report. Steps after a failure are not run.
    pub fn run(self, env: &mut StepEnv<'_>) -> PipelineReport {
        let mut report = PipelineReport::default();

        for (title, step) in self.steps {
            if report.failure.is_some() {
                report.records.push(StepRecord {
                    title,
                    phase: step.phase(),
                    status: StepStatus::Skipped,
                    duration: Duration::ZERO,
                });
                continue;
            }

            let phase = step.phase();
            let success = step.success_message().map(str::to_string);
            let failure = step.failure_message().map(str::to_string);
            if let Some(message) = step.start_message() {
                env.reporter.start(message);
            }

            tracing::debug!(step = title.as_str(), %phase, "Running step");
            let started = Instant::now();
            let result = match step.run_body(env) {
                Ok(0) => Ok(()),
                Ok(status) => Err(StepError::Status(status)),
                Err(err) => Err(err),
            };
            let duration = started.elapsed();

            match result {
                Ok(()) => {
                    if let Some(message) = success {
                        env.reporter.success(&message);
                    }
                    report.records.push(StepRecord {
                        title,
                        phase,
                        status: StepStatus::Succeeded,
                        duration,
                    });
                }
                Err(err) => {
                    tracing::debug!(step = title.as_str(), error = %err, "Step failed");
                    if let Some(message) = failure {
                        env.reporter.failure(&message);
                    }
                    env.reporter
                        .message(super::MessageKind::Detail, &err.to_string());
                    report.records.push(StepRecord {
                        title: title.clone(),
                        phase,
                        status: StepStatus::Failed(err.to_string()),
                        duration,
                    });
                    report.failure = Some(StepFailure {
                        title,
                        phase,
                        error: err,
                    });
                }
            }
        }

        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed(String),
    /// Not run because an earlier step failed.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub title: String,
    pub phase: Phase,
    pub status: StepStatus,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct StepFailure {
    pub title: String,
    pub phase: Phase,
    pub error: StepError,
}

/// Outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    records: Vec<StepRecord>,
    failure: Option<StepFailure>,
}

impl PipelineReport {
    pub fn successful(&self) -> bool {
        self.failure.is_none()
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        self.failure.as_ref()
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.title.as_str())
    }

    /// Titles of steps whose bodies ran, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.status != StepStatus::Skipped)
            .map(|r| r.title.as_str())
            .collect()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.status == StepStatus::Skipped)
            .map(|r| r.title.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::process::ShellRunner;
    use crate::render::BuiltinTemplates;
    use crate::step::{MessageKind, Reporter};

    #[derive(Default)]
    struct Collect(Vec<(MessageKind, String)>);

    impl Reporter for Collect {
        fn message(&mut self, kind: MessageKind, text: &str) {
            self.0.push((kind, text.to_string()));
        }
    }

    fn run(pipeline: StepPipeline, reporter: &mut Collect) -> PipelineReport {
        let runner = ShellRunner::default();
        let renderer = BuiltinTemplates::new();
        let mut env = StepEnv::new(&runner, &renderer, reporter);
        pipeline.run(&mut env)
    }

    #[test]
    fn stops_at_first_failure() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = StepPipeline::new();
        for (i, status) in [0, 1, 0, 0, 0].into_iter().enumerate() {
            let calls = Rc::clone(&calls);
            pipeline.add(Step::new(format!("step{i}")).execute(move |_| {
                calls.borrow_mut().push(i);
                Ok(status)
            }));
        }

        let mut reporter = Collect::default();
        let report = run(pipeline, &mut reporter);

        assert!(!report.successful());
        assert_eq!(*calls.borrow(), vec![0, 1]);
        assert_eq!(report.failed_step(), Some("step1"));
        assert_eq!(report.skipped(), vec!["step2", "step3", "step4"]);
    }

    #[test]
    fn duplicate_title_keeps_position_and_later_content() {
        let mut pipeline = StepPipeline::new();
        pipeline.add(Step::new("a").start("first a"));
        pipeline.add(Step::new("b"));
        let replaced = pipeline.add(Step::new("a").start("second a"));

        assert!(replaced.is_some());
        assert_eq!(pipeline.titles().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(pipeline.get("a").unwrap().start_message(), Some("second a"));
    }

    #[test]
    fn reports_messages_for_success_and_failure() {
        let mut pipeline = StepPipeline::new();
        pipeline.add(
            Step::new("ok")
                .start("Starting")
                .success("Done")
                .failure("Broken"),
        );
        pipeline.add(
            Step::new("bad")
                .failure("Could not do it")
                .execute(|_| Err(anyhow::anyhow!("disk full").into())),
        );

        let mut reporter = Collect::default();
        let report = run(pipeline, &mut reporter);

        assert!(!report.successful());
        let kinds: Vec<_> = reporter.0.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::Start,
                MessageKind::Success,
                MessageKind::Failure,
                MessageKind::Detail
            ]
        );
        assert_eq!(reporter.0[3].1, "disk full");
    }

    #[test]
    fn empty_pipeline_is_successful() {
        let mut reporter = Collect::default();
        let report = run(StepPipeline::new(), &mut reporter);
        assert!(report.successful());
        assert!(report.records().is_empty());
    }
}
