//! High-level commands for provision operations.
//!
//! These are the public API the CLI calls. Each command takes the shared
//! collaborators as a [`CommandEnv`] and returns a report.

pub mod delete;
pub mod install;
pub mod list;
pub mod save;
pub mod services;
pub mod verify;

use crate::config::{ContextStore, Settings};
use crate::error::{ProvisionError, Result};
use crate::process::ProcessRunner;
use crate::render::TemplateRenderer;
use crate::service::ServiceRegistry;
use crate::step::{PipelineReport, Reporter, StepEnv, StepPipeline};

pub use delete::{DeleteCommand, DeleteOptions, DeleteReport};
pub use install::{InstallCommand, InstallOptions};
pub use list::{ListCommand, ListEntry, ListReport};
pub use save::{SaveCommand, SaveOptions, SaveReport, ServiceOption, SubscriptionOption};
pub use services::{
    AttachedService, AvailableService, ServicesCommand, ServicesOptions, ServicesReport,
};
pub use verify::{PipelineOutcome, VerifyCommand, VerifyOptions};

/// Collaborators shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct CommandEnv<'a> {
    pub store: &'a dyn ContextStore,
    pub registry: &'a ServiceRegistry,
    pub settings: &'a Settings,
    pub runner: &'a dyn ProcessRunner,
    pub renderer: &'a dyn TemplateRenderer,
}

impl<'a> CommandEnv<'a> {
    pub fn new(
        store: &'a dyn ContextStore,
        registry: &'a ServiceRegistry,
        settings: &'a Settings,
        runner: &'a dyn ProcessRunner,
        renderer: &'a dyn TemplateRenderer,
    ) -> Self {
        Self {
            store,
            registry,
            settings,
            runner,
            renderer,
        }
    }

    /// Run a pipeline and turn a failed run into `VerificationFailed`.
    pub(crate) fn run(
        &self,
        context: &str,
        pipeline: StepPipeline,
        reporter: &mut dyn Reporter,
    ) -> Result<PipelineReport> {
        let report = pipeline.run(&mut StepEnv::new(self.runner, self.renderer, reporter));
        match report.failure() {
            Some(failure) => Err(ProvisionError::VerificationFailed {
                context: context.to_string(),
                phase: failure.phase,
                step: failure.title.clone(),
            }),
            None => Ok(report),
        }
    }
}
