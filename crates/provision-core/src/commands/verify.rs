//! Verify command: build and run the full pipeline for one context.

use crate::context::assemble_verify;
use crate::error::Result;
use crate::inventory::Inventory;
use crate::step::{PipelineReport, Reporter};
use crate::types::ContextType;

use super::CommandEnv;

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Name of the context to verify
    pub name: String,
}

impl VerifyOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of a successful verify or install run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub name: String,
    pub context_type: ContextType,
    /// Whether resolved defaults were written back before running
    pub saved: bool,
    pub report: PipelineReport,
}

pub struct VerifyCommand<'a> {
    env: CommandEnv<'a>,
}

impl<'a> VerifyCommand<'a> {
    pub fn new(env: CommandEnv<'a>) -> Self {
        Self { env }
    }

    /// Verify a context.
    ///
    /// Configuration and assembly problems are returned before any step
    /// runs. A failing step ends the run with `VerificationFailed`.
    pub fn execute(
        &self,
        options: &VerifyOptions,
        reporter: &mut dyn Reporter,
    ) -> Result<PipelineOutcome> {
        let inventory = Inventory::load(self.env.store, self.env.registry, self.env.settings)?;
        let mut context = inventory.context(&options.name)?;

        inventory.inherit_platform(&mut context)?;
        let attachments = inventory.bind_services(&context)?;
        let pipeline = assemble_verify(&context, &attachments, self.env.registry)?;

        // Generated values are only written once the pipeline is known to run.
        let saved = context.is_dirty() && context.save(self.env.store);
        if context.is_dirty() {
            reporter.warning(&format!(
                "Unable to save generated values for '{}'.",
                context.name()
            ));
        }

        reporter.section(&format!(
            "Verifying {} '{}'",
            context.context_type().label(),
            context.name()
        ));
        let report = self.env.run(context.name(), pipeline, reporter)?;
        reporter.success("Verification Complete!");

        Ok(PipelineOutcome {
            name: context.name().to_string(),
            context_type: context.context_type(),
            saved,
            report,
        })
    }
}
