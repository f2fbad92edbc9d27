//! Install command: verify a site, then install it.

use crate::context::assemble_install;
use crate::error::Result;
use crate::inventory::Inventory;
use crate::step::Reporter;
use crate::types::ContextType;

use super::{CommandEnv, PipelineOutcome};

#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Name of the site to install
    pub name: String,
    /// Run only the install step
    pub skip_verify: bool,
}

impl InstallOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip_verify: false,
        }
    }

    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }
}

pub struct InstallCommand<'a> {
    env: CommandEnv<'a>,
}

impl<'a> InstallCommand<'a> {
    pub fn new(env: CommandEnv<'a>) -> Self {
        Self { env }
    }

    pub fn execute(
        &self,
        options: &InstallOptions,
        reporter: &mut dyn Reporter,
    ) -> Result<PipelineOutcome> {
        let inventory = Inventory::load(self.env.store, self.env.registry, self.env.settings)?;
        let mut context = inventory.context_of_type(&options.name, ContextType::Site)?;

        inventory.inherit_platform(&mut context)?;
        let attachments = inventory.bind_services(&context)?;
        let pipeline = assemble_install(
            &context,
            &attachments,
            self.env.registry,
            options.skip_verify,
        )?;
        let saved = context.is_dirty() && context.save(self.env.store);

        reporter.section(&format!("Installing site '{}'", context.name()));
        let report = self.env.run(context.name(), pipeline, reporter)?;
        reporter.success("Installation Complete!");

        Ok(PipelineOutcome {
            name: context.name().to_string(),
            context_type: ContextType::Site,
            saved,
            report,
        })
    }
}
