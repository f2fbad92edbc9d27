//! Delete command: remove a context record.

use crate::error::Result;
use crate::inventory::Inventory;
use crate::types::ContextType;

use super::CommandEnv;

#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub name: String,
}

impl DeleteOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteReport {
    pub name: String,
    pub context_type: ContextType,
    pub deleted: bool,
}

pub struct DeleteCommand<'a> {
    env: CommandEnv<'a>,
}

impl<'a> DeleteCommand<'a> {
    pub fn new(env: CommandEnv<'a>) -> Self {
        Self { env }
    }

    /// Delete the record. Generated server configuration is left in place.
    pub fn execute(&self, options: &DeleteOptions) -> Result<DeleteReport> {
        let inventory = Inventory::load(self.env.store, self.env.registry, self.env.settings)?;
        let record = inventory.record(&options.name)?;
        let context_type = record.context_type;

        let deleted = match inventory.context(&options.name) {
            Ok(context) => context.delete_config(self.env.store),
            // A record that no longer resolves can still be removed.
            Err(e) if e.is_configuration_error() || e.is_assembly_error() => {
                tracing::warn!(context = %options.name, "Deleting invalid context: {e}");
                self.env.store.delete(context_type, &options.name)?
            }
            Err(e) => return Err(e),
        };

        Ok(DeleteReport {
            name: options.name.clone(),
            context_type,
            deleted,
        })
    }
}
