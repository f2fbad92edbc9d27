//! List command: every saved context.

use std::path::PathBuf;

use crate::error::Result;
use crate::inventory::Inventory;
use crate::types::ContextType;

use super::CommandEnv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub context_type: ContextType,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ListReport {
    pub entries: Vec<ListEntry>,
}

impl ListReport {
    pub fn of_type(&self, context_type: ContextType) -> impl Iterator<Item = &ListEntry> {
        self.entries
            .iter()
            .filter(move |e| e.context_type == context_type)
    }
}

pub struct ListCommand<'a> {
    env: CommandEnv<'a>,
}

impl<'a> ListCommand<'a> {
    pub fn new(env: CommandEnv<'a>) -> Self {
        Self { env }
    }

    pub fn execute(&self) -> Result<ListReport> {
        let inventory = Inventory::load(self.env.store, self.env.registry, self.env.settings)?;
        let entries = inventory
            .entries()
            .iter()
            .map(|(context_type, name)| ListEntry {
                name: name.clone(),
                context_type: *context_type,
                file: self.env.store.location(*context_type, name),
            })
            .collect();
        Ok(ListReport { entries })
    }
}
