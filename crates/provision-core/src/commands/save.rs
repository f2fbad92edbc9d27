//! Save command: create or update a context record.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{ContextRecord, ServiceRecord, SubscriptionRecord};
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::inventory::Inventory;
use crate::types::ContextType;

use super::CommandEnv;

/// A service a server should provide.
#[derive(Debug, Clone)]
pub struct ServiceOption {
    pub service: String,
    pub service_type: String,
    pub properties: BTreeMap<String, String>,
}

/// A platform or site subscription to a server's service.
#[derive(Debug, Clone)]
pub struct SubscriptionOption {
    pub service: String,
    pub server: String,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub name: String,
    /// Required when creating; must match when updating
    pub context_type: Option<ContextType>,
    pub properties: BTreeMap<String, String>,
    pub services: Vec<ServiceOption>,
    pub subscriptions: Vec<SubscriptionOption>,
}

impl SaveOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, context_type: ContextType) -> Self {
        self.context_type = Some(context_type);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn service(mut self, service: impl Into<String>, service_type: impl Into<String>) -> Self {
        self.services.push(ServiceOption {
            service: service.into(),
            service_type: service_type.into(),
            properties: BTreeMap::new(),
        });
        self
    }

    pub fn subscription(mut self, service: impl Into<String>, server: impl Into<String>) -> Self {
        self.subscriptions.push(SubscriptionOption {
            service: service.into(),
            server: server.into(),
            properties: BTreeMap::new(),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct SaveReport {
    pub name: String,
    pub context_type: ContextType,
    /// False when an existing record was updated
    pub created: bool,
    pub file: PathBuf,
    /// Persisted properties after defaults were applied
    pub properties: BTreeMap<String, String>,
}

pub struct SaveCommand<'a> {
    env: CommandEnv<'a>,
}

impl<'a> SaveCommand<'a> {
    pub fn new(env: CommandEnv<'a>) -> Self {
        Self { env }
    }

    /// Merge the options into the stored record, resolve it, and persist it.
    ///
    /// Subscriptions may name servers that are not saved yet; that is only
    /// checked when the context is verified.
    pub fn execute(&self, options: &SaveOptions) -> Result<SaveReport> {
        let name = options.name.trim();
        if name.is_empty() {
            return Err(ProvisionError::EmptyContextName);
        }

        let inventory = Inventory::load(self.env.store, self.env.registry, self.env.settings)?;
        let (mut record, created) = match inventory.find(name) {
            Some(actual) => {
                if let Some(expected) = options.context_type
                    && expected != actual
                {
                    return Err(ProvisionError::WrongContextType {
                        name: name.to_string(),
                        expected,
                        actual,
                    });
                }
                (inventory.record(name)?, false)
            }
            None => {
                let context_type = options.context_type.ok_or_else(|| {
                    anyhow::anyhow!("A context type is required to create '{name}'")
                })?;
                (ContextRecord::new(name, context_type), true)
            }
        };

        record.properties.extend(options.properties.clone());

        for option in &options.services {
            let mut properties = record
                .services
                .get(&option.service)
                .filter(|existing| existing.service_type == option.service_type)
                .map(|existing| existing.properties.clone())
                .unwrap_or_default();
            properties.extend(option.properties.clone());
            record.services.insert(
                option.service.clone(),
                ServiceRecord {
                    service_type: option.service_type.clone(),
                    properties,
                },
            );
        }

        for option in &options.subscriptions {
            // Generated credentials survive as long as the server is unchanged.
            let mut properties = record
                .service_subscriptions
                .get(&option.service)
                .filter(|existing| existing.server == option.server)
                .map(|existing| existing.properties.clone())
                .unwrap_or_default();
            properties.extend(option.properties.clone());
            record.service_subscriptions.insert(
                option.service.clone(),
                SubscriptionRecord {
                    server: option.server.clone(),
                    properties,
                },
            );
        }

        let context_type = record.context_type;
        let file = self.env.store.location(context_type, name);
        let mut context =
            Context::from_record(record, &file, self.env.registry, self.env.settings)?;
        if !context.save(self.env.store) {
            return Err(anyhow::anyhow!("Failed to save context '{name}' to {}", file.display()).into());
        }

        tracing::info!(context = name, created, "Saved context");
        Ok(SaveReport {
            name: name.to_string(),
            context_type,
            created,
            file,
            properties: context.properties().clone(),
        })
    }
}
