//! Services command: what is available, and what a context has attached.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::inventory::Inventory;
use crate::types::{ContextType, Role};

use super::CommandEnv;

#[derive(Debug, Clone, Default)]
pub struct ServicesOptions {
    /// Context to inspect; `None` lists the registry
    pub name: Option<String>,
}

impl ServicesOptions {
    pub fn available() -> Self {
        Self { name: None }
    }

    pub fn context(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// A service known to the registry.
#[derive(Debug, Clone)]
pub struct AvailableService {
    pub name: String,
    pub friendly_name: String,
    pub allowed_contexts: Vec<ContextType>,
    /// (type name, label)
    pub types: Vec<(String, String)>,
}

/// A service attached to a context, as stored.
#[derive(Debug, Clone)]
pub struct AttachedService {
    pub service: String,
    pub friendly_name: String,
    /// Known for provided services, and for subscriptions whose server is saved
    pub service_type: Option<String>,
    /// The providing server
    pub server: String,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum ServicesReport {
    Available(Vec<AvailableService>),
    Attached {
        name: String,
        context_type: ContextType,
        role: Role,
        services: Vec<AttachedService>,
    },
}

pub struct ServicesCommand<'a> {
    env: CommandEnv<'a>,
}

impl<'a> ServicesCommand<'a> {
    pub fn new(env: CommandEnv<'a>) -> Self {
        Self { env }
    }

    pub fn execute(&self, options: &ServicesOptions) -> Result<ServicesReport> {
        let registry = self.env.registry;
        let Some(name) = &options.name else {
            let mut available = Vec::new();
            for (service, definition) in registry.find_available_services() {
                let types = registry
                    .find_available_service_types(service)?
                    .into_iter()
                    .map(|(type_name, t)| (type_name.to_string(), t.label().to_string()))
                    .collect();
                available.push(AvailableService {
                    name: service.to_string(),
                    friendly_name: definition.friendly_name.to_string(),
                    allowed_contexts: definition.allowed_contexts.to_vec(),
                    types,
                });
            }
            return Ok(ServicesReport::Available(available));
        };

        let inventory = Inventory::load(self.env.store, registry, self.env.settings)?;
        let record = inventory.record(name)?;
        let friendly = |service: &str| {
            registry
                .service(service)
                .map(|d| d.friendly_name.to_string())
                .unwrap_or_else(|_| service.to_string())
        };

        let services = match record.context_type.role() {
            Role::Provider => record
                .services
                .iter()
                .map(|(service, provided)| AttachedService {
                    service: service.clone(),
                    friendly_name: friendly(service),
                    service_type: Some(provided.service_type.clone()),
                    server: record.name.clone(),
                    properties: provided.properties.clone(),
                })
                .collect(),
            Role::Subscriber => {
                let mut services = Vec::new();
                for (service, subscription) in &record.service_subscriptions {
                    let service_type = match inventory.find(&subscription.server) {
                        Some(ContextType::Server) => inventory
                            .record(&subscription.server)?
                            .services
                            .get(service)
                            .map(|s| s.service_type.clone()),
                        _ => None,
                    };
                    services.push(AttachedService {
                        service: service.clone(),
                        friendly_name: friendly(service),
                        service_type,
                        server: subscription.server.clone(),
                        properties: subscription.properties.clone(),
                    });
                }
                services
            }
        };

        Ok(ServicesReport::Attached {
            name: record.name.clone(),
            context_type: record.context_type,
            role: record.context_type.role(),
            services,
        })
    }
}
