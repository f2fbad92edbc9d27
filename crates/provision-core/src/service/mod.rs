//! Services: capabilities a server provides and platforms/sites subscribe to.
//!
//! A service name (`http`, `db`) is described by a [`ServiceDefinition`].
//! Each concrete implementation of a service (`apache`, `nginx`, `mysql`,
//! `mysqlDocker`) is a [`ServiceType`] registered in the
//! [`ServiceRegistry`](registry::ServiceRegistry).
//!
//! Types contribute steps through a [`PhaseHooks`] table keyed by pipeline
//! phase and the type of context being verified. Hook factories only build
//! steps; all work happens inside the step bodies.

pub mod db;
pub mod http;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::process::CommandRequest;
use crate::property::Property;
use crate::step::Step;
use crate::types::{ContextType, Phase, Role};

pub use registry::ServiceRegistry;

/// Static description of a service name.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub friendly_name: &'static str,
    /// Context types that may subscribe to this service.
    pub allowed_contexts: &'static [ContextType],
    /// Properties stored on each subscription, by subscriber type.
    pub subscription_properties: fn(ContextType) -> Vec<Property>,
}

impl ServiceDefinition {
    pub fn allows(&self, context_type: ContextType) -> bool {
        self.allowed_contexts.contains(&context_type)
    }
}

/// One implementation of a service.
pub trait ServiceType: Debug + Send + Sync {
    /// Service name this type implements, e.g. `"http"`.
    fn service(&self) -> &'static str;

    /// Type identifier stored in server records, e.g. `"nginx"`.
    fn type_name(&self) -> &'static str;

    /// Human readable name.
    fn label(&self) -> &'static str;

    /// Properties of the service on its providing server.
    fn server_properties(&self) -> Vec<Property>;

    /// Steps contributed per phase and context type.
    fn hooks(&self) -> &PhaseHooks;
}

/// Builds the steps for one (phase, context type) slot.
pub type StepFactory = Arc<dyn Fn(&ServiceBinding) -> anyhow::Result<Vec<Step>> + Send + Sync>;

/// Dispatch table from (phase, context type) to step factories.
///
/// An empty slot contributes nothing; that is never an error.
#[derive(Clone, Default)]
pub struct PhaseHooks {
    table: BTreeMap<(Phase, ContextType), Vec<StepFactory>>,
}

impl Debug for PhaseHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.table
                    .iter()
                    .map(|((phase, ct), factories)| (format!("{phase}:{ct}"), factories.len())),
            )
            .finish()
    }
}

impl PhaseHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, phase: Phase, context_type: ContextType, factory: F) -> Self
    where
        F: Fn(&ServiceBinding) -> anyhow::Result<Vec<Step>> + Send + Sync + 'static,
    {
        self.table
            .entry((phase, context_type))
            .or_default()
            .push(Arc::new(factory));
        self
    }

    /// Register the same factory for several context types.
    pub fn on_each<F>(mut self, phase: Phase, context_types: &[ContextType], factory: F) -> Self
    where
        F: Fn(&ServiceBinding) -> anyhow::Result<Vec<Step>> + Send + Sync + 'static,
    {
        let factory: StepFactory = Arc::new(factory);
        for context_type in context_types {
            self.table
                .entry((phase, *context_type))
                .or_default()
                .push(Arc::clone(&factory));
        }
        self
    }

    /// Append another table's factories after this one's.
    pub fn extend(mut self, other: PhaseHooks) -> Self {
        for (key, factories) in other.table {
            self.table.entry(key).or_default().extend(factories);
        }
        self
    }

    pub fn handles(&self, phase: Phase, context_type: ContextType) -> bool {
        self.table
            .get(&(phase, context_type))
            .is_some_and(|f| !f.is_empty())
    }

    pub fn steps(
        &self,
        phase: Phase,
        context_type: ContextType,
        binding: &ServiceBinding,
    ) -> anyhow::Result<Vec<Step>> {
        let mut steps = Vec::new();
        if let Some(factories) = self.table.get(&(phase, context_type)) {
            for factory in factories {
                steps.extend(factory(binding)?);
            }
        }
        Ok(steps)
    }
}

/// Owned view of a context, safe to move into step bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub name: String,
    pub context_type: ContextType,
    pub properties: BTreeMap<String, String>,
    pub file: PathBuf,
}

impl ContextSnapshot {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> anyhow::Result<&str> {
        self.property(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Property '{}' is not set on {} '{}'",
                name,
                self.context_type,
                self.name
            )
        })
    }
}

/// Everything a hook needs about one service attached to the context being
/// verified.
///
/// For a server, `context` and `server` are the same and the role is
/// provider. For a platform or site, `server` is the providing server and
/// `subscription_properties` holds the subscriber's own values.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    pub service: String,
    pub service_type: String,
    pub role: Role,
    pub context: ContextSnapshot,
    pub server: ContextSnapshot,
    pub service_properties: BTreeMap<String, String>,
    pub subscription_properties: BTreeMap<String, String>,
    /// Environment passed to every command a step runs.
    pub env: BTreeMap<String, String>,
    pub wait_timeout: Duration,
}

impl ServiceBinding {
    pub fn service_property(&self, name: &str) -> Option<&str> {
        self.service_properties
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn subscription_property(&self, name: &str) -> Option<&str> {
        self.subscription_properties
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require_service_property(&self, name: &str) -> anyhow::Result<&str> {
        self.service_property(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Service '{}' on server '{}' has no '{}' property",
                self.service,
                self.server.name,
                name
            )
        })
    }

    pub fn require_subscription_property(&self, name: &str) -> anyhow::Result<&str> {
        self.subscription_property(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Subscription to '{}' on {} '{}' has no '{}' property",
                self.service,
                self.context.context_type,
                self.context.name,
                name
            )
        })
    }

    /// Root for every configuration file the providing server generates.
    pub fn server_config_path(&self) -> anyhow::Result<PathBuf> {
        self.server.require("server_config_path").map(PathBuf::from)
    }

    /// A command carrying the binding's environment.
    pub fn command(&self, command: impl Into<String>) -> CommandRequest {
        CommandRequest::new(command).with_envs(&self.env)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn snapshot(name: &str, context_type: ContextType, props: &[(&str, &str)]) -> ContextSnapshot {
        ContextSnapshot {
            name: name.to_string(),
            context_type,
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file: PathBuf::from(format!("/contexts/{context_type}.{name}.toml")),
        }
    }

    pub fn binding(
        service: &str,
        service_type: &str,
        context: ContextSnapshot,
        server: ContextSnapshot,
        service_props: &[(&str, &str)],
        subscription_props: &[(&str, &str)],
    ) -> ServiceBinding {
        let role = context.context_type.role();
        ServiceBinding {
            service: service.to_string(),
            service_type: service_type.to_string(),
            role,
            context,
            server,
            service_properties: service_props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            subscription_properties: subscription_props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            env: BTreeMap::new(),
            wait_timeout: Duration::from_secs(30),
        }
    }
}
