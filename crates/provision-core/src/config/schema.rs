//! Schemas for provision.toml and context records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::ContextType;

/// Application settings from provision.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Directory holding context records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts_path: Option<PathBuf>,

    /// Root for generated server configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,

    /// Seconds to wait for a database container to accept connections.
    #[serde(default = "default_database_wait_timeout")]
    pub database_wait_timeout: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aegir_root: Option<PathBuf>,
}

fn default_database_wait_timeout() -> u64 {
    30
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            contexts_path: None,
            config_path: None,
            database_wait_timeout: default_database_wait_timeout(),
            script_user: None,
            aegir_root: None,
        }
    }
}

impl ProvisionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (key, path) in [
            ("contexts_path", &self.contexts_path),
            ("config_path", &self.config_path),
            ("aegir_root", &self.aegir_root),
        ] {
            if let Some(path) = path
                && !path.is_absolute()
            {
                anyhow::bail!("'{}' must be an absolute path, got '{}'", key, path.display());
            }
        }
        Ok(())
    }
}

/// Persisted record of one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub context_type: ContextType,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Services a server provides, in attachment order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub services: IndexMap<String, ServiceRecord>,

    /// Services a platform or site subscribes to, in attachment order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub service_subscriptions: IndexMap<String, SubscriptionRecord>,
}

impl ContextRecord {
    pub fn new(name: impl Into<String>, context_type: ContextType) -> Self {
        Self {
            name: name.into(),
            context_type,
            properties: BTreeMap::new(),
            services: IndexMap::new(),
            service_subscriptions: IndexMap::new(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Context name must not be empty");
        }
        if self.context_type == ContextType::Server && !self.service_subscriptions.is_empty() {
            anyhow::bail!("Server '{}' cannot subscribe to services", self.name);
        }
        if self.context_type != ContextType::Server && !self.services.is_empty() {
            anyhow::bail!(
                "Only servers provide services; {} '{}' lists some",
                self.context_type,
                self.name
            );
        }
        for (service, record) in &self.services {
            if record.service_type.trim().is_empty() {
                anyhow::bail!("Service '{}' on '{}' has no type", service, self.name);
            }
        }
        for (service, record) in &self.service_subscriptions {
            if record.server.trim().is_empty() {
                anyhow::bail!("Subscription '{}' on '{}' names no server", service, self.name);
            }
        }
        Ok(())
    }
}

/// A service provided by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(rename = "type")]
    pub service_type: String,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A subscription to the service of one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub server: String,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}
