//! Contexts: the servers, platforms and sites under management.
//!
//! A [`Context`] is rebuilt from its persisted record on every run. Building
//! one resolves every property (defaults, generators and validators) so an
//! invalid record is reported before any step exists.

pub mod assemble;
pub mod hooks_file;
pub mod platform;
pub mod server;
pub mod site;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::{ContextRecord, ContextStore, ServiceRecord, Settings, SubscriptionRecord};
use crate::error::{PropertyError, ProvisionError, Result};
use crate::property::{Property, resolve_properties};
use crate::service::{ContextSnapshot, ServiceRegistry};
use crate::step::Step;
use crate::types::{ContextType, Role};

pub use assemble::{Attachments, assemble_install, assemble_verify};

/// Properties computed from others and never written back.
const DERIVED: &[&str] = &["document_root_full"];

#[derive(Debug, Clone)]
pub struct Context {
    name: String,
    context_type: ContextType,
    properties: BTreeMap<String, String>,
    derived: BTreeMap<String, String>,
    services: IndexMap<String, ServiceRecord>,
    subscriptions: IndexMap<String, SubscriptionRecord>,
    file: PathBuf,
    dirty: bool,
}

/// Property definitions for a context type.
pub fn property_definitions(
    context_type: ContextType,
    name: &str,
    settings: &Settings,
) -> Vec<Property> {
    match context_type {
        ContextType::Server => server::properties(name, settings),
        ContextType::Platform => platform::properties(settings, true),
        ContextType::Site => site::properties(settings),
    }
}

impl Context {
    /// Build a context from its record, resolving every property of the
    /// context, its services and its subscriptions.
    ///
    /// The context is marked dirty when a default or generated value was
    /// filled in, so callers can persist it before verification.
    pub fn from_record(
        record: ContextRecord,
        file: impl Into<PathBuf>,
        registry: &ServiceRegistry,
        settings: &Settings,
    ) -> Result<Self> {
        let file = file.into();
        if record.name.trim().is_empty() {
            return Err(ProvisionError::EmptyContextName);
        }
        record.validate().map_err(|e| ProvisionError::Config {
            file: file.clone(),
            message: e.to_string(),
        })?;

        let ContextRecord {
            name,
            context_type,
            properties,
            services,
            service_subscriptions,
        } = record;

        let owner = Owner {
            name: &name,
            context_type,
            file: &file,
        };

        let definitions = property_definitions(context_type, &name, settings);
        let resolved =
            resolve_properties(&definitions, &properties).map_err(|e| owner.error(e, None))?;
        let mut dirty = !resolved.defaulted.is_empty();
        let mut properties = resolved.values;

        let mut resolved_services = IndexMap::new();
        for (service, record) in services {
            let service_type = registry.service_type(&service, &record.service_type)?;
            let resolved = resolve_properties(&service_type.server_properties(), &record.properties)
                .map_err(|e| owner.error(e, Some(&service)))?;
            dirty |= !resolved.defaulted.is_empty();
            resolved_services.insert(
                service,
                ServiceRecord {
                    service_type: record.service_type,
                    properties: resolved.values,
                },
            );
        }

        let mut resolved_subscriptions = IndexMap::new();
        for (service, record) in service_subscriptions {
            let definition = registry.service(&service)?;
            if !definition.allows(context_type) {
                return Err(ProvisionError::ServiceNotAllowed {
                    service,
                    context_type,
                });
            }
            let resolved = resolve_properties(
                &(definition.subscription_properties)(context_type),
                &record.properties,
            )
            .map_err(|e| owner.error(e, Some(&service)))?;
            dirty |= !resolved.defaulted.is_empty();
            resolved_subscriptions.insert(
                service,
                SubscriptionRecord {
                    server: record.server,
                    properties: resolved.values,
                },
            );
        }

        if context_type == ContextType::Site
            && !properties.contains_key("site_path")
            && let Some(uri) = properties.get("uri").cloned()
        {
            properties.insert("site_path".to_string(), site::default_site_path(&uri));
            dirty = true;
        }

        for derived in DERIVED {
            properties.remove(*derived);
        }

        let mut context = Self {
            name,
            context_type,
            properties,
            derived: BTreeMap::new(),
            services: resolved_services,
            subscriptions: resolved_subscriptions,
            file,
            dirty,
        };
        context.derive();
        Ok(context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context_type(&self) -> ContextType {
        self.context_type
    }

    pub fn role(&self) -> Role {
        self.context_type.role()
    }

    /// File the context was loaded from or will be saved to.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Own or derived value of a property. Blank values count as unset.
    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .or_else(|| self.derived.get(name))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if DERIVED.contains(&name.as_str()) {
            tracing::warn!(property = %name, "Ignoring write to derived property");
            return;
        }
        self.properties.insert(name, value.into());
        self.dirty = true;
        self.derive();
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Services provided by a server, in attachment order.
    pub fn services(&self) -> &IndexMap<String, ServiceRecord> {
        &self.services
    }

    /// Services subscribed to by a platform or site, in attachment order.
    pub fn subscriptions(&self) -> &IndexMap<String, SubscriptionRecord> {
        &self.subscriptions
    }

    /// Names of attached services in attachment order, whatever the role.
    pub fn service_names(&self) -> Vec<&str> {
        match self.role() {
            Role::Provider => self.services.keys().map(String::as_str).collect(),
            Role::Subscriber => self.subscriptions.keys().map(String::as_str).collect(),
        }
    }

    pub fn service_requirements(&self) -> &'static [&'static str] {
        self.context_type.service_requirements()
    }

    /// True when resolution filled in values that are not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Fill the code root from the site's platform when the site sets none.
    pub fn inherit_platform(&mut self, platform: &Context) {
        for name in ["root", "document_root"] {
            if !self.properties.get(name).is_some_and(|v| !v.is_empty())
                && let Some(value) = platform.get_property(name)
            {
                self.derived.insert(name.to_string(), value.to_string());
            }
        }
        self.derive();
    }

    fn derive(&mut self) {
        if !matches!(self.context_type, ContextType::Platform | ContextType::Site) {
            return;
        }
        let full = self
            .get_property("root")
            .map(|root| platform::document_root_full(root, self.get_property("document_root")));
        if let Some(full) = full {
            self.derived.insert("document_root_full".to_string(), full);
        }
    }

    /// Owned copy of the context, including derived values.
    pub fn snapshot(&self) -> ContextSnapshot {
        let mut properties = self.derived.clone();
        properties.extend(self.properties.clone());
        ContextSnapshot {
            name: self.name.clone(),
            context_type: self.context_type,
            properties,
            file: self.file.clone(),
        }
    }

    /// The persistable form. Derived and inherited values are left out.
    pub fn to_record(&self) -> ContextRecord {
        ContextRecord {
            name: self.name.clone(),
            context_type: self.context_type,
            properties: self.properties.clone(),
            services: self.services.clone(),
            service_subscriptions: self.subscriptions.clone(),
        }
    }

    /// Attach (or replace) a service this server provides.
    pub fn add_service(&mut self, service: impl Into<String>, record: ServiceRecord) {
        self.services.insert(service.into(), record);
        self.dirty = true;
    }

    /// Attach (or replace) a subscription of this platform or site.
    pub fn add_subscription(&mut self, service: impl Into<String>, record: SubscriptionRecord) {
        self.subscriptions.insert(service.into(), record);
        self.dirty = true;
    }

    /// Persist the context. Storage failures are logged and reported as
    /// `false`.
    pub fn save(&mut self, store: &dyn ContextStore) -> bool {
        if self.context_type == ContextType::Site
            && !self.has_property("site_path")
            && let Some(uri) = self.get_property("uri").map(str::to_string)
        {
            let site_path = site::default_site_path(&uri);
            self.properties.insert("site_path".to_string(), site_path);
        }

        match store.save(&self.to_record()) {
            Ok(()) => {
                self.dirty = false;
                tracing::debug!(context = %self.name, file = %self.file.display(), "Saved context");
                true
            }
            Err(e) => {
                tracing::error!(context = %self.name, "Failed to save context: {e:#}");
                false
            }
        }
    }

    /// Delete the persisted record. Storage failures are logged and reported
    /// as `false`.
    pub fn delete_config(&self, store: &dyn ContextStore) -> bool {
        match store.delete(self.context_type, &self.name) {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(context = %self.name, "No saved configuration to delete");
                false
            }
            Err(e) => {
                tracing::error!(context = %self.name, "Failed to delete context: {e:#}");
                false
            }
        }
    }

    /// Steps the context runs before any service.
    pub fn pre_verify(&self, env: &BTreeMap<String, String>) -> Vec<Step> {
        let mut steps = Vec::new();
        let hooks_dir = match self.context_type {
            ContextType::Server => {
                steps.extend(server::pre_verify(self));
                self.get_property("server_config_path")
            }
            ContextType::Platform | ContextType::Site => self.get_property("root"),
        };
        if let Some(dir) = hooks_dir {
            steps.extend(hooks_file::pre_verify_steps(Path::new(dir), env));
        }
        steps
    }

    pub fn verify(&self, env: &BTreeMap<String, String>) -> Vec<Step> {
        match self.context_type {
            ContextType::Server => Vec::new(),
            ContextType::Platform => platform::verify(self, env),
            ContextType::Site => site::verify(self, env),
        }
    }

    pub fn post_verify(&self, _env: &BTreeMap<String, String>) -> Vec<Step> {
        Vec::new()
    }
}

/// Identifies the context a property error belongs to.
struct Owner<'a> {
    name: &'a str,
    context_type: ContextType,
    file: &'a Path,
}

impl Owner<'_> {
    fn error(&self, err: PropertyError, service: Option<&str>) -> ProvisionError {
        let property = match service {
            Some(service) => format!("{service}.{}", err.name()),
            None => err.name().to_string(),
        };
        match err {
            PropertyError::MissingRequired { .. } => ProvisionError::MissingRequiredProperty {
                property,
                context: self.name.to_string(),
                context_type: self.context_type,
                file: self.file.to_path_buf(),
            },
            PropertyError::Invalid { reason, .. } => ProvisionError::InvalidProperty {
                property,
                context: self.name.to_string(),
                context_type: self.context_type,
                file: self.file.to_path_buf(),
                reason,
            },
        }
    }
}
