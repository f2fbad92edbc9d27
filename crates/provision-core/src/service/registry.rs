//! Service registry for discovering available services and their types.
//!
//! Built once per process from an explicit list; lookups never touch the
//! outside world.

use indexmap::IndexMap;

use crate::error::{ProvisionError, Result};
use crate::types::ContextType;

use super::db::{MysqlDockerService, MysqlService};
use super::http::{ApacheService, NginxService};
use super::{ServiceDefinition, ServiceType, db, http};

/// Registry of known services and their implementations.
#[derive(Debug)]
pub struct ServiceRegistry {
    definitions: Vec<ServiceDefinition>,
    types: Vec<Box<dyn ServiceType>>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::with_default_services()
    }
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Create a registry with every built-in service.
    pub fn with_default_services() -> Self {
        let types: Vec<Box<dyn ServiceType>> = vec![
            Box::new(ApacheService::new()),
            Box::new(NginxService::new()),
            Box::new(MysqlService::new()),
            Box::new(MysqlDockerService::new()),
        ];
        Self {
            definitions: vec![http::definition(), db::definition()],
            types,
        }
    }

    /// Register a service name. A later definition with the same name wins.
    pub fn register_service(&mut self, definition: ServiceDefinition) {
        self.definitions.retain(|d| d.name != definition.name);
        self.definitions.push(definition);
    }

    /// Register an implementation of an already registered service.
    pub fn register_type(&mut self, service_type: Box<dyn ServiceType>) {
        self.types.retain(|t| {
            t.service() != service_type.service() || t.type_name() != service_type.type_name()
        });
        self.types.push(service_type);
    }

    /// All services, by name, in registration order.
    pub fn find_available_services(&self) -> IndexMap<&'static str, &ServiceDefinition> {
        self.definitions.iter().map(|d| (d.name, d)).collect()
    }

    /// Implementations of `service`, by type name.
    pub fn find_available_service_types(
        &self,
        service: &str,
    ) -> Result<IndexMap<&'static str, &dyn ServiceType>> {
        self.service(service)?;
        Ok(self
            .types
            .iter()
            .filter(|t| t.service() == service)
            .map(|t| (t.type_name(), t.as_ref()))
            .collect())
    }

    pub fn service(&self, name: &str) -> Result<&ServiceDefinition> {
        self.definitions
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ProvisionError::UnknownService {
                name: name.to_string(),
            })
    }

    pub fn service_type(&self, service: &str, type_name: &str) -> Result<&dyn ServiceType> {
        self.service(service)?;
        self.types
            .iter()
            .find(|t| t.service() == service && t.type_name() == type_name)
            .map(|t| t.as_ref())
            .ok_or_else(|| ProvisionError::UnknownServiceType {
                service: service.to_string(),
                service_type: type_name.to_string(),
            })
    }

    /// Services a context of `context_type` may subscribe to.
    pub fn services_for(&self, context_type: ContextType) -> Vec<&ServiceDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.allows(context_type))
            .collect()
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.definitions.iter().map(|d| d.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_services_registered() {
        let registry = ServiceRegistry::with_default_services();
        let services = registry.find_available_services();

        assert_eq!(services.keys().copied().collect::<Vec<_>>(), vec!["http", "db"]);
        assert_eq!(services["db"].friendly_name, "Database Server");
    }

    #[test]
    fn test_service_types_by_service() {
        let registry = ServiceRegistry::with_default_services();

        let http: Vec<_> = registry
            .find_available_service_types("http")
            .unwrap()
            .keys()
            .copied()
            .collect();
        assert_eq!(http, vec!["apache", "nginx"]);

        let db: Vec<_> = registry
            .find_available_service_types("db")
            .unwrap()
            .keys()
            .copied()
            .collect();
        assert_eq!(db, vec!["mysql", "mysqlDocker"]);
    }

    #[test]
    fn test_unknown_service_fails() {
        let registry = ServiceRegistry::with_default_services();

        let err = registry.find_available_service_types("mail").unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownService { ref name } if name == "mail"));

        let err = registry.service_type("http", "lighttpd").unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownServiceType { .. }));
    }

    #[test]
    fn test_services_for_context_type() {
        let registry = ServiceRegistry::with_default_services();

        let site: Vec<_> = registry
            .services_for(ContextType::Site)
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(site, vec!["http", "db"]);

        let platform: Vec<_> = registry
            .services_for(ContextType::Platform)
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(platform, vec!["http"]);
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let registry = ServiceRegistry::with_default_services();
        let first = registry.service_type("db", "mysql").unwrap().label();
        let second = registry.service_type("db", "mysql").unwrap().label();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ServiceRegistry::new();
        assert!(registry.find_available_services().is_empty());
        assert!(registry.service("http").is_err());
    }

    #[test]
    fn test_register_custom_type() {
        let mut registry = ServiceRegistry::new();
        registry.register_service(http::definition());
        registry.register_type(Box::new(NginxService::new()));
        registry.register_type(Box::new(NginxService::new()));

        let types = registry.find_available_service_types("http").unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(registry.service_type("http", "nginx").unwrap().label(), "NGINX");
    }
}
