//! Apache web server.

use crate::property::Property;
use crate::service::{PhaseHooks, ServiceType};

use super::Flavor;

pub(crate) const FLAVOR: Flavor = Flavor {
    type_name: "apache",
    label: "Apache",
    aliases: server_aliases,
    redirect: redirect,
    site_vars: &[],
};

fn server_aliases(aliases: &[&str]) -> String {
    aliases
        .iter()
        .map(|alias| format!("    ServerAlias {alias}\n"))
        .collect()
}

fn redirect(target: &str) -> String {
    format!("    Redirect permanent / {target}\n")
}

#[derive(Debug)]
pub struct ApacheService {
    hooks: PhaseHooks,
}

impl ApacheService {
    pub fn new() -> Self {
        Self {
            hooks: super::hooks(FLAVOR),
        }
    }
}

impl Default for ApacheService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceType for ApacheService {
    fn service(&self) -> &'static str {
        super::SERVICE
    }

    fn type_name(&self) -> &'static str {
        FLAVOR.type_name
    }

    fn label(&self) -> &'static str {
        FLAVOR.label
    }

    fn server_properties(&self) -> Vec<Property> {
        super::server_properties()
    }

    fn hooks(&self) -> &PhaseHooks {
        &self.hooks
    }
}
