//! NGINX web server with PHP-FPM.

use crate::property::Property;
use crate::service::{PhaseHooks, ServiceType};

use super::Flavor;

pub(crate) const FLAVOR: Flavor = Flavor {
    type_name: "nginx",
    label: "NGINX",
    aliases: server_aliases,
    redirect: redirect,
    site_vars: &["php_sock_location"],
};

// Appended to the `server_name` directive, so each alias is space prefixed.
fn server_aliases(aliases: &[&str]) -> String {
    aliases.iter().map(|alias| format!(" {alias}")).collect()
}

fn redirect(target: &str) -> String {
    format!("    return 301 {target}$request_uri;\n")
}

#[derive(Debug)]
pub struct NginxService {
    hooks: PhaseHooks,
}

impl NginxService {
    pub fn new() -> Self {
        Self {
            hooks: super::hooks(FLAVOR),
        }
    }
}

impl Default for NginxService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceType for NginxService {
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
        let mut properties = super::server_properties();
        properties.push(
            Property::new("php_sock_location")
                .description("Path to the PHP-FPM socket.")
                .default_value("/var/run/php/php-fpm.sock")
                .required(true),
        );
        properties
    }

    fn hooks(&self) -> &PhaseHooks {
        &self.hooks
    }
}
