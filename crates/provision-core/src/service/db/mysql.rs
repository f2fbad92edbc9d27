//! MySQL or MariaDB reachable from the provisioning host.

use crate::property::Property;
use crate::service::{PhaseHooks, ServiceType};

use super::Transport;

#[derive(Debug)]
pub struct MysqlService {
    hooks: PhaseHooks,
}

impl MysqlService {
    pub fn new() -> Self {
        Self {
            hooks: super::hooks(Transport::Native),
        }
    }
}

impl Default for MysqlService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceType for MysqlService {
    fn service(&self) -> &'static str {
        super::SERVICE
    }

    fn type_name(&self) -> &'static str {
        "mysql"
    }

    fn label(&self) -> &'static str {
        "MySQL"
    }

    fn server_properties(&self) -> Vec<Property> {
        super::server_properties()
    }

    fn hooks(&self) -> &PhaseHooks {
        &self.hooks
    }
}
