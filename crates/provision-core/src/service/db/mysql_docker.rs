//! MariaDB running as the `db` service of the server's compose project.
//!
//! Commands run from the server's config directory so `docker-compose` finds
//! the project. The container may still be starting when verification runs,
//! so connecting polls for up to `database_wait_timeout` seconds.

use crate::property::Property;
use crate::service::{PhaseHooks, ServiceType};

use super::Transport;

#[derive(Debug)]
pub struct MysqlDockerService {
    hooks: PhaseHooks,
}

impl MysqlDockerService {
    pub fn new() -> Self {
        Self {
            hooks: super::hooks(Transport::Docker),
        }
    }
}

impl Default for MysqlDockerService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceType for MysqlDockerService {
    fn service(&self) -> &'static str {
        super::SERVICE
    }

    fn type_name(&self) -> &'static str {
        "mysqlDocker"
    }

    fn label(&self) -> &'static str {
        "MySQL on Docker"
    }

    fn server_properties(&self) -> Vec<Property> {
        super::server_properties()
    }

    fn hooks(&self) -> &PhaseHooks {
        &self.hooks
    }
}
