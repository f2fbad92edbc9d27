//! Configuration: application settings and persisted context records.
//!
//! - Settings: `<config_dir>/provision/provision.toml`
//! - Contexts: one `<type>.<name>.toml` file per context under `contexts_path`

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use parser::{parse_context_toml, parse_context_toml_str, parse_provision_toml, to_toml};
pub use schema::{ContextRecord, ProvisionConfig, ServiceRecord, SubscriptionRecord};
pub use store::{ConfigStore, ContextStore, TomlContextStore};

/// Settings with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub contexts_path: PathBuf,
    /// Root under which each server gets its config directory.
    pub config_path: PathBuf,
    pub database_wait_timeout: Duration,
    pub script_user: String,
    pub aegir_root: PathBuf,
    pub home_dir: Option<PathBuf>,
    /// Relative paths typed by the operator resolve against this.
    pub working_dir: PathBuf,
}

impl Settings {
    pub fn resolve(
        config: &ProvisionConfig,
        provision_dir: &Path,
        home_dir: Option<&Path>,
        working_dir: &Path,
    ) -> Self {
        let home = home_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| working_dir.to_path_buf());

        Self {
            contexts_path: config
                .contexts_path
                .clone()
                .unwrap_or_else(|| provision_dir.join("contexts")),
            config_path: config
                .config_path
                .clone()
                .unwrap_or_else(|| home.join("config")),
            database_wait_timeout: Duration::from_secs(config.database_wait_timeout),
            script_user: config
                .script_user
                .clone()
                .unwrap_or_else(default_script_user),
            aegir_root: config.aegir_root.clone().unwrap_or(home),
            home_dir: home_dir.map(Path::to_path_buf),
            working_dir: working_dir.to_path_buf(),
        }
    }
}

fn default_script_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "aegir".to_string())
}
