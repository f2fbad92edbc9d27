//! Application context for dependency injection.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::{ConfigStore, ProvisionConfig, Settings, TomlContextStore};
use crate::process::ShellRunner;
use crate::render::BuiltinTemplates;
use crate::service::ServiceRegistry;

/// Paths and settings shared by every command.
///
/// Frontends create this once and hand out collaborators from it.
#[derive(Debug, Clone)]
pub struct AppContext {
    provision_dir: PathBuf,
    home_dir: Option<PathBuf>,
    working_dir: PathBuf,
    settings: Settings,
}

impl AppContext {
    /// Create a context, reading `provision.toml` from `provision_dir`.
    pub fn new(
        provision_dir: PathBuf,
        home_dir: Option<PathBuf>,
        working_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let config = ConfigStore::from_dir(&provision_dir).load()?;
        Ok(Self::with_config(provision_dir, home_dir, working_dir, &config))
    }

    /// Create a context from an already loaded configuration (for testing).
    pub fn with_config(
        provision_dir: PathBuf,
        home_dir: Option<PathBuf>,
        working_dir: PathBuf,
        config: &ProvisionConfig,
    ) -> Self {
        let settings = Settings::resolve(config, &provision_dir, home_dir.as_deref(), &working_dir);
        Self {
            provision_dir,
            home_dir,
            working_dir,
            settings,
        }
    }

    /// Context rooted at the platform config directory and the current
    /// working directory.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let provision_dir = dirs::config_dir()
            .map(|p| p.join("provision"))
            .context("Could not determine config directory")?;
        let working_dir = std::env::current_dir().context("Could not determine working directory")?;
        Self::new(provision_dir, dirs::home_dir(), working_dir)
    }

    pub fn provision_dir(&self) -> &Path {
        &self.provision_dir
    }

    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_dir(&self.provision_dir)
    }

    pub fn context_store(&self) -> TomlContextStore {
        TomlContextStore::new(self.settings.contexts_path.clone())
    }

    pub fn registry(&self) -> ServiceRegistry {
        ServiceRegistry::with_default_services()
    }

    pub fn runner(&self, verbose: bool) -> ShellRunner {
        ShellRunner::new(verbose)
    }

    pub fn renderer(&self) -> BuiltinTemplates {
        BuiltinTemplates::new()
    }
}
