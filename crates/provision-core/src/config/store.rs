//! Stores for provision.toml and context records.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::types::ContextType;

use super::paths::{context_file, parse_context_file_name, settings_file};
use super::{ContextRecord, ProvisionConfig, parser};

/// Loads and saves provision.toml.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_default_dir() -> anyhow::Result<Self> {
        let provision_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("provision");
        Ok(Self::from_dir(&provision_dir))
    }

    pub fn from_dir(provision_dir: &Path) -> Self {
        Self {
            config_path: settings_file(provision_dir),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<ProvisionConfig> {
        if !self.config_path.exists() {
            return Ok(ProvisionConfig::default());
        }
        parser::parse_provision_toml(&self.config_path)
    }

    pub fn save(&self, config: &ProvisionConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        write_file(&self.config_path, &content)
    }
}

/// Key-value persistence of context records.
pub trait ContextStore: Debug + Send + Sync {
    /// Load one record. `Ok(None)` when it does not exist.
    fn load(&self, context_type: ContextType, name: &str) -> anyhow::Result<Option<ContextRecord>>;

    /// Create or replace a record. A successful save is readable by `load`.
    fn save(&self, record: &ContextRecord) -> anyhow::Result<()>;

    /// Remove a record, returning whether it existed.
    fn delete(&self, context_type: ContextType, name: &str) -> anyhow::Result<bool>;

    /// Every stored (type, name), sorted.
    fn list(&self) -> anyhow::Result<Vec<(ContextType, String)>>;

    /// Where a record lives, for error messages.
    fn location(&self, context_type: ContextType, name: &str) -> PathBuf;
}

/// One TOML file per context.
#[derive(Debug, Clone)]
pub struct TomlContextStore {
    contexts_path: PathBuf,
}

impl TomlContextStore {
    pub fn new(contexts_path: impl Into<PathBuf>) -> Self {
        Self {
            contexts_path: contexts_path.into(),
        }
    }

    pub fn contexts_path(&self) -> &Path {
        &self.contexts_path
    }
}

impl ContextStore for TomlContextStore {
    fn load(&self, context_type: ContextType, name: &str) -> anyhow::Result<Option<ContextRecord>> {
        let path = self.location(context_type, name);
        if !path.exists() {
            return Ok(None);
        }
        let record = parser::parse_context_toml(&path)?;
        if record.context_type != context_type || record.name != name {
            anyhow::bail!(
                "Context file {} describes {} '{}'",
                path.display(),
                record.context_type,
                record.name
            );
        }
        Ok(Some(record))
    }

    fn save(&self, record: &ContextRecord) -> anyhow::Result<()> {
        record.validate()?;
        let content = parser::to_toml(record)?;
        let path = self.location(record.context_type, &record.name);

        // Write beside the target and rename so readers never see half a file.
        let tmp = path.with_extension("toml.tmp");
        write_file(&tmp, &content)?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to write context file: {}", path.display()))?;
        Ok(())
    }

    fn delete(&self, context_type: ContextType, name: &str) -> anyhow::Result<bool> {
        let path = self.location(context_type, name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete context file: {}", path.display()))?;
        Ok(true)
    }

    fn list(&self) -> anyhow::Result<Vec<(ContextType, String)>> {
        if !self.contexts_path.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.contexts_path).with_context(|| {
            format!(
                "Failed to read contexts directory: {}",
                self.contexts_path.display()
            )
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(parsed) = entry
                .file_name()
                .to_str()
                .and_then(parse_context_file_name)
            {
                found.push(parsed);
            }
        }
        found.sort();
        Ok(found)
    }

    fn location(&self, context_type: ContextType, name: &str) -> PathBuf {
        context_file(&self.contexts_path, context_type, name)
    }
}

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }
    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
