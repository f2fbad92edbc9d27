//! Config path resolution helpers.

use std::path::{Path, PathBuf};

use crate::types::ContextType;

pub fn settings_file(provision_dir: &Path) -> PathBuf {
    provision_dir.join("provision.toml")
}

pub fn context_file(contexts_path: &Path, context_type: ContextType, name: &str) -> PathBuf {
    contexts_path.join(format!("{}.{}.toml", context_type, name))
}

/// Split `<type>.<name>.toml` back into its parts.
pub fn parse_context_file_name(file_name: &str) -> Option<(ContextType, String)> {
    let stem = file_name.strip_suffix(".toml")?;
    let (context_type, name) = stem.split_once('.')?;
    if name.is_empty() {
        return None;
    }
    Some((context_type.parse().ok()?, name.to_string()))
}
