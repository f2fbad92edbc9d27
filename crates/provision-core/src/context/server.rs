//! Server contexts: hosts that provide services.

use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;

use crate::config::Settings;
use crate::property::{Property, validators};
use crate::step::Step;

use super::Context;

pub(super) fn properties(name: &str, settings: &Settings) -> Vec<Property> {
    vec![
        Property::new("remote_host")
            .description("server: host name; default localhost")
            .default_value("localhost")
            .required(true)
            .validate(validators::hostname_resolves),
        Property::new("script_user")
            .description("server: OS user name; default current user")
            .default_value(settings.script_user.clone())
            .required(true),
        Property::new("aegir_root")
            .description("server: Aegir root; default home directory")
            .default_value(settings.aegir_root.display().to_string())
            .required(true),
        Property::new("server_config_path")
            .description("server: Server configuration path; default config_path/name")
            .default_value(settings.config_path.join(name).display().to_string())
            .required(true)
            .hidden(),
    ]
}

/// The config directory must exist before any service writes into it.
pub(super) fn pre_verify(context: &Context) -> Vec<Step> {
    let path = context.get_property("server_config_path").map(PathBuf::from);
    let name = context.name().to_string();

    vec![
        Step::new("server.config_path")
            .start("Preparing server configuration directory...")
            .failure("Unable to create the server configuration directory.")
            .execute(move |env| {
                let path = path.ok_or_else(|| {
                    anyhow::anyhow!("Server '{name}' has no server_config_path")
                })?;
                fs::create_dir_all(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                env.reporter
                    .success(&format!("Using configuration directory {}", path.display()));
                Ok(0)
            }),
    ]
}
