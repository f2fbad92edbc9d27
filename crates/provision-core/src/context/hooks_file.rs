//! Operator-supplied hook commands read from `.provision.toml`.
//!
//! ```toml
//! [hooks.verify]
//! pre = "drush cache:rebuild"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

use crate::process::CommandRequest;
use crate::step::Step;

pub const FILE_NAME: &str = ".provision.toml";

#[derive(Debug, Default, Deserialize)]
pub struct HooksFile {
    #[serde(default)]
    pub hooks: Hooks,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hooks {
    #[serde(default)]
    pub verify: PhaseCommands,
}

#[derive(Debug, Default, Deserialize)]
pub struct PhaseCommands {
    pub pre: Option<String>,
    pub post: Option<String>,
}

pub fn parse(path: &Path) -> anyhow::Result<HooksFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hooks file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse hooks file: {}", path.display()))
}

/// Steps running the `hooks.verify.pre` command found in `dir`, if any.
///
/// The file is parsed again when the steps run, so edits made by earlier
/// steps are picked up.
pub fn pre_verify_steps(dir: &Path, env: &BTreeMap<String, String>) -> Vec<Step> {
    let path = dir.join(FILE_NAME);
    if !path.is_file() {
        return Vec::new();
    }

    let check = path.clone();
    let found = Step::new("hooks.found")
        .start(format!("Custom hooks file found: {}", path.display()))
        .failure(format!(
            "Custom hooks file found: {}: Unable to parse TOML.",
            path.display()
        ))
        .execute(move |_| {
            parse(&check)?;
            Ok(0)
        });

    let run = {
        let path = path.clone();
        let dir = dir.to_path_buf();
        let env = env.clone();
        Step::new(format!("hooks.verify.pre.{}", machine_name(&path)))
            .start(format!("Running hooks.verify.pre from {}", path.display()))
            .success(format!(
                "Successfully ran hooks.verify.pre from {}",
                path.display()
            ))
            .failure(format!(
                "Errors while running hooks.verify.pre from {}",
                path.display()
            ))
            .execute(move |step_env| {
                let Some(command) = parse(&path)?.hooks.verify.pre else {
                    return Ok(0);
                };
                let request = CommandRequest::new(format!("set -e; {command}"))
                    .in_dir(&dir)
                    .with_envs(&env);
                Ok(step_env.runner.run(&request)?.status)
            })
    };

    vec![found, run]
}

fn machine_name(path: &Path) -> String {
    path.display()
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
