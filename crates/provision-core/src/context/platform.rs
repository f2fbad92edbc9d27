//! Platform contexts: a code base that sites run on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::process::{CommandRequest, quote};
use crate::property::{Property, validators};
use crate::step::Step;

use super::Context;

pub const DEFAULT_COMPOSER_INSTALL: &str = "composer install --no-interaction";

/// Platform properties. Sites reuse them with `root` made optional, since a
/// site falls back to its platform's code root.
pub(super) fn properties(settings: &Settings, root_required: bool) -> Vec<Property> {
    let cwd = settings.working_dir.clone();
    let home = settings.home_dir.clone();

    vec![
        Property::new("root")
            .description("platform: path to source code.")
            .required(root_required)
            .validate(move |value| validators::code_root(value, &cwd, home.as_deref())),
        Property::new("git_url")
            .description("platform: git repository remote URL.")
            .validate(validators::git_remote),
        Property::new("makefile")
            .description("platform: drush makefile to use for building the platform if it doesn't already exist.")
            .validate(validators::makefile),
        Property::new("make_working_copy")
            .description("platform: Specifiy TRUE to build the platform with the make working copy option.")
            .default_value("false")
            .validate(validators::boolean),
        Property::new("document_root")
            .description("platform: Relative path to the exposed document root in your source code. Leave blank if docroot is the root."),
        Property::new("composer_install_command")
            .description("platform: The command to run to install composer dependencies.")
            .default_value(DEFAULT_COMPOSER_INSTALL),
    ]
}

/// `root/document_root`, or `root` alone when no document root is set.
pub(crate) fn document_root_full(root: &str, document_root: Option<&str>) -> String {
    match document_root.map(|d| d.trim_matches('/')).filter(|d| !d.is_empty()) {
        Some(document_root) => Path::new(root).join(document_root).display().to_string(),
        None => root.to_string(),
    }
}

/// Clone or build the code base when it is missing, then confirm it exists.
pub(super) fn verify(context: &Context, env: &BTreeMap<String, String>) -> Vec<Step> {
    let mut steps = Vec::new();
    let root = context.get_property("root").map(PathBuf::from);

    if let (Some(git_url), Some(root)) = (context.get_property("git_url"), root.clone()) {
        let request = CommandRequest::new(format!(
            "git clone {} {}",
            quote(git_url),
            quote(&root.display().to_string())
        ))
        .with_envs(env);

        steps.push(
            Step::new("platform.git")
                .start(format!("Cloning git repository {git_url} to {}...", root.display()))
                .failure("Unable to clone the platform repository.")
                .execute(move |step_env| {
                    if root.exists() {
                        step_env.reporter.success("Files already exist.");
                        return Ok(0);
                    }
                    step_env.runner.run_checked(&request)?;
                    step_env.reporter.success("Repository cloned.");
                    Ok(0)
                }),
        );
    }

    if let (Some(makefile), Some(root)) = (context.get_property("makefile"), root.clone()) {
        let target = PathBuf::from(
            context
                .get_property("document_root_full")
                .map(str::to_string)
                .unwrap_or_else(|| root.display().to_string()),
        );
        let mut command = format!(
            "drush make {} {}",
            quote(makefile),
            quote(&target.display().to_string())
        );
        if validators::is_true(context.get_property("make_working_copy")) {
            command.push_str(" --working-copy --no-gitinfofile --no-gitprojectinfo");
        }
        let request = CommandRequest::new(command).with_envs(env);

        steps.push(
            Step::new("platform.make")
                .start(format!("Building platform from makefile {makefile}..."))
                .failure("Unable to build the platform from its makefile.")
                .execute(move |step_env| {
                    if target.exists() {
                        step_env.reporter.success("Files already exist.");
                        return Ok(0);
                    }
                    step_env.runner.run_checked(&request)?;
                    Ok(0)
                }),
        );
    }

    steps.push(
        Step::new("platform.found")
            .start("Checking for platform files...")
            .success("Platform files found.")
            .failure("The path specified as \"root\" does not exist. Set a git_url or makefile to build it, or create the files yourself.")
            .execute(move |_| {
                match root {
                    Some(root) if root.exists() => Ok(0),
                    _ => Ok(1),
                }
            }),
    );

    steps
}
