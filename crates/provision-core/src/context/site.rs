//! Site contexts: one Drupal site on a platform.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::Settings;
use crate::process::{CommandRequest, quote};
use crate::property::{Property, validators};
use crate::service::ServiceBinding;
use crate::step::Step;

use super::{Context, platform};

pub(super) fn properties(settings: &Settings) -> Vec<Property> {
    let mut properties = vec![
        Property::new("uri")
            .description("site: example.com URI, no http:// or trailing /")
            .required(true),
        Property::new("aliases")
            .description("site: comma-separated URIs"),
        Property::new("redirection")
            .description("site: URL that every request to this site is redirected to"),
        Property::new("https_enabled")
            .description("site: whether or not HTTPS is enabled")
            .default_value("false")
            .validate(validators::boolean),
        Property::new("http_basic_auth_username")
            .description("site: username for HTTP basic authentication"),
        Property::new("http_basic_auth_password")
            .description("site: password for HTTP basic authentication"),
        Property::new("http_basic_auth_message")
            .description("site: message to show on HTTP basic authentication prompt"),
        Property::new("http_basic_auth_whitelist")
            .description("site: list of IPs that don't need to authenticate"),
        Property::new("platform")
            .description("site: the platform this site runs on")
            .required(true),
        Property::new("language")
            .description("site: site language; default en")
            .default_value("en"),
        Property::new("profile")
            .description("site: Drupal profile to use; default standard")
            .default_value("standard"),
        Property::new("site_path")
            .description("site: The site configuration path (sites/domain.com). If left empty, will be generated automatically."),
    ];
    properties.extend(platform::properties(settings, false));
    properties
}

/// Default `site_path` for a site without one.
pub(super) fn default_site_path(uri: &str) -> String {
    format!("sites/{uri}")
}

pub(super) fn verify(context: &Context, env: &BTreeMap<String, String>) -> Vec<Step> {
    let mut steps = platform::verify(context, env);

    if let Some(root) = context.get_property("root") {
        let root = PathBuf::from(root);
        let command = context
            .get_property("composer_install_command")
            .unwrap_or(platform::DEFAULT_COMPOSER_INSTALL)
            .to_string();
        let request = CommandRequest::new(command.clone())
            .in_dir(&root)
            .with_envs(env);

        steps.push(
            Step::new("composer.install")
                .start(format!("Running {command} in {} ...", root.display()))
                .failure("Composer install command failed.")
                .execute(move |step_env| {
                    if !root.join("composer.json").is_file() {
                        step_env.reporter.info("No composer.json found.");
                        return Ok(0);
                    }
                    step_env.runner.run_checked(&request)?;
                    Ok(0)
                }),
        );
    }

    let docroot = context.get_property("document_root_full").map(PathBuf::from);
    let site_path = context
        .get_property("site_path")
        .map(str::to_string)
        .or_else(|| context.get_property("uri").map(default_site_path));

    steps.push(
        Step::new("site.prepare")
            .start("Preparing Drupal site configuration...")
            .success("Site configuration directories are ready.")
            .failure("Unable to prepare the site directory.")
            .execute(move |_| {
                let (Some(docroot), Some(site_path)) = (docroot, site_path) else {
                    return Err(anyhow::anyhow!("Site has no document root or site path").into());
                };
                prepare_site_dir(&docroot.join(site_path), &docroot)?;
                Ok(0)
            }),
    );

    steps
}

/// Create the site directory and its writable subdirectories, and seed
/// `settings.php` from the shipped default.
fn prepare_site_dir(site_dir: &Path, docroot: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(site_dir)
        .with_context(|| format!("Failed to create {}", site_dir.display()))?;

    for (dir, mode) in [
        ("themes", 0o2775),
        ("modules", 0o2775),
        ("libraries", 0o2775),
        ("files", 0o2770),
    ] {
        let path = site_dir.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        set_mode(&path, mode)?;
    }

    let settings = site_dir.join("settings.php");
    let default_settings = docroot.join("sites/default/default.settings.php");
    if !settings.exists() && default_settings.is_file() {
        fs::copy(&default_settings, &settings).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                default_settings.display(),
                settings.display()
            )
        })?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> anyhow::Result<()> {
    Ok(())
}

/// The `site.install` step: run `drush site-install` against the site's
/// database subscription.
pub(super) fn install(
    context: &Context,
    db: &ServiceBinding,
    env: &BTreeMap<String, String>,
) -> anyhow::Result<Step> {
    let root = PathBuf::from(
        context
            .get_property("root")
            .ok_or_else(|| anyhow::anyhow!("Site '{}' has no root", context.name()))?,
    );
    let docroot = context
        .get_property("document_root_full")
        .map(str::to_string)
        .unwrap_or_else(|| root.display().to_string());
    let profile = context.get_property("profile").unwrap_or("standard").to_string();
    let site_path = context
        .get_property("site_path")
        .map(str::to_string)
        .unwrap_or_else(|| default_site_path(context.get_property("uri").unwrap_or_default()));
    let subdir = site_path
        .strip_prefix("sites/")
        .unwrap_or(&site_path)
        .to_string();

    let db_url = format!(
        "mysql://{}:{}@{}:{}/{}",
        db.require_subscription_property("db_user")?,
        db.require_subscription_property("db_password")?,
        db.server.require("remote_host")?,
        db.service_property("db_port").unwrap_or("3306"),
        db.require_subscription_property("db_name")?,
    );
    let env = env.clone();

    Ok(Step::new("site.install")
        .start(format!("Installing Drupal with the '{profile}' profile..."))
        .success("Drupal site installed successfully.")
        .failure("Unable to install Drupal.")
        .execute(move |step_env| {
            let drush = find_drush(&root)?;
            let command = format!(
                "{} site-install {} --db-url={} --root={} --sites-subdir={} -y",
                quote(&drush.display().to_string()),
                quote(&profile),
                quote(&db_url),
                quote(&docroot),
                quote(&subdir),
            );
            let request = CommandRequest::new(command).in_dir(&root).with_envs(&env);
            step_env.runner.run_checked(&request)?;
            Ok(0)
        }))
}

fn find_drush(root: &Path) -> anyhow::Result<PathBuf> {
    ["bin/drush", "vendor/bin/drush"]
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Could not find drush in {}/bin or {}/vendor/bin. Add drush to the platform's composer.json.",
                root.display(),
                root.display()
            )
        })
}
