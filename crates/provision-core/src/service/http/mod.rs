//! The `http` service: web servers serving platforms and sites.

pub mod apache;
pub mod nginx;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::property::{Property, validators};
use crate::render::TemplateVars;
use crate::service::{PhaseHooks, ServiceBinding, ServiceDefinition};
use crate::step::Step;
use crate::types::{ContextType, Phase};

pub use apache::ApacheService;
pub use nginx::NginxService;

pub const SERVICE: &str = "http";

pub fn definition() -> ServiceDefinition {
    ServiceDefinition {
        name: SERVICE,
        friendly_name: "Web Server",
        allowed_contexts: &[ContextType::Platform, ContextType::Site],
        subscription_properties: no_subscription_properties,
    }
}

fn no_subscription_properties(_: ContextType) -> Vec<Property> {
    Vec::new()
}

/// Server properties shared by every web server type.
pub fn server_properties() -> Vec<Property> {
    vec![
        Property::new("http_port")
            .description("The port which the web service is running on.")
            .default_value("80")
            .required(true)
            .validate(validators::port),
        Property::new("web_group")
            .description("Web server group.")
            .default_value("www-data")
            .required(true),
        Property::new("restart_command")
            .description("The command to reload the web server configuration."),
    ]
}

/// What differs between web server types when writing configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Flavor {
    pub type_name: &'static str,
    pub label: &'static str,
    /// Renders the alias list into the site template.
    pub aliases: fn(&[&str]) -> String,
    /// Renders a redirect to the given target.
    pub redirect: fn(&str) -> String,
    /// Service properties passed through to the site template.
    pub site_vars: &'static [&'static str],
}

impl Flavor {
    fn config_dir(&self, server_config_path: &Path) -> PathBuf {
        server_config_path.join(self.type_name)
    }

    fn template(&self, kind: &str) -> String {
        format!("{}/{}", self.type_name, kind)
    }
}

/// Hooks common to every web server type.
pub(crate) fn hooks(flavor: Flavor) -> PhaseHooks {
    PhaseHooks::new()
        .on(Phase::Verify, ContextType::Server, move |b| {
            Ok(vec![server_config_step(flavor, b)?])
        })
        .on(Phase::Verify, ContextType::Platform, move |b| {
            Ok(vec![platform_config_step(flavor, b)?])
        })
        .on(Phase::Verify, ContextType::Site, move |b| {
            Ok(vec![site_config_step(flavor, b)?])
        })
        .on_each(Phase::PostVerify, &ContextType::ALL, restart_steps)
}

fn server_config_step(flavor: Flavor, binding: &ServiceBinding) -> anyhow::Result<Step> {
    let config_path = binding.server_config_path()?;
    let config_dir = flavor.config_dir(&config_path);
    let target = config_path.join(format!("{}.conf", flavor.type_name));
    let template = flavor.template("server");

    let mut vars = TemplateVars::new();
    vars.insert("server_name".into(), binding.server.name.clone());
    vars.insert(
        "http_port".into(),
        binding.require_service_property("http_port")?.to_string(),
    );
    vars.insert(
        "server_config_path".into(),
        config_path.display().to_string(),
    );

    Ok(Step::new("http.server.configuration")
        .start(format!("Writing {} server configuration...", flavor.label))
        .success(format!("Wrote {}", target.display()))
        .failure(format!("Unable to write {} server configuration.", flavor.label))
        .execute(move |env| {
            for dir in ["platform.d", "vhost.d"] {
                let dir = config_dir.join(dir);
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let contents = env.renderer.render(&template, &vars)?;
            write_config(&target, &contents)?;
            Ok(0)
        }))
}

fn platform_config_step(flavor: Flavor, binding: &ServiceBinding) -> anyhow::Result<Step> {
    let config_dir = flavor.config_dir(&binding.server_config_path()?);
    let target = config_dir
        .join("platform.d")
        .join(format!("{}.conf", binding.context.name));
    let template = flavor.template("platform");

    let mut vars = TemplateVars::new();
    vars.insert("platform_name".into(), binding.context.name.clone());
    vars.insert("document_root".into(), document_root(binding)?);

    Ok(Step::new("http.platform.configuration")
        .start(format!("Writing {} platform configuration...", flavor.label))
        .success(format!("Wrote {}", target.display()))
        .failure(format!(
            "Unable to write {} platform configuration.",
            flavor.label
        ))
        .execute(move |env| {
            let contents = env.renderer.render(&template, &vars)?;
            write_config(&target, &contents)?;
            Ok(0)
        }))
}

fn site_config_step(flavor: Flavor, binding: &ServiceBinding) -> anyhow::Result<Step> {
    let site = &binding.context;
    let uri = site.require("uri")?.to_string();
    let config_dir = flavor.config_dir(&binding.server_config_path()?);
    let target = config_dir.join("vhost.d").join(&uri);
    let template = flavor.template("site");

    let aliases = site.property("aliases").map(split_list).unwrap_or_default();
    let extra = site
        .property("redirection")
        .map(flavor.redirect)
        .unwrap_or_default();

    let mut vars = TemplateVars::new();
    vars.insert("site_name".into(), site.name.clone());
    vars.insert("uri".into(), uri);
    vars.insert(
        "http_port".into(),
        binding.require_service_property("http_port")?.to_string(),
    );
    vars.insert("server_aliases".into(), (flavor.aliases)(&aliases));
    vars.insert("document_root".into(), document_root(binding)?);
    vars.insert("extra".into(), extra);
    for name in flavor.site_vars {
        vars.insert(
            name.to_string(),
            binding.require_service_property(name)?.to_string(),
        );
    }

    Ok(Step::new("http.site.configuration")
        .start(format!("Writing {} site configuration...", flavor.label))
        .success(format!("Wrote {}", target.display()))
        .failure(format!("Unable to write {} site configuration.", flavor.label))
        .execute(move |env| {
            let contents = env.renderer.render(&template, &vars)?;
            write_config(&target, &contents)?;
            Ok(0)
        }))
}

fn restart_steps(binding: &ServiceBinding) -> anyhow::Result<Vec<Step>> {
    let Some(command) = binding.service_property("restart_command") else {
        return Ok(Vec::new());
    };
    let request = binding.command(command);

    Ok(vec![
        Step::new("http.restart")
            .start("Restarting web server...")
            .success("Web server restarted.")
            .failure("Unable to restart the web server.")
            .execute(move |env| {
                env.runner.run_checked(&request)?;
                Ok(0)
            }),
    ])
}

fn document_root(binding: &ServiceBinding) -> anyhow::Result<String> {
    let context = &binding.context;
    context
        .property("document_root_full")
        .or_else(|| context.property("root"))
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "{} '{}' has no document root",
                context.context_type,
                context.name
            )
        })
}

/// Split a comma or whitespace separated list.
pub(crate) fn split_list(value: &str) -> Vec<&str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

fn write_config(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{binding, snapshot};

    #[test]
    fn splits_alias_lists() {
        assert_eq!(
            split_list("www.example.com, example.net  example.org"),
            vec!["www.example.com", "example.net", "example.org"]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn restart_step_only_when_command_set() {
        let server = snapshot("master", ContextType::Server, &[("server_config_path", "/tmp/x")]);
        let without = binding("http", "apache", server.clone(), server.clone(), &[], &[]);
        assert!(restart_steps(&without).unwrap().is_empty());

        let with = binding(
            "http",
            "apache",
            server.clone(),
            server,
            &[("restart_command", "apachectl graceful")],
            &[],
        );
        let steps = restart_steps(&with).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].title(), "http.restart");
    }

    #[test]
    fn site_step_requires_uri() {
        let site = snapshot("example", ContextType::Site, &[("root", "/var/aegir/d10")]);
        let server = snapshot("master", ContextType::Server, &[("server_config_path", "/tmp/x")]);
        let b = binding("http", "apache", site, server, &[("http_port", "80")], &[]);
        let err = site_config_step(apache::FLAVOR, &b).unwrap_err();
        assert!(err.to_string().contains("uri"));
    }
}
