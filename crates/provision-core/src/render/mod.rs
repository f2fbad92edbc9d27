//! Template rendering for service configuration files.
//!
//! Services render web-server configuration from inside their step bodies.
//! The built-in renderer substitutes `{{ name }}` placeholders; an unknown
//! placeholder is an error so half-rendered files are never written.

mod templates;

use std::collections::BTreeMap;
use std::fmt::Debug;

pub type TemplateVars = BTreeMap<String, String>;

pub trait TemplateRenderer: Debug + Send + Sync {
    fn render(&self, template_id: &str, vars: &TemplateVars) -> anyhow::Result<String>;
}

/// Renderer backed by the templates compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTemplates {
    overrides: BTreeMap<String, String>,
}

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace or add a template by id.
    pub fn with_template(mut self, id: impl Into<String>, body: impl Into<String>) -> Self {
        self.overrides.insert(id.into(), body.into());
        self
    }

    fn template(&self, id: &str) -> Option<&str> {
        self.overrides
            .get(id)
            .map(String::as_str)
            .or_else(|| templates::builtin(id))
    }
}

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, template_id: &str, vars: &TemplateVars) -> anyhow::Result<String> {
        let template = self
            .template(template_id)
            .ok_or_else(|| anyhow::anyhow!("No template with id '{}'", template_id))?;
        substitute(template_id, template, vars)
    }
}

fn substitute(template_id: &str, template: &str, vars: &TemplateVars) -> anyhow::Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| anyhow::anyhow!("Unclosed placeholder in template '{}'", template_id))?;
        let key = after[..end].trim();
        let value = vars.get(key).ok_or_else(|| {
            anyhow::anyhow!(
                "Template '{}' references unknown variable '{}'",
                template_id,
                key
            )
        })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_placeholders() {
        let renderer = BuiltinTemplates::new().with_template("t", "Listen {{ port }}\n{{name}}!");
        let out = renderer
            .render("t", &vars(&[("port", "80"), ("name", "web")]))
            .unwrap();
        assert_eq!(out, "Listen 80\nweb!");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let renderer = BuiltinTemplates::new().with_template("t", "{{ missing }}");
        let err = renderer.render("t", &TemplateVars::new()).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let renderer = BuiltinTemplates::new();
        assert!(renderer.render("nope/site", &TemplateVars::new()).is_err());
    }

    #[test]
    fn builtin_site_templates_render() {
        let renderer = BuiltinTemplates::new();
        let v = vars(&[
            ("http_port", "80"),
            ("uri", "example.com"),
            ("server_aliases", ""),
            ("document_root", "/var/aegir/d10/web"),
            ("site_name", "example"),
            ("extra", ""),
            ("php_sock_location", "/run/php/php-fpm.sock"),
        ]);
        let apache = renderer.render("apache/site", &v).unwrap();
        assert!(apache.contains("ServerName example.com"));
        let nginx = renderer.render("nginx/site", &v).unwrap();
        assert!(nginx.contains("server_name example.com"));
        assert!(nginx.contains("/run/php/php-fpm.sock"));
    }
}
