//! TOML parser with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::schema::{ContextRecord, ProvisionConfig};

/// Parse provision.toml with detailed error messages
pub fn parse_provision_toml(path: &Path) -> Result<ProvisionConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ProvisionConfig = toml::from_str(&content)
        .map_err(|e| enhance_toml_error(e, &content))
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;

    Ok(config)
}

/// Parse a context record file
pub fn parse_context_toml(path: &Path) -> Result<ContextRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file: {}", path.display()))?;

    parse_context_toml_str(&content)
        .with_context(|| format!("Failed to parse context file: {}", path.display()))
}

/// Parse a context record from string
pub fn parse_context_toml_str(content: &str) -> Result<ContextRecord> {
    let record: ContextRecord =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;
    record.validate()?;
    Ok(record)
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error_msg
        .lines()
        .find(|line| line.contains("line "))
        .and_then(|line| {
            line.split("line ")
                .nth(1)
                .and_then(|s| s.split(|c: char| !c.is_ascii_digit()).next())
                .and_then(|s| s.parse::<usize>().ok())
        });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 1).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a record or settings to a TOML string
pub fn to_toml<T: Serialize>(value: &T) -> Result<String> {
    toml::to_string_pretty(value).with_context(|| "Failed to serialize configuration to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContextType;

    #[test]
    fn test_parse_server_record() {
        let toml = r#"
name = "server_master"
type = "server"

[properties]
remote_host = "localhost"

[services.http]
type = "apache"

[services.http.properties]
http_port = "80"

[services.db]
type = "mysql"
"#;

        let record = parse_context_toml_str(toml).unwrap();
        assert_eq!(record.context_type, ContextType::Server);
        assert_eq!(record.properties["remote_host"], "localhost");
        assert_eq!(
            record.services.keys().collect::<Vec<_>>(),
            vec!["http", "db"]
        );
        assert_eq!(record.services["http"].properties["http_port"], "80");
    }

    #[test]
    fn test_parse_site_record() {
        let toml = r#"
name = "example"
type = "site"

[properties]
uri = "example.com"
platform = "d10"

[service_subscriptions.db]
server = "server_master"

[service_subscriptions.db.properties]
db_name = "db_name_1"
"#;

        let record = parse_context_toml_str(toml).unwrap();
        assert_eq!(record.service_subscriptions["db"].server, "server_master");
        assert_eq!(
            record.service_subscriptions["db"].properties["db_name"],
            "db_name_1"
        );
    }

    #[test]
    fn test_parse_invalid_toml_points_at_line() {
        let toml = "name = \"x\"\ntype = \"site\"\n[properties\nuri = \"a\"\n";
        let err = parse_context_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"));
    }

    #[test]
    fn test_rejects_server_with_subscriptions() {
        let toml = r#"
name = "master"
type = "server"

[service_subscriptions.db]
server = "other"
"#;
        assert!(parse_context_toml_str(toml).is_err());
    }

    #[test]
    fn test_round_trip_preserves_service_order() {
        let mut record = ContextRecord::new("master", ContextType::Server);
        record.services.insert(
            "db".to_string(),
            crate::config::ServiceRecord {
                service_type: "mysql".to_string(),
                properties: Default::default(),
            },
        );
        record.services.insert(
            "http".to_string(),
            crate::config::ServiceRecord {
                service_type: "nginx".to_string(),
                properties: Default::default(),
            },
        );

        let text = to_toml(&record).unwrap();
        let parsed = parse_context_toml_str(&text).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.services.keys().collect::<Vec<_>>(), vec!["db", "http"]);
    }
}
