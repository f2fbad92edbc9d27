//! Shared core types used across contexts, services and the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of infrastructure unit a context describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// A host offering services.
    Server,
    /// A code base served by a web server.
    Platform,
    /// A single site running on a platform.
    Site,
}

impl ContextType {
    pub const ALL: [ContextType; 3] = [ContextType::Server, ContextType::Platform, ContextType::Site];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Server => "server",
            ContextType::Platform => "platform",
            ContextType::Site => "site",
        }
    }

    /// Human label used in prompts and listings.
    pub fn label(&self) -> &'static str {
        match self {
            ContextType::Server => "Server",
            ContextType::Platform => "Platform",
            ContextType::Site => "Site",
        }
    }

    /// Servers provide services; platforms and sites subscribe to them.
    pub fn role(&self) -> Role {
        match self {
            ContextType::Server => Role::Provider,
            ContextType::Platform | ContextType::Site => Role::Subscriber,
        }
    }

    /// Services that must be satisfied before a context of this type can be verified.
    pub fn service_requirements(&self) -> &'static [&'static str] {
        match self {
            ContextType::Server => &[],
            ContextType::Platform => &["http"],
            ContextType::Site => &["http", "db"],
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(ContextType::Server),
            "platform" => Ok(ContextType::Platform),
            "site" => Ok(ContextType::Site),
            other => anyhow::bail!(
                "Unknown context type: {}. Use 'server', 'platform' or 'site'",
                other
            ),
        }
    }
}

/// The role a service plays relative to the context holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Provider,
    Subscriber,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Provider => f.write_str("provider"),
            Role::Subscriber => f.write_str("subscriber"),
        }
    }
}

/// Pipeline phase a step is contributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    PreVerify,
    Verify,
    PostVerify,
    /// Steps appended by the install command after verification.
    Install,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreVerify => f.write_str("pre-verify"),
            Phase::Verify => f.write_str("verify"),
            Phase::PostVerify => f.write_str("post-verify"),
            Phase::Install => f.write_str("install"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_type_roles() {
        assert_eq!(ContextType::Server.role(), Role::Provider);
        assert_eq!(ContextType::Platform.role(), Role::Subscriber);
        assert_eq!(ContextType::Site.role(), Role::Subscriber);
    }

    #[test]
    fn context_type_parses_case_insensitively() {
        assert_eq!("Site".parse::<ContextType>().unwrap(), ContextType::Site);
        assert!("cluster".parse::<ContextType>().is_err());
    }

    #[test]
    fn site_requires_http_and_db() {
        assert_eq!(ContextType::Site.service_requirements(), &["http", "db"]);
        assert!(ContextType::Server.service_requirements().is_empty());
    }

    #[test]
    fn context_type_serializes_lowercase() {
        let json = serde_json::to_string(&ContextType::Platform).unwrap();
        assert_eq!(json, "\"platform\"");
    }
}
