//! Error kinds surfaced by the provisioning core.
//!
//! Configuration and assembly failures are fatal to the current command and
//! carry enough detail for a single top-level report. Failures inside step
//! bodies are `StepError`s and never escape a pipeline run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{ContextType, Phase};

/// Result alias for fallible core operations.
pub type Result<T, E = ProvisionError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(
        "There is an error with the configuration for {context_type} '{context}'. Check the file {} and try again.\n\nError: property '{property}' is required",
        file.display()
    )]
    MissingRequiredProperty {
        property: String,
        context: String,
        context_type: ContextType,
        file: PathBuf,
    },

    #[error(
        "There is an error with the configuration for {context_type} '{context}'. Check the file {} and try again.\n\nError: invalid value for '{property}': {reason}",
        file.display()
    )]
    InvalidProperty {
        property: String,
        context: String,
        context_type: ContextType,
        file: PathBuf,
        reason: String,
    },

    #[error("No service with name '{name}' was found.")]
    UnknownService { name: String },

    #[error("No service type '{service_type}' was found for service '{service}'.")]
    UnknownServiceType { service: String, service_type: String },

    #[error("Service '{service}' cannot be subscribed to by {context_type} contexts.")]
    ServiceNotAllowed {
        service: String,
        context_type: ContextType,
    },

    #[error(
        "The {context_type} '{context}' requires the '{service}' service, but no reachable server provides it."
    )]
    UnsatisfiedServiceRequirement {
        context: String,
        context_type: ContextType,
        service: String,
    },

    #[error("Context not found with name: {name}")]
    ContextNotFound { name: String },

    #[error("Context name must not be empty.")]
    EmptyContextName,

    #[error("Context '{name}' is a {actual}, expected a {expected}.")]
    WrongContextType {
        name: String,
        expected: ContextType,
        actual: ContextType,
    },

    #[error(
        "Some services did not verify for '{context}' (failed during {phase}, step '{step}'). Check your configuration, or run with the verbose option (-v) for more information."
    )]
    VerificationFailed {
        context: String,
        phase: Phase,
        step: String,
    },

    #[error("Failed to read context configuration {}: {message}", file.display())]
    Config { file: PathBuf, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProvisionError {
    /// True for errors raised before any pipeline is built.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ProvisionError::MissingRequiredProperty { .. }
                | ProvisionError::InvalidProperty { .. }
                | ProvisionError::Config { .. }
        )
    }

    /// True for errors raised while assembling a pipeline.
    pub fn is_assembly_error(&self) -> bool {
        matches!(
            self,
            ProvisionError::UnknownService { .. }
                | ProvisionError::UnknownServiceType { .. }
                | ProvisionError::ServiceNotAllowed { .. }
                | ProvisionError::UnsatisfiedServiceRequirement { .. }
                | ProvisionError::ContextNotFound { .. }
        )
    }
}

/// Resolution failure for a single property, before owner context is known.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("property '{name}' is required")]
    MissingRequired { name: String },

    #[error("invalid value for '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

impl PropertyError {
    pub fn name(&self) -> &str {
        match self {
            PropertyError::MissingRequired { name } | PropertyError::Invalid { name, .. } => name,
        }
    }
}

/// Execution-time failure of one step body.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step returned exit status {0}")]
    Status(i32),

    #[error("command `{command}` exited with status {status}: {output}")]
    Command {
        command: String,
        status: i32,
        output: String,
    },

    #[error("timed out after {}s waiting for {what}", waited.as_secs())]
    Timeout { what: String, waited: Duration },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StepError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_property_names_context_and_file() {
        let err = ProvisionError::MissingRequiredProperty {
            property: "uri".to_string(),
            context: "example".to_string(),
            context_type: ContextType::Site,
            file: PathBuf::from("/contexts/site.example.toml"),
        };
        let message = err.to_string();
        assert!(message.contains("site 'example'"));
        assert!(message.contains("/contexts/site.example.toml"));
        assert!(message.contains("'uri'"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn unsatisfied_requirement_is_assembly_error() {
        let err = ProvisionError::UnsatisfiedServiceRequirement {
            context: "s".to_string(),
            context_type: ContextType::Site,
            service: "db".to_string(),
        };
        assert!(err.is_assembly_error());
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn timeout_is_a_step_error() {
        let err = StepError::Timeout {
            what: "database container".to_string(),
            waited: Duration::from_secs(30),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timed out after 30s waiting for database container");
    }
}
