//! Provision Core Library
//!
//! Models servers, platforms and sites ("contexts"), the services attached
//! to them, and the step pipeline that verifies and installs them.

pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod inventory;
pub mod process;
pub mod property;
pub mod render;
pub mod service;
pub mod step;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Application
    pub use crate::app::AppContext;
    pub use crate::commands::{
        CommandEnv, DeleteCommand, DeleteOptions, InstallCommand, InstallOptions, ListCommand,
        SaveCommand, SaveOptions, ServicesCommand, ServicesOptions, ServicesReport, VerifyCommand,
        VerifyOptions,
    };

    // Configuration
    pub use crate::config::{
        ContextRecord, ContextStore, ProvisionConfig, ServiceRecord, Settings,
        SubscriptionRecord, TomlContextStore,
    };

    // Contexts and services
    pub use crate::context::{Attachments, Context, assemble_install, assemble_verify};
    pub use crate::inventory::Inventory;
    pub use crate::service::{ServiceBinding, ServiceDefinition, ServiceRegistry, ServiceType};

    // Pipeline
    pub use crate::step::{
        MessageKind, PipelineReport, Reporter, Step, StepEnv, StepPipeline, StepStatus,
        TracingReporter,
    };

    // Collaborators
    pub use crate::process::{CommandOutput, CommandRequest, ProcessRunner, ShellRunner};
    pub use crate::render::{BuiltinTemplates, TemplateRenderer};

    // Errors and core types
    pub use crate::error::{PropertyError, ProvisionError, Result, StepError};
    pub use crate::property::Property;
    pub use crate::types::{ContextType, Phase, Role};
}
