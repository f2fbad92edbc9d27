//! Pipeline assembly for a context and its attached services.
//!
//! Order:
//! 1. the context's pre-verify steps, then each service's, in attachment order
//! 2. the context's verify steps, then per service a section marker followed
//!    by that service's steps
//! 3. post-verify steps of the context and every service, under one marker
//!
//! Assembly reads configuration and the filesystem but never writes.

use std::collections::BTreeMap;

use crate::error::{ProvisionError, Result};
use crate::service::{ServiceBinding, ServiceRegistry, db};
use crate::step::{Step, StepPipeline};
use crate::types::{ContextType, Phase};

use super::{Context, site};

/// Services bound to one context, plus the environment their commands get.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    pub bindings: Vec<ServiceBinding>,
    pub env: BTreeMap<String, String>,
}

impl Attachments {
    /// Compute the process environment for `context` and hand it to every
    /// binding.
    pub fn new(context: &Context, mut bindings: Vec<ServiceBinding>) -> Self {
        let env = process_env(context, &bindings);
        for binding in &mut bindings {
            binding.env = env.clone();
        }
        Self { bindings, env }
    }

    pub fn binding(&self, service: &str) -> Option<&ServiceBinding> {
        self.bindings.iter().find(|b| b.service == service)
    }
}

/// Environment variables describing the context and its servers.
pub fn process_env(context: &Context, bindings: &[ServiceBinding]) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("PROVISION_CONTEXT".to_string(), context.name().to_string());
    env.insert(
        "PROVISION_CONTEXT_CONFIG_FILE".to_string(),
        context.file().display().to_string(),
    );
    for binding in bindings {
        let key = format!("PROVISION_CONTEXT_SERVER_{}", binding.service.to_uppercase());
        if let Some(path) = binding.server.property("server_config_path") {
            env.insert(format!("{key}_CONFIG_PATH"), path.to_string());
        }
        env.insert(key, binding.server.name.clone());
    }
    env
}

/// Build the full verify pipeline for `context`.
pub fn assemble_verify(
    context: &Context,
    attachments: &Attachments,
    registry: &ServiceRegistry,
) -> Result<StepPipeline> {
    let context_type = context.context_type();
    let env = &attachments.env;
    let mut pipeline = StepPipeline::new();

    pipeline.extend_phase(Phase::PreVerify, context.pre_verify(env));
    for binding in &attachments.bindings {
        pipeline.extend_phase(
            Phase::PreVerify,
            service_steps(registry, binding, Phase::PreVerify, context_type)?,
        );
    }

    pipeline.extend_phase(Phase::Verify, context.verify(env));
    for binding in &attachments.bindings {
        let steps = service_steps(registry, binding, Phase::Verify, context_type)?;
        if steps.is_empty() {
            tracing::debug!(service = %binding.service, "Service contributes no verify steps");
            continue;
        }
        let friendly_name = registry.service(&binding.service)?.friendly_name;
        pipeline.add(
            Step::section(
                format!("logging.{}", binding.service),
                format!("Verify service: {friendly_name}"),
            )
            .in_phase(Phase::Verify),
        );
        pipeline.extend_phase(Phase::Verify, steps);
    }

    let mut post = context.post_verify(env);
    for binding in &attachments.bindings {
        post.extend(service_steps(registry, binding, Phase::PostVerify, context_type)?);
    }
    if !post.is_empty() {
        pipeline.add(
            Step::section(
                "logging.post",
                format!("Verify {}: Finalize", context_type.as_str()),
            )
            .in_phase(Phase::PostVerify),
        );
        pipeline.extend_phase(Phase::PostVerify, post);
    }

    tracing::debug!(
        context = context.name(),
        steps = pipeline.len(),
        "Assembled verify pipeline"
    );
    Ok(pipeline)
}

/// Build the install pipeline for a site: verification (unless skipped)
/// followed by the site install.
pub fn assemble_install(
    context: &Context,
    attachments: &Attachments,
    registry: &ServiceRegistry,
    skip_verify: bool,
) -> Result<StepPipeline> {
    if context.context_type() != ContextType::Site {
        return Err(ProvisionError::WrongContextType {
            name: context.name().to_string(),
            expected: ContextType::Site,
            actual: context.context_type(),
        });
    }

    let mut pipeline = if skip_verify {
        StepPipeline::new()
    } else {
        assemble_verify(context, attachments, registry)?
    };

    let db = attachments
        .binding(db::SERVICE)
        .ok_or_else(|| ProvisionError::UnsatisfiedServiceRequirement {
            context: context.name().to_string(),
            context_type: ContextType::Site,
            service: db::SERVICE.to_string(),
        })?;
    pipeline.add(site::install(context, db, &attachments.env)?.in_phase(Phase::Install));
    Ok(pipeline)
}

fn service_steps(
    registry: &ServiceRegistry,
    binding: &ServiceBinding,
    phase: Phase,
    context_type: ContextType,
) -> Result<Vec<Step>> {
    let service_type = registry.service_type(&binding.service, &binding.service_type)?;
    Ok(service_type.hooks().steps(phase, context_type, binding)?)
}
