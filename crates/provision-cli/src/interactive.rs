//! Interactive flow for the save command.
//!
//! Prompts for the context type, required properties and service
//! subscriptions that were not given on the command line.

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use provision_core::commands::SaveOptions;
use provision_core::config::Settings;
use provision_core::context::property_definitions;
use provision_core::property::Property;
use provision_core::types::ContextType;

/// Outcome of the interactive flow.
#[derive(Debug, Clone)]
pub struct InteractiveResult {
    pub options: SaveOptions,
    pub confirmed: bool,
}

pub struct InteractiveFlow<'a, W: Write = io::Stdout> {
    settings: &'a Settings,
    /// Servers offering each service, by service name
    providers: BTreeMap<String, Vec<String>>,
    /// Type of the saved context, when `name` already exists
    existing: Option<ContextType>,
    yes: bool,
    writer: W,
    theme: ColorfulTheme,
}

impl<'a> InteractiveFlow<'a, io::Stdout> {
    pub fn new(
        settings: &'a Settings,
        providers: BTreeMap<String, Vec<String>>,
        existing: Option<ContextType>,
        yes: bool,
    ) -> Self {
        Self {
            settings,
            providers,
            existing,
            yes,
            writer: io::stdout(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> InteractiveFlow<'_, W> {
    /// Fill in whatever `prefilled` lacks and ask for confirmation.
    pub fn collect(&mut self, prefilled: SaveOptions) -> Result<InteractiveResult> {
        writeln!(
            self.writer,
            "{}",
            style(format!("Saving context '{}'", prefilled.name)).bold()
        )?;

        let mut options = prefilled;
        let context_type = match options.context_type.or(self.existing) {
            Some(context_type) => context_type,
            None => self.prompt_type()?,
        };
        options.context_type = Some(context_type);

        // Updates only prompt for what is being created.
        if self.existing.is_none() {
            let definitions = property_definitions(context_type, &options.name, self.settings);
            for property in missing_properties(&definitions, &options.properties) {
                let value = self.prompt_property(property)?;
                options.properties.insert(property.name().to_string(), value);
            }
        }

        for service in missing_subscriptions(context_type, &options) {
            if let Some(server) = self.prompt_server(service)? {
                options = options.subscription(service, server);
            }
        }

        self.print_summary(&options)?;
        let confirmed = self.yes
            || Confirm::with_theme(&self.theme)
                .with_prompt("Save this context?")
                .default(true)
                .interact()?;

        Ok(InteractiveResult { options, confirmed })
    }

    fn prompt_type(&self) -> Result<ContextType> {
        let labels: Vec<_> = ContextType::ALL.iter().map(|t| t.label()).collect();
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Context type")
            .items(&labels)
            .default(0)
            .interact()?;
        Ok(ContextType::ALL[selection])
    }

    fn prompt_property(&self, property: &Property) -> Result<String> {
        let prompt = if property.describe().is_empty() {
            property.name().to_string()
        } else {
            format!("{} ({})", property.name(), property.describe())
        };
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                property
                    .resolve(Some(input.as_str()))
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .interact_text()?;
        Ok(value)
    }

    fn prompt_server(&mut self, service: &str) -> Result<Option<String>> {
        let servers = self.providers.get(service).cloned().unwrap_or_default();
        match servers.as_slice() {
            [] => {
                writeln!(
                    self.writer,
                    "  {} No saved server provides '{}'. Save one first.",
                    style("⚠").yellow(),
                    service
                )?;
                Ok(None)
            }
            [only] => {
                writeln!(self.writer, "  Using server '{only}' for '{service}'.")?;
                Ok(Some(only.clone()))
            }
            _ => {
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(format!("Server for '{service}'"))
                    .items(&servers)
                    .default(0)
                    .interact()?;
                Ok(Some(servers[selection].clone()))
            }
        }
    }

    fn print_summary(&mut self, options: &SaveOptions) -> Result<()> {
        writeln!(self.writer)?;
        if let Some(context_type) = options.context_type {
            writeln!(self.writer, "  Type: {}", context_type.label())?;
        }
        for (name, value) in &options.properties {
            writeln!(self.writer, "  {name}: {value}")?;
        }
        for service in &options.services {
            writeln!(
                self.writer,
                "  Service: {} ({})",
                service.service, service.service_type
            )?;
        }
        for subscription in &options.subscriptions {
            writeln!(
                self.writer,
                "  Subscription: {} on {}",
                subscription.service, subscription.server
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Required properties with no default that the options leave unset.
pub fn missing_properties<'p>(
    definitions: &'p [Property],
    provided: &BTreeMap<String, String>,
) -> Vec<&'p Property> {
    definitions
        .iter()
        .filter(|p| p.is_required() && !p.is_hidden() && !p.has_default())
        .filter(|p| {
            provided
                .get(p.name())
                .is_none_or(|value| value.trim().is_empty())
        })
        .collect()
}

/// Services the context type requires that have no subscription yet.
pub fn missing_subscriptions(
    context_type: ContextType,
    options: &SaveOptions,
) -> Vec<&'static str> {
    context_type
        .service_requirements()
        .iter()
        .copied()
        .filter(|service| !options.subscriptions.iter().any(|s| s.service == *service))
        .collect()
}
