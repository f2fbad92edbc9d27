//! Provision - server, platform and site provisioning
//!
//! Usage:
//!   provision save <name> --type server --service http=apache
//!   provision verify <name>
//!   provision install <site>
//!   provision list

mod interactive;
mod reporter;

use std::collections::BTreeMap;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use provision_core::app::AppContext;
use provision_core::commands::{
    CommandEnv, DeleteCommand, DeleteOptions, InstallCommand, InstallOptions, ListCommand,
    ListReport, PipelineOutcome, SaveCommand, SaveOptions, SaveReport, ServicesCommand,
    ServicesOptions, ServicesReport, VerifyCommand, VerifyOptions,
};
use provision_core::inventory::Inventory;
use provision_core::types::ContextType;

use crate::interactive::InteractiveFlow;
use crate::reporter::ConsoleReporter;

#[derive(Parser)]
#[command(name = "provision")]
#[command(about = "Provision servers, platforms and sites", long_about = None)]
struct Cli {
    /// Show debug logs and stream command output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a context and its services
    Verify {
        /// Context name
        name: String,
    },

    /// Install a site (verifies it first)
    Install {
        /// Site name
        name: String,
        /// Only run the install step
        #[arg(long)]
        skip_verify: bool,
    },

    /// Create or update a context
    #[command(alias = "context:save")]
    Save(Box<SaveArgs>),

    /// Delete a context's configuration
    #[command(alias = "context:delete", alias = "rm")]
    Delete {
        /// Context name
        name: String,
    },

    /// List saved contexts
    List {
        /// Only list contexts of this type (server, platform, site)
        #[arg(long = "type", short = 't')]
        context_type: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show available services, or the services of one context
    Services {
        /// Context name
        name: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct SaveArgs {
    /// Context name
    name: String,
    /// Context type (server, platform, site); required for new contexts
    #[arg(long = "type", short = 't')]
    context_type: Option<String>,
    /// Context property (KEY=VALUE)
    #[arg(long = "property", short = 'p', value_name = "KEY=VALUE")]
    properties: Vec<String>,
    /// Service a server provides (SERVICE=TYPE, e.g. http=nginx)
    #[arg(long = "service", value_name = "SERVICE=TYPE")]
    services: Vec<String>,
    /// Service subscription (SERVICE=SERVER, e.g. db=dbhost)
    #[arg(long = "subscribe", value_name = "SERVICE=SERVER")]
    subscriptions: Vec<String>,
    /// Property of a service or subscription (SERVICE.KEY=VALUE)
    #[arg(long = "service-property", value_name = "SERVICE.KEY=VALUE")]
    service_properties: Vec<String>,
    /// Interactive mode - prompts for missing options
    #[arg(short, long)]
    interactive: bool,
    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "provision=debug,info"
    } else {
        "provision=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run_cli(cli.command, cli.verbose)
}

fn run_cli(command: Commands, verbose: bool) -> Result<()> {
    let app = AppContext::with_defaults()?;
    tracing::debug!(
        contexts = %app.settings().contexts_path.display(),
        "Using contexts directory"
    );
    let store = app.context_store();
    let registry = app.registry();
    let runner = app.runner(verbose);
    let renderer = app.renderer();
    let env = CommandEnv::new(&store, &registry, app.settings(), &runner, &renderer);

    match command {
        Commands::Verify { name } => {
            let mut reporter = ConsoleReporter::new();
            let outcome = VerifyCommand::new(env).execute(&VerifyOptions::new(name), &mut reporter)?;
            print_outcome(&outcome);
        }
        Commands::Install { name, skip_verify } => {
            let mut reporter = ConsoleReporter::new();
            let options = InstallOptions::new(name).skip_verify(skip_verify);
            let outcome = InstallCommand::new(env).execute(&options, &mut reporter)?;
            print_outcome(&outcome);
        }
        Commands::Save(args) => run_save(env, *args)?,
        Commands::Delete { name } => {
            let report = DeleteCommand::new(env).execute(&DeleteOptions::new(name))?;
            if report.deleted {
                println!("✓ Deleted {} '{}'", report.context_type, report.name);
            } else {
                anyhow::bail!(
                    "Unable to delete the configuration of {} '{}'",
                    report.context_type,
                    report.name
                );
            }
        }
        Commands::List {
            context_type,
            format,
        } => {
            let filter = context_type.as_deref().map(str::parse::<ContextType>).transpose()?;
            let report = ListCommand::new(env).execute()?;
            match format {
                OutputFormat::Table => print_list_table(&report, filter),
                OutputFormat::Json => print_list_json(&report, filter)?,
            }
        }
        Commands::Services { name, format } => {
            let options = match name {
                Some(name) => ServicesOptions::context(name),
                None => ServicesOptions::available(),
            };
            let report = ServicesCommand::new(env).execute(&options)?;
            match format {
                OutputFormat::Table => print_services_table(&report),
                OutputFormat::Json => print_services_json(&report)?,
            }
        }
    }
    Ok(())
}

fn run_save(env: CommandEnv<'_>, args: SaveArgs) -> Result<()> {
    let mut options = save_options(&args)?;

    if args.interactive {
        let inventory = Inventory::load(env.store, env.registry, env.settings)?;
        let mut providers = BTreeMap::new();
        for service in env.registry.service_names() {
            providers.insert(service.to_string(), inventory.servers_providing(service)?);
        }
        let existing = inventory.find(&options.name);

        let mut flow = InteractiveFlow::new(env.settings, providers, existing, args.yes);
        let result = flow.collect(options)?;
        if !result.confirmed {
            println!("Cancelled.");
            return Ok(());
        }
        options = result.options;
    }

    let report = SaveCommand::new(env).execute(&options)?;
    print_save_result(&report);
    Ok(())
}

/// Build save options from the command line pairs.
fn save_options(args: &SaveArgs) -> Result<SaveOptions> {
    let mut options = SaveOptions::new(&args.name);
    if let Some(context_type) = &args.context_type {
        options = options.with_type(context_type.parse()?);
    }
    for pair in &args.properties {
        let (key, value) = split_pair(pair, '=')?;
        options = options.property(key, value);
    }
    for pair in &args.services {
        let (service, service_type) = split_pair(pair, '=')?;
        options = options.service(service, service_type);
    }
    for pair in &args.subscriptions {
        let (service, server) = split_pair(pair, '=')?;
        options = options.subscription(service, server);
    }

    for pair in &args.service_properties {
        let (qualified, value) = split_pair(pair, '=')?;
        let (service, key) = split_pair(qualified, '.')?;
        let mut applied = false;
        for option in options.services.iter_mut().filter(|o| o.service == service) {
            option.properties.insert(key.to_string(), value.to_string());
            applied = true;
        }
        for option in options.subscriptions.iter_mut().filter(|o| o.service == service) {
            option.properties.insert(key.to_string(), value.to_string());
            applied = true;
        }
        if !applied {
            anyhow::bail!(
                "Service '{}' is not given with --service or --subscribe",
                service
            );
        }
    }
    Ok(options)
}

/// Split `input` at the first `separator`; both halves must be non-empty.
fn split_pair(input: &str, separator: char) -> Result<(&str, &str)> {
    match input.split_once(separator) {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim(), value.trim()))
        }
        _ => anyhow::bail!("Expected KEY{}VALUE, got '{}'", separator, input),
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    let executed = outcome
        .report
        .records()
        .iter()
        .filter(|r| !r.title.starts_with("logging."))
        .count();
    println!(
        "\n{} {} '{}': {} steps",
        console::style("✓").green(),
        outcome.context_type.label(),
        outcome.name,
        executed
    );
    if outcome.saved {
        println!("  Saved generated values to the context configuration");
    }
}

fn print_save_result(report: &SaveReport) {
    if report.created {
        println!("✓ Created {} '{}'", report.context_type, report.name);
    } else {
        println!("✓ Updated {} '{}'", report.context_type, report.name);
    }
    println!("  {}", report.file.display());
    for (key, value) in &report.properties {
        println!("  {key}: {value}");
    }
}

fn print_list_table(report: &ListReport, filter: Option<ContextType>) {
    if report.entries.is_empty() {
        println!("No contexts saved.");
        println!("Add one with: provision save <name> --type <server|platform|site>");
        return;
    }

    println!("{:<24} {:<10} File", "Name", "Type");
    println!("{}", "-".repeat(70));
    for entry in report
        .entries
        .iter()
        .filter(|e| filter.is_none_or(|t| e.context_type == t))
    {
        println!(
            "{:<24} {:<10} {}",
            entry.name,
            entry.context_type,
            entry.file.display()
        );
    }
}

fn print_list_json(report: &ListReport, filter: Option<ContextType>) -> Result<()> {
    let output: Vec<_> = report
        .entries
        .iter()
        .filter(|e| filter.is_none_or(|t| e.context_type == t))
        .map(|e| {
            serde_json::json!({
                "name": e.name,
                "type": e.context_type.as_str(),
                "file": e.file.display().to_string(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_services_table(report: &ServicesReport) {
    match report {
        ServicesReport::Available(services) => {
            println!("{:<8} {:<20} {:<18} Types", "Service", "Name", "Contexts");
            println!("{}", "-".repeat(70));
            for service in services {
                let contexts: Vec<_> = service.allowed_contexts.iter().map(|t| t.as_str()).collect();
                let types: Vec<_> = service.types.iter().map(|(name, _)| name.as_str()).collect();
                println!(
                    "{:<8} {:<20} {:<18} {}",
                    service.name,
                    service.friendly_name,
                    contexts.join(", "),
                    types.join(", ")
                );
            }
        }
        ServicesReport::Attached {
            name,
            context_type,
            role,
            services,
        } => {
            println!("{} '{}' ({})", context_type.label(), name, role);
            if services.is_empty() {
                println!("  No services attached.");
                return;
            }
            for service in services {
                println!(
                    "  {} ({}): {} on {}",
                    service.friendly_name,
                    service.service,
                    service.service_type.as_deref().unwrap_or("-"),
                    service.server
                );
                for (key, value) in &service.properties {
                    println!("    {key}: {value}");
                }
            }
        }
    }
}

fn print_services_json(report: &ServicesReport) -> Result<()> {
    let output = match report {
        ServicesReport::Available(services) => serde_json::json!(services
            .iter()
            .map(|s| serde_json::json!({
                "name": s.name,
                "friendly_name": s.friendly_name,
                "contexts": s.allowed_contexts.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
                "types": s.types.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            }))
            .collect::<Vec<_>>()),
        ServicesReport::Attached {
            name,
            context_type,
            role,
            services,
        } => serde_json::json!({
            "name": name,
            "type": context_type.as_str(),
            "role": role.to_string(),
            "services": services
                .iter()
                .map(|s| serde_json::json!({
                    "service": s.service,
                    "type": s.service_type,
                    "server": s.server,
                    "properties": s.properties,
                }))
                .collect::<Vec<_>>(),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn save_args(args: &[&str]) -> SaveArgs {
        let mut argv = vec!["provision", "save"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Save(args) => *args,
            _ => panic!("expected save"),
        }
    }

    #[test]
    fn split_pair_requires_both_halves() {
        assert_eq!(split_pair("http=nginx", '=').unwrap(), ("http", "nginx"));
        assert_eq!(split_pair("uri=a=b", '=').unwrap(), ("uri", "a=b"));
        assert!(split_pair("http", '=').is_err());
        assert!(split_pair("=nginx", '=').is_err());
        assert!(split_pair("http=", '=').is_err());
    }

    #[test]
    fn save_builds_options_from_pairs() {
        let args = save_args(&[
            "shop",
            "--type",
            "site",
            "-p",
            "uri=shop.example.com",
            "--subscribe",
            "db=dbhost",
            "--subscribe",
            "http=master",
            "--service-property",
            "db.db_name=shop",
        ]);
        let options = save_options(&args).unwrap();

        assert_eq!(options.name, "shop");
        assert_eq!(options.context_type, Some(ContextType::Site));
        assert_eq!(options.properties["uri"], "shop.example.com");
        assert_eq!(options.subscriptions.len(), 2);
        assert_eq!(options.subscriptions[0].properties["db_name"], "shop");
        assert!(options.subscriptions[1].properties.is_empty());
    }

    #[test]
    fn service_property_needs_a_matching_service() {
        let args = save_args(&["master", "--service-property", "db.db_port=3307"]);
        assert!(save_options(&args).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let args = save_args(&["master", "--type", "cluster"]);
        assert!(save_options(&args).is_err());
    }

    #[test]
    fn install_skip_verify_parses() {
        let cli = Cli::try_parse_from(["provision", "install", "shop", "--skip-verify"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Install { skip_verify: true, .. }
        ));
    }

    #[test]
    fn context_save_alias_parses() {
        let cli = Cli::try_parse_from(["provision", "context:save", "master", "-t", "server"]);
        assert!(cli.is_ok(), "alias should parse");
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["provision", "verify", "master", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn list_with_format_json_parses() {
        let cli = Cli::try_parse_from(["provision", "list", "--type", "site", "-f", "json"]);
        assert!(cli.is_ok());
    }
}
