//! The `db` service: database servers holding site databases.

mod client;
pub mod mysql;
pub mod mysql_docker;

use crate::property::{Property, validators};
use crate::service::{PhaseHooks, ServiceBinding, ServiceDefinition};
use crate::step::Step;
use crate::types::{ContextType, Phase};

pub use client::{DbCredentials, MysqlClient, Transport};
pub use mysql::MysqlService;
pub use mysql_docker::MysqlDockerService;

pub const SERVICE: &str = "db";

pub const DEFAULT_PORT: u16 = 3306;

pub fn definition() -> ServiceDefinition {
    ServiceDefinition {
        name: SERVICE,
        friendly_name: "Database Server",
        allowed_contexts: &[ContextType::Site],
        subscription_properties,
    }
}

/// Per-site credentials, generated the first time a subscription resolves.
fn subscription_properties(_: ContextType) -> Vec<Property> {
    vec![
        Property::new("db_name")
            .description("The name of the database. Default: Automatically generated.")
            .default_with(|| validators::unique_token("db_name_"))
            .required(true),
        Property::new("db_user")
            .description("The username used to access the database. Default: Automatically generated.")
            .default_with(|| validators::unique_token("db_user_"))
            .required(true),
        Property::new("db_password")
            .description("The password used to access the database. Default: Automatically generated.")
            .default_with(|| validators::unique_token("db_password_"))
            .required(true),
    ]
}

/// Server properties shared by every database type.
pub fn server_properties() -> Vec<Property> {
    vec![
        Property::new("master_db")
            .description("server with db: Master database connection info, {type}://{user}:{password}@{host}")
            .required(true)
            .validate(validators::database_url),
        Property::new("db_grant_all_hosts")
            .description("Grant access to site database users from any web host. If set to false, access is limited to localhost.")
            .default_value("true")
            .validate(validators::boolean),
        Property::new("db_port")
            .description("The port to run the database server on.")
            .default_value(DEFAULT_PORT.to_string())
            .validate(validators::port),
    ]
}

/// Hooks shared by every database type.
pub(crate) fn hooks(transport: Transport) -> PhaseHooks {
    PhaseHooks::new()
        .on(Phase::Verify, ContextType::Server, move |b| {
            server_steps(transport, b)
        })
        .on(Phase::Verify, ContextType::Site, move |b| {
            site_steps(transport, b)
        })
}

fn server_steps(transport: Transport, binding: &ServiceBinding) -> anyhow::Result<Vec<Step>> {
    let root = MysqlClient::for_server(transport, binding)?;
    let server = binding.server.name.clone();
    let create = root.clone();
    let grant = root.clone();

    Ok(vec![
        Step::new("db_connect")
            .start("Checking connection to database server...")
            .failure(format!(
                "Checking connection to database server... Unable to connect using credentials saved in context {server}."
            ))
            .execute(move |env| {
                root.connect(env.runner)?;
                Ok(0)
            }),
        Step::new("db_create")
            .start("Checking root database access...")
            .success("Provision can create new databases.")
            .failure("Provision is unable to create databases.")
            .execute(move |env| Ok(if create.can_create_database(env.runner)? { 0 } else { 1 })),
        Step::new("db_grant")
            .start("Checking access to grant privileges...")
            .success("Provision can grant privileges on database users.")
            .failure("Provision is unable to grant privileges on database users.")
            .execute(move |env| Ok(if grant.can_grant_privileges(env.runner)? { 0 } else { 1 })),
    ])
}

fn site_steps(transport: Transport, binding: &ServiceBinding) -> anyhow::Result<Vec<Step>> {
    let root = MysqlClient::for_server(transport, binding)?;
    let site = binding.context.name.clone();
    let db_name = binding.require_subscription_property("db_name")?.to_string();
    let db_user = binding.require_subscription_property("db_user")?.to_string();
    let db_password = binding
        .require_subscription_property("db_password")?
        .to_string();
    let grant_hosts = grant_host_list(binding);
    let subscriber = root.as_user(&db_user, &db_password);

    let create = {
        let root = root.clone();
        let db_name = db_name.clone();
        Step::new("db.site.database")
            .start("Preparing site database...")
            .failure(format!("Could not create {db_name} database"))
            .execute(move |env| {
                root.connect(env.runner)?;
                if root.database_exists(env.runner, &db_name)? {
                    env.reporter
                        .success(&format!("Database '{db_name}' already exists."));
                } else {
                    root.create_database(env.runner, &db_name)?;
                    env.reporter
                        .success(&format!("Created database '{db_name}'."));
                }
                Ok(0)
            })
    };

    let grant = {
        let db_name = db_name.clone();
        Step::new("db.site.grant")
            .failure(format!("Could not create database user {db_user}"))
            .execute(move |env| {
                for host in &grant_hosts {
                    root.grant(env.runner, &db_name, &db_user, &db_password, host)?;
                    env.reporter.success(&format!(
                        "Granted privileges to user '{db_user}@{host}' for database '{db_name}'."
                    ));
                }
                Ok(0)
            })
    };

    let connect = Step::new("db.site.connect")
        .success(format!("Database service configured for site {site}."))
        .failure("Unable to connect to database using service properties.")
        .execute(move |env| {
            if !subscriber.database_exists(env.runner, &db_name)? {
                return Err(anyhow::anyhow!("Could not create {db_name} database").into());
            }
            Ok(0)
        });

    Ok(vec![create, grant, connect])
}

/// Hosts, as seen by the database server, that site users may connect from.
fn grant_host_list(binding: &ServiceBinding) -> Vec<String> {
    let all_hosts = binding
        .service_property("db_grant_all_hosts")
        .is_none_or(|v| validators::is_true(Some(v)));
    if all_hosts {
        vec!["%".to_string()]
    } else {
        vec!["localhost".to_string()]
    }
}
