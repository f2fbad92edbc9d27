mod support;

use std::fs;

use provision_core::commands::{VerifyCommand, VerifyOptions};
use provision_core::config::ContextStore;
use provision_core::error::ProvisionError;
use provision_core::step::MessageKind;
use provision_core::types::{ContextType, Phase};

use support::{FakeRunner, Fixture, RecordingReporter};

#[test]
fn server_verify_runs_phases_in_order() {
    let fixture = Fixture::new();
    fixture.server("master", &[("http", "apache"), ("db", "mysql")]);

    let runner = FakeRunner::new();
    let mut reporter = RecordingReporter::default();
    let outcome = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("master"), &mut reporter)
        .unwrap();

    assert_eq!(
        outcome.report.executed(),
        vec![
            "server.config_path",
            "logging.http",
            "http.server.configuration",
            "logging.db",
            "db_connect",
            "db_create",
            "db_grant",
        ]
    );
    assert!(outcome.saved);

    let config_path = fixture.server_config_path("master");
    assert!(config_path.join("apache/vhost.d").is_dir());
    assert!(config_path.join("apache.conf").is_file());

    assert_eq!(
        reporter.texts(MessageKind::Section),
        vec![
            "Verifying Server 'master'",
            "Verify service: Web Server",
            "Verify service: Database Server",
        ]
    );
    assert!(reporter.contains("Verification Complete!"));
}

#[test]
fn failing_step_stops_the_run() {
    let fixture = Fixture::new();
    fixture.server("master", &[("db", "mysql")]);

    let runner = FakeRunner::new().on("mysqladmin", 1, "Can't connect to MySQL server");
    let mut reporter = RecordingReporter::default();
    let err = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("master"), &mut reporter)
        .unwrap_err();

    match err {
        ProvisionError::VerificationFailed {
            context,
            phase,
            step,
        } => {
            assert_eq!(context, "master");
            assert_eq!(phase, Phase::Verify);
            assert_eq!(step, "db_connect");
        }
        other => panic!("unexpected error: {other}"),
    }
    // db_create and db_grant never ran.
    assert_eq!(runner.calls().len(), 1);
    // The root password reaches mysqladmin through the environment only.
    assert_eq!(runner.calls()[0].env["MYSQL_PWD"], "secret");
    assert!(
        reporter
            .messages
            .iter()
            .all(|(_, text)| !text.contains("secret"))
    );
    assert!(!reporter.contains("Verification Complete!"));
    assert!(
        reporter
            .texts(MessageKind::Failure)
            .iter()
            .any(|t| t.contains("Unable to connect using credentials saved in context master"))
    );
}

#[test]
fn site_without_db_server_fails_before_running_anything() {
    let fixture = Fixture::new();
    fixture.server("web", &[("http", "apache")]);
    fixture.platform("d10");
    fixture.site("shop", "d10", &[("http", "web"), ("db", "dbhost")]);

    let runner = FakeRunner::new();
    let mut reporter = RecordingReporter::default();
    let err = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("shop"), &mut reporter)
        .unwrap_err();

    assert!(err.is_assembly_error());
    match err {
        ProvisionError::UnsatisfiedServiceRequirement { service, context, .. } => {
            assert_eq!(service, "db");
            assert_eq!(context, "shop");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.calls().is_empty());
    assert!(reporter.texts(MessageKind::Start).is_empty());
}

#[test]
fn failed_assembly_leaves_context_file_untouched() {
    let fixture = Fixture::new();
    fixture.server("web", &[("http", "apache")]);
    fixture.platform("d10");
    fixture.site("shop", "d10", &[("http", "web"), ("db", "dbhost")]);
    let file = fixture.store.location(ContextType::Site, "shop");
    let before = fs::read_to_string(&file).unwrap();
    assert!(!before.contains("site_path"));

    let runner = FakeRunner::new();
    let mut reporter = RecordingReporter::default();
    let err = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("shop"), &mut reporter)
        .unwrap_err();

    assert!(err.is_assembly_error());
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn site_with_server_lacking_service_is_unsatisfied() {
    let fixture = Fixture::new();
    fixture.server("web", &[("http", "apache")]);
    fixture.platform("d10");
    fixture.site("shop", "d10", &[("http", "web"), ("db", "web")]);

    let runner = FakeRunner::new();
    let mut reporter = RecordingReporter::default();
    let err = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("shop"), &mut reporter)
        .unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::UnsatisfiedServiceRequirement { ref service, .. } if service == "db"
    ));
}

#[test]
fn site_verify_reuses_existing_database() {
    let fixture = Fixture::new();
    fixture.server("master", &[("http", "nginx"), ("db", "mysql")]);
    let root = fixture.platform("d10");
    fixture.site("shop", "d10", &[("http", "master"), ("db", "master")]);

    let runner = FakeRunner::new().on("SHOW DATABASES LIKE", 0, "shop_db\n");
    let mut reporter = RecordingReporter::default();
    let outcome = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("shop"), &mut reporter)
        .unwrap();

    assert_eq!(
        outcome.report.executed(),
        vec![
            "platform.found",
            "composer.install",
            "site.prepare",
            "logging.http",
            "http.site.configuration",
            "logging.db",
            "db.site.database",
            "db.site.grant",
            "db.site.connect",
        ]
    );
    assert!(reporter.contains("Database 'shop_db' already exists."));
    assert!(!runner.ran("CREATE DATABASE `shop_db`"));
    assert!(runner.ran("GRANT ALL PRIVILEGES ON `shop_db`.*"));
    assert!(reporter.contains("Database service configured for site shop."));

    // The site tree lives under the platform's document root.
    let site_dir = root.join("web/sites/shop.example.com");
    assert!(site_dir.join("files").is_dir());

    let vhost = fs::read_to_string(
        fixture
            .server_config_path("master")
            .join("nginx/vhost.d/shop.example.com"),
    )
    .unwrap();
    assert!(vhost.contains(&root.join("web").display().to_string()));

    // Every command carries the context environment.
    let call = runner.calls().into_iter().next().unwrap();
    assert_eq!(call.env["PROVISION_CONTEXT"], "shop");
    assert_eq!(call.env["PROVISION_CONTEXT_SERVER_DB"], "master");
}

#[test]
fn site_verify_creates_missing_database() {
    let fixture = Fixture::new();
    fixture.server("master", &[("http", "apache"), ("db", "mysql")]);
    fixture.platform("d10");
    fixture.site("shop", "d10", &[("http", "master"), ("db", "master")]);

    // Only the subscriber check sees the database.
    let runner = FakeRunner::new()
        .on("--user=root -B -N -e 'SHOW DATABASES", 0, "")
        .on("SHOW DATABASES LIKE", 0, "shop_db\n");
    let mut reporter = RecordingReporter::default();
    VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("shop"), &mut reporter)
        .unwrap();

    assert!(runner.ran("CREATE DATABASE `shop_db`"));
    assert!(reporter.contains("Created database 'shop_db'."));
}

#[test]
fn hooks_file_runs_before_verify_steps() {
    let fixture = Fixture::new();
    fixture.server("master", &[("http", "apache"), ("db", "mysql")]);
    let root = fixture.platform("d10");
    fs::write(
        root.join(".provision.toml"),
        "[hooks.verify]\npre = \"echo warming caches\"\n",
    )
    .unwrap();
    fixture.site("shop", "d10", &[("http", "master"), ("db", "master")]);

    let runner = FakeRunner::new().on("SHOW DATABASES LIKE", 0, "shop_db\n");
    let mut reporter = RecordingReporter::default();
    let outcome = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("shop"), &mut reporter)
        .unwrap();

    let executed = outcome.report.executed();
    assert_eq!(executed[0], "hooks.found");
    assert!(executed[1].starts_with("hooks.verify.pre."));
    assert_eq!(runner.commands()[0], "set -e; echo warming caches");
    assert_eq!(runner.calls()[0].working_dir.as_deref(), Some(root.as_path()));
}

#[test]
fn unknown_context_is_reported() {
    let fixture = Fixture::new();
    let runner = FakeRunner::new();
    let mut reporter = RecordingReporter::default();
    let err = VerifyCommand::new(fixture.env(&runner))
        .execute(&VerifyOptions::new("ghost"), &mut reporter)
        .unwrap_err();
    assert!(matches!(err, ProvisionError::ContextNotFound { ref name } if name == "ghost"));
}
