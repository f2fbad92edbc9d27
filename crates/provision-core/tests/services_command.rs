mod support;

use provision_core::commands::{ServicesCommand, ServicesOptions, ServicesReport};
use provision_core::types::{ContextType, Role};

use support::{FakeRunner, Fixture};

#[test]
fn lists_available_services_and_types() {
    let fixture = Fixture::new();
    let runner = FakeRunner::new();
    let report = ServicesCommand::new(fixture.env(&runner))
        .execute(&ServicesOptions::available())
        .unwrap();

    let ServicesReport::Available(services) = report else {
        panic!("expected available services");
    };
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].name, "http");
    assert_eq!(
        services[0].allowed_contexts,
        vec![ContextType::Platform, ContextType::Site]
    );
    let db_types: Vec<_> = services[1].types.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(db_types, vec!["mysql", "mysqlDocker"]);
}

#[test]
fn lists_site_subscriptions_with_server_types() {
    let fixture = Fixture::new();
    fixture.server("master", &[("http", "nginx")]);
    fixture.platform("d10");
    fixture.site("shop", "d10", &[("http", "master"), ("db", "dbhost")]);

    let runner = FakeRunner::new();
    let report = ServicesCommand::new(fixture.env(&runner))
        .execute(&ServicesOptions::context("shop"))
        .unwrap();

    let ServicesReport::Attached { role, services, .. } = report else {
        panic!("expected attached services");
    };
    assert_eq!(role, Role::Subscriber);
    assert_eq!(services[0].service_type.as_deref(), Some("nginx"));
    assert_eq!(services[0].friendly_name, "Web Server");
    // The db server is not saved yet.
    assert_eq!(services[1].server, "dbhost");
    assert_eq!(services[1].service_type, None);
}
