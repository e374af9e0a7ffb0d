use adimport_core::{
    organization::{CreateUnitOutcome, create_organization_unit, provision_organization},
    record::{ImportRecord, ObjectClasses},
    report::ImportEvent,
};
use common::{
    create_test_directory,
    directory::{Operation, OperationKind, TestDirectory},
    test_config,
};

mod common;

fn organization_record(name: &str) -> ImportRecord {
    ImportRecord {
        objectclass: Some(ObjectClasses::list(["groupOfNames"])),
        cn: Some(name.to_string()),
        ..Default::default()
    }
}

/// Tests that the three organization units are created under the customers unit
#[tokio::test]
async fn test_provision_organization() {
    let directory = create_test_directory();
    let config = test_config();
    let mut events = Vec::new();

    let errors =
        provision_organization(&directory, &config, &organization_record("Acme"), &mut events)
            .await;
    assert_eq!(errors, 0);

    for dn in [
        "OU=Acme,OU=Customers,DC=example,DC=org",
        "OU=Groups,OU=Acme,OU=Customers,DC=example,DC=org",
        "OU=Users,OU=Acme,OU=Customers,DC=example,DC=org",
    ] {
        assert!(directory.entry(dn).await.is_some(), "{dn} should exist");
        assert!(events.contains(&ImportEvent::OrganizationUnitCreated { dn: dn.to_string() }));
    }
}

/// Tests that provisioning the same organization again produces no errors
#[tokio::test]
async fn test_provision_organization_idempotent() {
    let directory = create_test_directory();
    let config = test_config();
    let record = organization_record("Acme");

    let errors = provision_organization(&directory, &config, &record, &mut Vec::new()).await;
    assert_eq!(errors, 0);

    let mut events = Vec::new();
    let errors = provision_organization(&directory, &config, &record, &mut events).await;
    assert_eq!(errors, 0);
    assert!(events.is_empty(), "existing units should not be reported");
}

/// Tests that only the units that are missing get created
#[tokio::test]
async fn test_provision_organization_partially_existing() {
    let directory = create_test_directory();
    let config = test_config();

    let outcome = create_organization_unit(&directory, "OU=Acme,OU=Customers,DC=example,DC=org")
        .await
        .unwrap();
    assert_eq!(outcome, CreateUnitOutcome::Created);

    let mut events = Vec::new();
    let errors =
        provision_organization(&directory, &config, &organization_record("Acme"), &mut events)
            .await;
    assert_eq!(errors, 0);
    assert_eq!(events.len(), 2);

    let outcome = create_organization_unit(&directory, "OU=Acme,OU=Customers,DC=example,DC=org")
        .await
        .unwrap();
    assert_eq!(outcome, CreateUnitOutcome::Existing);
}

/// Tests that every failed unit is counted as an error
#[tokio::test]
async fn test_provision_organization_failures_counted() {
    let directory = TestDirectory::new(create_test_directory());
    directory.fail(OperationKind::CreateContainer);
    let config = test_config();
    let mut events = Vec::new();

    let errors =
        provision_organization(&directory, &config, &organization_record("Acme"), &mut events)
            .await;
    assert_eq!(errors, 3);

    let failures = events
        .iter()
        .filter(|event| matches!(event, ImportEvent::OrganizationFailed { .. }))
        .count();
    assert_eq!(failures, 3);
}

/// Tests that units beneath a missing customers unit fail with errors
#[tokio::test]
async fn test_provision_organization_missing_customers_unit() {
    let directory = adimport_directory::memory::MemoryDirectory::default();
    let config = test_config();

    let errors =
        provision_organization(&directory, &config, &organization_record("Acme"), &mut Vec::new())
            .await;
    assert_eq!(errors, 3);
}

/// Tests that an organization without a name is an error and writes nothing
#[tokio::test]
async fn test_provision_organization_missing_name() {
    let directory = TestDirectory::new(create_test_directory());
    let config = test_config();
    let mut events = Vec::new();

    let record = ImportRecord {
        objectclass: Some(ObjectClasses::scalar("groupOfNames")),
        ..Default::default()
    };

    let errors = provision_organization(&directory, &config, &record, &mut events).await;
    assert_eq!(errors, 1);
    assert!(directory.take_operations().is_empty());
    assert!(matches!(
        events.as_slice(),
        [ImportEvent::OrganizationFailed { .. }]
    ));
}

/// Tests that organization names are escaped when building units
#[tokio::test]
async fn test_provision_organization_escaped_name() {
    let directory = TestDirectory::new(create_test_directory());
    let config = test_config();

    let errors = provision_organization(
        &directory,
        &config,
        &organization_record("Acme, Inc"),
        &mut Vec::new(),
    )
    .await;
    assert_eq!(errors, 0);

    assert_eq!(
        directory.take_writes().first(),
        Some(&Operation::CreateContainer {
            dn: "OU=Acme\\, Inc,OU=Customers,DC=example,DC=org".to_string()
        })
    );

    let entry = directory
        .inner
        .entry("OU=Acme\\, Inc,OU=Customers,DC=example,DC=org")
        .await
        .unwrap();
    assert_eq!(entry.first("ou"), Some("Acme, Inc"));
}
