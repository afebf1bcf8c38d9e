mod common;

use std::path::PathBuf;

use iam_inventory::inventory::{HierarchyWalker, OrganizationLookup, OrganizationSource};
use iam_inventory::{ApiError, ConfigurationError};

use common::{DefaultCredentials, FakeCloud, FakeCredentials};

#[tokio::test]
async fn explicit_organization_needs_no_calls() {
    let cloud = FakeCloud::new().into_arc();
    let creds = FakeCredentials::new(DefaultCredentials::Missing);
    let walker = HierarchyWalker::new(cloud.clone());

    let (ctx, source) = walker
        .resolve_organization(&OrganizationLookup::new().with_organization("123").with_project("ignored"), &creds)
        .await
        .expect("resolve");

    assert_eq!(ctx.organization_id(), "123");
    assert_eq!(source, OrganizationSource::Explicit);
    assert!(cloud.calls().is_empty());
    assert!(creds.calls().is_empty());
}

#[tokio::test]
async fn explicit_project_uses_its_ancestry() {
    let cloud = FakeCloud::new()
        .with_ancestry("p", &[("project", "p"), ("folder", "9"), ("organization", "77")])
        .into_arc();
    let creds = FakeCredentials::new(DefaultCredentials::WithProject("other".to_string()));
    let walker = HierarchyWalker::new(cloud.clone());

    let (ctx, source) = walker
        .resolve_organization(&OrganizationLookup::new().with_project("p"), &creds)
        .await
        .expect("resolve");

    assert_eq!(ctx.organization_id(), "77");
    assert_eq!(source, OrganizationSource::Project("p".to_string()));
    assert_eq!(cloud.calls(), vec!["get_ancestry:p"]);
    assert!(creds.calls().is_empty());
}

#[tokio::test]
async fn project_from_default_credentials() {
    let cloud = FakeCloud::new()
        .with_ancestry("adc-project", &[("project", "adc-project"), ("organization", "5")])
        .into_arc();
    let creds = FakeCredentials::new(DefaultCredentials::WithProject("adc-project".to_string()))
        .with_file("/keys/sa.json", Some("file-project"));
    let walker = HierarchyWalker::new(cloud.clone());

    let lookup = OrganizationLookup::new().with_credentials_file("/keys/sa.json");
    let (ctx, source) = walker.resolve_organization(&lookup, &creds).await.expect("resolve");

    assert_eq!(ctx.organization_id(), "5");
    assert_eq!(source, OrganizationSource::DefaultCredentials("adc-project".to_string()));
    assert_eq!(creds.calls(), vec!["default_credentials"]);
}

#[tokio::test]
async fn credentials_file_is_the_last_resort() {
    let cloud = FakeCloud::new()
        .with_ancestry("file-project", &[("project", "file-project"), ("organization", "8")])
        .into_arc();
    let creds = FakeCredentials::new(DefaultCredentials::Missing).with_file("/keys/sa.json", Some("file-project"));
    let walker = HierarchyWalker::new(cloud.clone());

    let lookup = OrganizationLookup::new().with_credentials_file("/keys/sa.json");
    let (ctx, source) = walker.resolve_organization(&lookup, &creds).await.expect("resolve");

    assert_eq!(ctx.organization_id(), "8");
    assert_eq!(source, OrganizationSource::CredentialsFile("file-project".to_string()));
    assert_eq!(
        creds.calls(),
        vec!["default_credentials", "credentials_from_file:/keys/sa.json"]
    );
}

#[tokio::test]
async fn default_credentials_without_project_fall_back_to_file() {
    let cloud = FakeCloud::new()
        .with_ancestry("file-project", &[("organization", "8")])
        .into_arc();
    let creds =
        FakeCredentials::new(DefaultCredentials::WithoutProject).with_file("/keys/sa.json", Some("file-project"));
    let walker = HierarchyWalker::new(cloud);

    let lookup = OrganizationLookup::new().with_credentials_file("/keys/sa.json");
    let (ctx, _) = walker.resolve_organization(&lookup, &creds).await.expect("resolve");

    assert_eq!(ctx.organization_id(), "8");
}

#[tokio::test]
async fn nothing_to_go_on_is_a_no_credentials_error() {
    let cloud = FakeCloud::new().into_arc();
    let creds = FakeCredentials::new(DefaultCredentials::Missing);
    let walker = HierarchyWalker::new(cloud.clone());

    let err = walker
        .resolve_organization(&OrganizationLookup::new(), &creds)
        .await
        .expect_err("must fail");

    match err {
        ConfigurationError::NoCredentials(message) => assert!(message.contains("--org"), "{message}"),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn default_credentials_without_project_and_no_file() {
    let walker = HierarchyWalker::new(FakeCloud::new().into_arc());
    let creds = FakeCredentials::new(DefaultCredentials::WithoutProject);

    let err = walker
        .resolve_organization(&OrganizationLookup::new(), &creds)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ConfigurationError::NoProjectInCredentials { path: None }));
}

#[tokio::test]
async fn credentials_file_without_project() {
    let walker = HierarchyWalker::new(FakeCloud::new().into_arc());
    let creds = FakeCredentials::new(DefaultCredentials::Missing).with_file("/keys/user.json", None);

    let lookup = OrganizationLookup::new().with_credentials_file("/keys/user.json");
    let err = walker.resolve_organization(&lookup, &creds).await.expect_err("must fail");

    match err {
        ConfigurationError::NoProjectInCredentials { path } => {
            assert_eq!(path, Some(PathBuf::from("/keys/user.json")));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_credentials_file() {
    let walker = HierarchyWalker::new(FakeCloud::new().into_arc());
    let creds = FakeCredentials::new(DefaultCredentials::Missing);

    let lookup = OrganizationLookup::new().with_credentials_file("/keys/missing.json");
    let err = walker.resolve_organization(&lookup, &creds).await.expect_err("must fail");

    match err {
        ConfigurationError::CredentialsFileUnreadable { path, .. } => {
            assert_eq!(path, PathBuf::from("/keys/missing.json"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn ancestry_failure_is_reported_with_the_project() {
    let walker = HierarchyWalker::new(FakeCloud::new().into_arc());
    let creds = FakeCredentials::new(DefaultCredentials::Missing);

    let err = walker
        .resolve_organization(&OrganizationLookup::new().with_project("locked"), &creds)
        .await
        .expect_err("must fail");

    match err {
        ConfigurationError::Ancestry { project, source } => {
            assert_eq!(project, "locked");
            assert!(matches!(source, ApiError::Status { status: 403, .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn project_outside_an_organization() {
    let cloud = FakeCloud::new()
        .with_ancestry("orphan", &[("project", "orphan"), ("folder", "3")])
        .into_arc();
    let walker = HierarchyWalker::new(cloud);
    let creds = FakeCredentials::new(DefaultCredentials::Missing);

    let err = walker
        .resolve_organization(&OrganizationLookup::new().with_project("orphan"), &creds)
        .await
        .expect_err("must fail");

    match err {
        ConfigurationError::NotInOrganization { project } => assert_eq!(project, "orphan"),
        other => panic!("unexpected error {other:?}"),
    }
}
