mod support;

use clusterdeck_backend::auth::Principal;
use clusterdeck_backend::models::{AuthenticationMethod, ClusterRecord, ConnectionSettings};
use clusterdeck_backend::services::CLUSTER_ID_LENGTH;
use clusterdeck_backend::Error;
use support::{cluster_creation, file_storage, sqlite_storage, SequenceIdGenerator, TestContext};

fn admin() -> Principal {
    Principal::admin("alice")
}

#[tokio::test]
async fn test_create_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let created = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();

    let cluster = &created.cluster;
    assert_eq!(cluster.id.len(), CLUSTER_ID_LENGTH);
    assert!(cluster.id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(cluster.display_name, "Cluster A");
    assert_eq!(cluster.internal_name.as_deref(), Some("standalone"));

    let client_id = created.client_connection_settings.id.unwrap();
    let admin_id = created.admin_connection_settings.id.unwrap();
    assert_ne!(client_id, admin_id);
    assert_eq!(cluster.client_connection_settings_id, client_id);
    assert_eq!(cluster.admin_connection_settings_id, admin_id);

    assert!(ctx.connections.is_registered(&cluster.id));
    assert_eq!(
        ctx.connections.lookup_admin(&cluster.id).unwrap().service_url(),
        "http://host:8080"
    );
}

#[tokio::test]
async fn test_create_ignores_incoming_settings_ids() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let existing = ctx
        .storage
        .connection_settings
        .save(ConnectionSettings::new("pulsar://other:6650", AuthenticationMethod::NoAuth))
        .await
        .unwrap();

    let mut creation = cluster_creation("Cluster A");
    creation.client_connection_settings.id = existing.id;
    let created = ctx.service.create(&admin(), creation).await.unwrap();

    assert_ne!(created.client_connection_settings.id, existing.id);
    let untouched = ctx
        .service
        .connection_settings(existing.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.service_url, "pulsar://other:6650");
}

#[tokio::test]
async fn test_create_requires_admin() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let result = ctx
        .service
        .create(&Principal::new("bob", &["viewer"]), cluster_creation("Cluster A"))
        .await;

    assert!(matches!(result, Err(Error::Forbidden { .. })));
    assert!(ctx.storage.clusters.find_all().await.unwrap().is_empty());
    assert!(ctx.storage.connection_settings.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_blank_display_name() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let result = ctx.service.create(&admin(), cluster_creation(" ")).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(ctx.storage.connection_settings.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_retries_taken_ids() {
    let dir = tempfile::tempdir().unwrap();
    let generator = SequenceIdGenerator::new(&["taken001", "taken002", "fresh001"]);
    let ctx = TestContext::new(file_storage(dir.path()).await).with_id_generator(generator.clone());

    for id in ["taken001", "taken002"] {
        ctx.storage
            .clusters
            .save(ClusterRecord {
                id: id.to_string(),
                display_name: "Existing".to_string(),
                icon: "box".to_string(),
                color: "#000000".to_string(),
                client_connection_settings_id: 1,
                admin_connection_settings_id: 2,
                internal_name: None,
            })
            .await
            .unwrap();
    }

    let created = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();

    assert_eq!(created.cluster.id, "fresh001");
    assert_eq!(generator.generated.lock().unwrap().len(), 3);
    assert_eq!(ctx.storage.clusters.find_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_keeps_record_when_connections_fail() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);
    ctx.factory.fail_admin_for("http://host:8080");

    let result = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await;
    assert!(matches!(result, Err(Error::Connection { .. })));

    let stored = ctx.storage.clusters.find_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(ctx.storage.connection_settings.find_all().await.unwrap().len(), 2);
    assert!(!ctx.connections.is_registered(&stored[0].id));
}

#[tokio::test]
async fn test_get_all_leaves_out_unresolvable_clusters() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let resolvable = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();

    // Admins built from now on only know about a remote cluster
    ctx.factory.set_internal_clusters(&[("remote", "http://remote:8080")]);
    let result = ctx
        .service
        .create(&admin(), cluster_creation("Cluster B"))
        .await;
    assert!(matches!(result, Err(Error::Resolution { .. })));
    assert_eq!(ctx.storage.clusters.find_all().await.unwrap().len(), 2);

    let all = ctx.service.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, resolvable.cluster.id);
    assert_eq!(all[0].internal_name.as_deref(), Some("standalone"));
}

#[tokio::test]
async fn test_get_all_on_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    assert!(ctx.service.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(sqlite_storage(dir.path()).await);

    let created = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();

    let found = ctx
        .service
        .get_by_id(&created.cluster.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, created.cluster);

    assert!(ctx.service.get_by_id("missing0").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_by_id_fails_without_connections() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let created = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();
    ctx.connections.unregister(&created.cluster.id).await;

    let result = ctx.service.get_by_id(&created.cluster.id).await;
    assert!(matches!(result, Err(Error::Resolution { .. })));
}

#[tokio::test]
async fn test_delete_keeps_connection_settings() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let created = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();
    let id = created.cluster.id.clone();

    ctx.service.delete(&admin(), &id).await.unwrap();

    assert!(ctx.service.get_by_id(&id).await.unwrap().is_none());
    assert!(!ctx.connections.is_registered(&id));
    assert!(ctx.factory.built_admins()[0].is_closed());
    assert!(ctx
        .service
        .connection_settings(created.client_connection_settings.id.unwrap())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_delete_checks_role_and_existence() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::new(file_storage(dir.path()).await);

    let created = ctx
        .service
        .create(&admin(), cluster_creation("Cluster A"))
        .await
        .unwrap();

    let result = ctx
        .service
        .delete(&Principal::new("bob", &["viewer"]), &created.cluster.id)
        .await;
    assert!(matches!(result, Err(Error::Forbidden { .. })));
    assert!(ctx.connections.is_registered(&created.cluster.id));

    let result = ctx.service.delete(&admin(), "missing0").await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}
