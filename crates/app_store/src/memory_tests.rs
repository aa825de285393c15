use super::*;
use encryption::AesGcmKey;

fn app(app_id: u64, slug: &str, base_url: &str) -> GitHubApp {
    GitHubApp {
        app_id,
        name: format!("Test App {app_id}"),
        domain: AppDomain::Repos,
        slug: slug.to_string(),
        base_url: base_url.to_string(),
        app_url: format!("{base_url}apps/{slug}"),
        client_id: "abc123".to_string(),
        client_secret: "secret".to_string(),
        private_key: "private-key".to_string(),
        webhook_secret: Some("webhook-secret".to_string()),
        logo: "logo.png".to_string(),
        ..Default::default()
    }
}

fn installation(app_id: i64, installation_id: u64, login: &str) -> GitHubAppInstallation {
    GitHubAppInstallation {
        app_id,
        installation_id,
        url: format!("https://github.com/settings/installations/{installation_id}"),
        account_login: login.to_string(),
        account_url: format!("https://github.com/{login}"),
        account_avatar_url: format!("https://github.com/{login}.jpg"),
        account_type: "User".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_then_get_by_id() {
    let store = InMemoryStore::new();
    let new_app = app(1, "test-app", "https://github.com/");

    let id = store.create(&new_app).await.unwrap();
    let fetched = store.get_by_id(id).await.unwrap();

    assert_eq!(fetched.id, id);
    assert_eq!(fetched.app_id, 1);
    assert_eq!(fetched.base_url, "https://github.com/");
    assert_eq!(fetched.private_key, "private-key");
    assert_eq!(fetched.created_at, fetched.updated_at);
}

#[tokio::test]
async fn test_create_assigns_increasing_ids() {
    let store = InMemoryStore::new();

    let first = store.create(&app(1, "one", "https://github.com/")).await.unwrap();
    let second = store.create(&app(2, "two", "https://github.com/")).await.unwrap();

    assert!(second > first);
}

#[tokio::test]
async fn test_create_rejects_duplicate_app_id_for_same_instance() {
    let store = InMemoryStore::new();
    store.create(&app(1, "one", "https://github.com/")).await.unwrap();

    let result = store.create(&app(1, "again", "https://github.com")).await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_same_app_id_allowed_on_different_instances() {
    let store = InMemoryStore::new();
    store.create(&app(1, "one", "https://github.com/")).await.unwrap();

    let result = store.create(&app(1, "one", "https://ghe.example.com/")).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_only_one_batches_app_per_instance() {
    let store = InMemoryStore::new();
    let mut batches = app(1, "batches-one", "https://github.com/");
    batches.domain = AppDomain::Batches;
    store.create(&batches).await.unwrap();

    let mut second = app(2, "batches-two", "https://github.com");
    second.domain = AppDomain::Batches;
    let result = store.create(&second).await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_delete_cascades_to_installations_and_is_idempotent() {
    let store = InMemoryStore::new();
    let id = store.create(&app(1, "test-app", "https://github.com/")).await.unwrap();
    store.install(installation(id, 42, "octocat")).await.unwrap();

    store.delete(id).await.unwrap();

    assert!(matches!(
        store.get_by_id(id).await,
        Err(StoreError::AppNotFound { .. })
    ));
    assert!(store.get_installations(id).await.unwrap().is_empty());
    store.delete(id).await.unwrap();
}

#[tokio::test]
async fn test_update_keeps_created_at() {
    let store = InMemoryStore::new();
    let id = store.create(&app(123, "test-app", "https://github.com/")).await.unwrap();
    let created = store.get_by_id(id).await.unwrap();

    let mut changed = created.clone();
    changed.name = "Renamed App".to_string();
    changed.client_secret = "rotated".to_string();
    let updated = store.update(id, &changed).await.unwrap();

    assert_eq!(updated.name, "Renamed App");
    assert_eq!(updated.client_secret, "rotated");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn test_update_missing_app_is_not_found() {
    let store = InMemoryStore::new();

    let result = store.update(99, &app(1, "x", "https://github.com")).await;

    assert!(matches!(result, Err(StoreError::AppNotFound { .. })));
}

#[tokio::test]
async fn test_get_by_app_id_ignores_trailing_slashes() {
    let store = InMemoryStore::new();
    let id = store.create(&app(1234, "test-app-1", "https://github.com")).await.unwrap();

    for base in ["https://github.com", "https://github.com/", "https://github.com////"] {
        let fetched = store.get_by_app_id(1234, base).await.unwrap();
        assert_eq!(fetched.app_id, 1234, "base: {base}");
    }

    let mut moved = store.get_by_id(id).await.unwrap();
    moved.base_url = "https://github.com///".to_string();
    store.update(id, &moved).await.unwrap();

    assert!(store.get_by_app_id(1234, "https://github.com").await.is_ok());
}

#[tokio::test]
async fn test_get_by_app_id_not_found_carries_criteria() {
    let store = InMemoryStore::new();
    store.create(&app(1234, "test-app", "https://github.com/")).await.unwrap();

    let err = store.get_by_app_id(3456, "https://github.com/").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "no app exists matching criteria: 'app_id = 3456 AND base_url = https://github.com'"
    );
}

#[tokio::test]
async fn test_get_by_slug_distinguishes_instances() {
    let store = InMemoryStore::new();
    store.create(&app(1234, "test-app", "https://github.com/")).await.unwrap();
    store
        .create(&app(5678, "test-app", "https://enterprise.github.com/"))
        .await
        .unwrap();

    let public = store.get_by_slug("test-app", "https://github.com/").await.unwrap();
    let enterprise = store
        .get_by_slug("test-app", "https://enterprise.github.com/")
        .await
        .unwrap();

    assert_eq!(public.app_id, 1234);
    assert_eq!(enterprise.app_id, 5678);
    assert!(store.get_by_slug("foo", "bar").await.is_err());
}

#[tokio::test]
async fn test_get_by_domain() {
    let store = InMemoryStore::new();
    store.create(&app(1234, "repos-app", "https://github.com/")).await.unwrap();
    let mut batches = app(5678, "batches-app", "https://github.com/");
    batches.domain = AppDomain::Batches;
    store.create(&batches).await.unwrap();

    let fetched = store
        .get_by_domain(AppDomain::Batches, "https://github.com")
        .await
        .unwrap();
    assert_eq!(fetched.app_id, 5678);

    let err = store
        .get_by_domain(AppDomain::Repos, "https://myCompany.github.com/")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "no app exists matching criteria: 'domain = repos AND base_url = https://myCompany.github.com'"
    );
}

#[tokio::test]
async fn test_list_all_and_by_domain() {
    let store = InMemoryStore::new();
    store.create(&app(1234, "test-app-1", "https://github.com/")).await.unwrap();
    let mut batches = app(5678, "test-app-2", "https://enterprise.github.com/");
    batches.domain = AppDomain::Batches;
    store.create(&batches).await.unwrap();

    let all = store.list(None).await.unwrap();
    let ids: Vec<_> = all.iter().map(|a| a.app_id).collect();
    assert_eq!(ids, vec![1234, 5678]);

    let repos = store.list(Some(AppDomain::Repos)).await.unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].app_id, 1234);
}

#[tokio::test]
async fn test_install_upsert_preserves_created_at() {
    let store = InMemoryStore::new();
    let id = store.create(&app(1, "test-app", "https://github.com/")).await.unwrap();

    let first = store.install(installation(id, 42, "test-user")).await.unwrap();

    let mut changed = installation(id, 42, "test-user");
    changed.account_avatar_url = "https://github.com/test-user-new.jpg".to_string();
    let second = store.install(changed).await.unwrap();

    assert_eq!(second.account_avatar_url, "https://github.com/test-user-new.jpg");
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(store.get_installations(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_install_for_unknown_app_fails() {
    let store = InMemoryStore::new();

    let result = store.install(installation(7, 42, "octocat")).await;

    assert!(matches!(result, Err(StoreError::AppNotFound { .. })));
}

#[tokio::test]
async fn test_get_installations_is_scoped_to_app() {
    let store = InMemoryStore::new();
    let first = store.create(&app(1, "one", "https://github.com/")).await.unwrap();
    let second = store.create(&app(2, "two", "https://github.com/")).await.unwrap();
    for installation_id in [3, 1, 2] {
        store
            .install(installation(first, installation_id, "user"))
            .await
            .unwrap();
    }
    store.install(installation(second, 9, "other")).await.unwrap();

    let ids: Vec<_> = store
        .get_installations(first)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.installation_id)
        .collect();

    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_bulk_remove_installations() {
    let store = InMemoryStore::new();
    let id = store.create(&app(1, "test-app", "https://github.com/")).await.unwrap();
    for installation_id in 1..=5 {
        store
            .install(installation(id, installation_id, "user"))
            .await
            .unwrap();
    }

    store
        .bulk_remove_installations(id, &[1, 3, 5, 404])
        .await
        .unwrap();

    let ids: Vec<_> = store
        .get_installations(id)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.installation_id)
        .collect();
    assert_eq!(ids, vec![2, 4]);
}

#[tokio::test]
async fn test_get_install_id_matches_login_case_insensitively() {
    let store = InMemoryStore::new();
    let id = store.create(&app(1, "test-app", "https://github.com/")).await.unwrap();
    store.install(installation(id, 5678, "Some-Org")).await.unwrap();

    assert_eq!(store.get_install_id(id, "some-org").await.unwrap(), 5678);

    let err = store.get_install_id(id, "other-org").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InstallationNotFound { app_id, ref account_login }
            if app_id == id && account_login == "other-org"
    ));
}

#[tokio::test]
async fn test_secrets_are_encrypted_at_rest() {
    let store = InMemoryStore::new().with_encryption_key(Arc::new(AesGcmKey::generate()));
    let id = store.create(&app(1, "test-app", "https://github.com/")).await.unwrap();

    {
        let state = store.state.read().await;
        let raw = &state.apps[&id];
        assert!(raw.encrypted);
        assert_ne!(raw.app.private_key, "private-key");
        assert_ne!(raw.app.client_secret, "secret");
        assert_ne!(raw.app.webhook_secret.as_deref(), Some("webhook-secret"));
    }

    let fetched = store.get_by_id(id).await.unwrap();
    assert_eq!(fetched.private_key, "private-key");
    assert_eq!(fetched.client_secret, "secret");
    assert_eq!(fetched.webhook_secret.as_deref(), Some("webhook-secret"));

    let listed = store.list(None).await.unwrap();
    assert_eq!(listed[0].private_key, "private-key");
}

#[tokio::test]
async fn test_plaintext_store_keeps_secrets_as_is() {
    let store = InMemoryStore::new();
    let id = store.create(&app(1, "test-app", "https://github.com/")).await.unwrap();

    let state = store.state.read().await;
    assert!(!state.apps[&id].encrypted);
    assert_eq!(state.apps[&id].app.private_key, "private-key");
}
