use super::*;
use crate::OctocrabClientFactory;
use app_store::{GitHubApp, InMemoryStore};
use github_client::{Installation, InstallationsClient};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use test_utils::{remote_installation, test_app, FlakyStore, ScriptedInstallationsClient};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct ScriptedFactory {
    unbuildable: HashSet<u64>,
    unreachable: HashSet<u64>,
    installations: HashMap<u64, Vec<Installation>>,
    created: Mutex<Vec<u64>>,
}

impl ScriptedFactory {
    fn created(&self) -> Vec<u64> {
        self.created.lock().unwrap().clone()
    }
}

impl InstallationsClientFactory for ScriptedFactory {
    fn create(
        &self,
        app: &GitHubApp,
    ) -> Result<Box<dyn InstallationsClient>, github_client::Error> {
        self.created.lock().unwrap().push(app.app_id);

        if self.unbuildable.contains(&app.app_id) {
            return Err(github_client::Error::AuthError(
                "Failed to translate the private key.".to_string(),
            ));
        }
        if self.unreachable.contains(&app.app_id) {
            return Ok(Box::new(ScriptedInstallationsClient::failing(
                404,
                "Not Found",
            )));
        }

        let installations = self
            .installations
            .get(&app.app_id)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(ScriptedInstallationsClient::returning(
            installations,
        )))
    }
}

async fn store_with_apps(app_ids: &[u64]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for app_id in app_ids {
        store
            .create(&test_app(*app_id, "https://github.com"))
            .await
            .unwrap();
    }
    store
}

async fn installation_ids(store: &InMemoryStore, app_id: u64) -> Vec<u64> {
    let app = store
        .get_by_app_id(app_id, "https://github.com")
        .await
        .unwrap();
    store
        .get_installations(app.id)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.installation_id)
        .collect()
}

#[tokio::test]
async fn test_backfill_syncs_every_app() {
    let store = store_with_apps(&[1, 2]).await;
    let factory = ScriptedFactory {
        installations: HashMap::from([
            (1, vec![remote_installation(10, "org-a")]),
            (
                2,
                vec![
                    remote_installation(20, "org-b"),
                    remote_installation(21, "org-c"),
                ],
            ),
        ]),
        ..Default::default()
    };
    let factory = Arc::new(factory);

    BackfillWorker::new(store.clone(), factory.clone())
        .run()
        .await
        .expect("backfill should succeed");

    assert_eq!(installation_ids(&store, 1).await, vec![10]);
    assert_eq!(installation_ids(&store, 2).await, vec![20, 21]);
    assert_eq!(factory.created(), vec![1, 2]);
}

#[tokio::test]
async fn test_client_creation_failure_skips_only_that_app() {
    let store = store_with_apps(&[1, 2]).await;
    let factory = Arc::new(ScriptedFactory {
        unbuildable: HashSet::from([1]),
        installations: HashMap::from([(2, vec![remote_installation(20, "org-b")])]),
        ..Default::default()
    });

    let result = BackfillWorker::new(store.clone(), factory).run().await;

    let errors = match result {
        Err(BackfillError::Sync(errors)) => errors,
        other => panic!("expected sync errors, got {other:?}"),
    };
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors.iter().next(),
        Some(SyncError::CreateClient { app_id: 1, .. })
    ));
    assert_eq!(installation_ids(&store, 2).await, vec![20]);
}

#[tokio::test]
async fn test_errors_of_all_apps_are_aggregated() {
    let store = store_with_apps(&[1, 2, 3]).await;
    let factory = Arc::new(ScriptedFactory {
        unbuildable: HashSet::from([1]),
        unreachable: HashSet::from([2]),
        installations: HashMap::from([(3, vec![remote_installation(30, "org-c")])]),
        ..Default::default()
    });

    let result = BackfillWorker::new(store.clone(), factory).run().await;

    let errors = match result {
        Err(BackfillError::Sync(errors)) => errors,
        other => panic!("expected sync errors, got {other:?}"),
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(installation_ids(&store, 3).await, vec![30]);
}

#[tokio::test]
async fn test_apps_without_github_app_id_are_skipped() {
    let store = store_with_apps(&[0, 5]).await;
    let factory = Arc::new(ScriptedFactory::default());

    BackfillWorker::new(store, factory.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(factory.created(), vec![5]);
}

#[tokio::test]
async fn test_listing_failure_aborts_backfill() {
    let store = Arc::new(FlakyStore::new(InMemoryStore::new()).fail_list());
    store
        .create(&test_app(1, "https://github.com"))
        .await
        .unwrap();
    let factory = Arc::new(ScriptedFactory::default());

    let result = BackfillWorker::new(store, factory.clone()).run().await;

    assert!(matches!(result, Err(BackfillError::ListApps(_))));
    assert!(factory.created().is_empty());
}

#[tokio::test]
async fn test_backfill_against_github_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/app/installations$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 77,
                "html_url": "https://ghe.example.com/organizations/octo-org/settings/installations/77",
                "account": {
                    "login": "octo-org",
                    "avatar_url": "https://ghe.example.com/avatars/u/3",
                    "html_url": "https://ghe.example.com/octo-org",
                    "type": "Organization"
                }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryStore::new());
    let id = store.create(&test_app(4242, &server.uri())).await.unwrap();

    BackfillWorker::new(store.clone(), Arc::new(OctocrabClientFactory))
        .run()
        .await
        .expect("backfill should succeed");

    let installations = store.get_installations(id).await.unwrap();
    assert_eq!(installations.len(), 1);
    assert_eq!(installations[0].installation_id, 77);
    assert_eq!(installations[0].account_login, "octo-org");
    assert_eq!(installations[0].account_type, "Organization");
}

#[tokio::test]
async fn test_octocrab_factory_rejects_invalid_key() {
    let mut app = test_app(1, "https://github.com");
    app.private_key = "not-a-pem".to_string();

    let result = OctocrabClientFactory.create(&app);

    assert!(matches!(result, Err(github_client::Error::AuthError(_))));
}
