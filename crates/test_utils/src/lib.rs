//! Test utilities shared by the workspace's unit and integration tests.
//!
//! This crate provides RSA key material for GitHub App authentication tests,
//! app and installation fixtures, and stand-ins for the store and the GitHub
//! installations API that can be scripted to fail.

use app_store::{GitHubApp, GitHubAppInstallation, GitHubAppsStore, StoreError};
use async_trait::async_trait;
use github_client::{Account, Installation, InstallationsClient};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::EncodePrivateKey;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::debug;

/// A PEM encoded RSA key pair.
#[derive(Debug, Clone)]
pub struct TestKeyPair {
    /// PKCS#8 private key.
    pub private_pem: String,
    /// PKCS#1 public key, for verifying signed JWTs.
    pub public_pem: String,
}

/// Generates a fresh 2048 bit RSA key pair.
///
/// Key generation is slow in debug builds. Prefer [`rsa_key_pair`] unless a
/// test needs two distinct keys.
pub fn generate_rsa_key_pair() -> TestKeyPair {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA key");

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .expect("Failed to encode private key")
        .to_string();
    let public_pem = private_key
        .to_public_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("Failed to encode public key");

    TestKeyPair {
        private_pem,
        public_pem,
    }
}

/// A key pair generated once per test binary.
pub fn rsa_key_pair() -> &'static TestKeyPair {
    static KEY_PAIR: OnceLock<TestKeyPair> = OnceLock::new();
    KEY_PAIR.get_or_init(generate_rsa_key_pair)
}

/// A `repos` app on `base_url` whose private key is [`rsa_key_pair`].
pub fn test_app(app_id: u64, base_url: &str) -> GitHubApp {
    GitHubApp {
        app_id,
        name: format!("Test App {app_id}"),
        slug: format!("test-app-{app_id}"),
        base_url: base_url.to_string(),
        app_url: format!("{}/apps/test-app-{app_id}", base_url.trim_end_matches('/')),
        client_id: format!("Iv1.{app_id:016x}"),
        client_secret: "client-secret".to_string(),
        private_key: rsa_key_pair().private_pem.clone(),
        webhook_secret: Some("webhook-secret".to_string()),
        logo: "logo.png".to_string(),
        ..Default::default()
    }
}

/// An installation as GitHub reports it, on an organization named `login`.
pub fn remote_installation(id: u64, login: &str) -> Installation {
    Installation {
        id: Some(id),
        html_url: Some(format!(
            "https://github.com/organizations/{login}/settings/installations/{id}"
        )),
        account: Some(Account {
            login: Some(login.to_string()),
            avatar_url: Some(format!("https://avatars.githubusercontent.com/{login}")),
            html_url: Some(format!("https://github.com/{login}")),
            account_type: Some("Organization".to_string()),
        }),
    }
}

/// The local record of installation `id` for app `app_id` (local ID).
pub fn local_installation(app_id: i64, id: u64, login: &str) -> GitHubAppInstallation {
    GitHubAppInstallation::from_remote(app_id, &remote_installation(id, login))
        .expect("remote installation has an ID")
}

enum Script {
    Installations(Vec<Installation>),
    Fail { status: u16, message: String },
}

/// An [`InstallationsClient`] that returns a fixed answer and counts calls.
pub struct ScriptedInstallationsClient {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedInstallationsClient {
    pub fn returning(installations: Vec<Installation>) -> Self {
        Self {
            script: Script::Installations(installations),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call with `github_client::Error::ApiError`.
    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            script: Script::Fail {
                status,
                message: message.to_string(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstallationsClient for ScriptedInstallationsClient {
    async fn get_app_installations(&self) -> Result<Vec<Installation>, github_client::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Installations(installations) => Ok(installations.clone()),
            Script::Fail { status, message } => Err(github_client::Error::ApiError {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// A [`GitHubAppsStore`] wrapper that fails selected operations and records
/// bulk removals.
pub struct FlakyStore<S> {
    inner: S,
    fail_install_ids: HashSet<u64>,
    fail_bulk_remove: bool,
    fail_get_installations: bool,
    fail_list: bool,
    bulk_removals: Mutex<Vec<(i64, Vec<u64>)>>,
}

impl<S: GitHubAppsStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_install_ids: HashSet::new(),
            fail_bulk_remove: false,
            fail_get_installations: false,
            fail_list: false,
            bulk_removals: Mutex::new(Vec::new()),
        }
    }

    /// Fails `install` for this installation ID.
    pub fn fail_install_for(mut self, installation_id: u64) -> Self {
        self.fail_install_ids.insert(installation_id);
        self
    }

    pub fn fail_bulk_remove(mut self) -> Self {
        self.fail_bulk_remove = true;
        self
    }

    pub fn fail_get_installations(mut self) -> Self {
        self.fail_get_installations = true;
        self
    }

    pub fn fail_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Every `bulk_remove_installations` call, including failed ones.
    pub fn bulk_removals(&self) -> Vec<(i64, Vec<u64>)> {
        self.bulk_removals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn injected(operation: &str) -> StoreError {
    StoreError::Backend(format!("injected {operation} failure"))
}

#[async_trait]
impl<S: GitHubAppsStore> GitHubAppsStore for FlakyStore<S> {
    async fn create(&self, app: &GitHubApp) -> Result<i64, StoreError> {
        self.inner.create(app).await
    }

    async fn update(&self, id: i64, app: &GitHubApp) -> Result<GitHubApp, StoreError> {
        self.inner.update(id, app).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<GitHubApp, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_app_id(&self, app_id: u64, base_url: &str) -> Result<GitHubApp, StoreError> {
        self.inner.get_by_app_id(app_id, base_url).await
    }

    async fn get_by_slug(&self, slug: &str, base_url: &str) -> Result<GitHubApp, StoreError> {
        self.inner.get_by_slug(slug, base_url).await
    }

    async fn get_by_domain(
        &self,
        domain: app_store::AppDomain,
        base_url: &str,
    ) -> Result<GitHubApp, StoreError> {
        self.inner.get_by_domain(domain, base_url).await
    }

    async fn list(
        &self,
        domain: Option<app_store::AppDomain>,
    ) -> Result<Vec<GitHubApp>, StoreError> {
        if self.fail_list {
            return Err(injected("list"));
        }
        self.inner.list(domain).await
    }

    async fn install(
        &self,
        installation: GitHubAppInstallation,
    ) -> Result<GitHubAppInstallation, StoreError> {
        if self.fail_install_ids.contains(&installation.installation_id) {
            debug!(installation_id = installation.installation_id, "Injecting install failure");
            return Err(injected("install"));
        }
        self.inner.install(installation).await
    }

    async fn get_installations(&self, id: i64) -> Result<Vec<GitHubAppInstallation>, StoreError> {
        if self.fail_get_installations {
            return Err(injected("get_installations"));
        }
        self.inner.get_installations(id).await
    }

    async fn bulk_remove_installations(
        &self,
        id: i64,
        installation_ids: &[u64],
    ) -> Result<(), StoreError> {
        self.bulk_removals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, installation_ids.to_vec()));

        if self.fail_bulk_remove {
            return Err(injected("bulk_remove_installations"));
        }
        self.inner.bulk_remove_installations(id, installation_ids).await
    }

    async fn get_install_id(&self, id: i64, account_login: &str) -> Result<u64, StoreError> {
        self.inner.get_install_id(id, account_login).await
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
