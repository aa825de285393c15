//! In-memory implementation of `GitHubAppsStore`.
//!
//! All state is held in memory and lost on restart. App secrets can be
//! encrypted at rest with [`InMemoryStore::with_encryption_key`].

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use encryption::{Cipher, EncryptionKey};
use github_client::normalize_base_url;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{AppDomain, GitHubApp, GitHubAppInstallation, GitHubAppsStore, StoreError};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// An app as held in memory. Secret fields hold base64 ciphertext when
/// `encrypted` is set.
#[derive(Clone)]
struct StoredApp {
    app: GitHubApp,
    encrypted: bool,
}

#[derive(Default)]
struct State {
    apps: BTreeMap<i64, StoredApp>,
    installations: BTreeMap<(i64, u64), GitHubAppInstallation>,
    next_id: i64,
}

/// In-memory GitHub Apps store.
///
/// Apps and installations live behind a single `RwLock`, so every operation
/// sees a consistent snapshot.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    cipher: Cipher,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypts private keys, client secrets and webhook secrets of apps
    /// written from now on.
    pub fn with_encryption_key(mut self, key: Arc<dyn EncryptionKey>) -> Self {
        self.cipher = Cipher::new(key);
        self
    }

    async fn seal_secret(&self, secret: &str) -> Result<String, StoreError> {
        let sealed = self.cipher.seal(secret.as_bytes().to_vec()).await?;
        Ok(STANDARD.encode(sealed))
    }

    async fn open_secret(&self, stored: &str) -> Result<String, StoreError> {
        let sealed = STANDARD
            .decode(stored)
            .map_err(|e| StoreError::CorruptSecret(e.to_string()))?;
        let plaintext = self.cipher.open(sealed).await?;
        String::from_utf8(plaintext).map_err(|e| StoreError::CorruptSecret(e.to_string()))
    }

    async fn seal(&self, mut app: GitHubApp) -> Result<StoredApp, StoreError> {
        if !self.cipher.is_encrypting() {
            return Ok(StoredApp {
                app,
                encrypted: false,
            });
        }

        app.client_secret = self.seal_secret(&app.client_secret).await?;
        app.private_key = self.seal_secret(&app.private_key).await?;
        app.webhook_secret = match app.webhook_secret {
            Some(secret) => Some(self.seal_secret(&secret).await?),
            None => None,
        };

        Ok(StoredApp {
            app,
            encrypted: true,
        })
    }

    async fn open(&self, stored: StoredApp) -> Result<GitHubApp, StoreError> {
        let mut app = stored.app;
        if !stored.encrypted {
            return Ok(app);
        }

        app.client_secret = self.open_secret(&app.client_secret).await?;
        app.private_key = self.open_secret(&app.private_key).await?;
        app.webhook_secret = match app.webhook_secret {
            Some(secret) => Some(self.open_secret(&secret).await?),
            None => None,
        };
        Ok(app)
    }

    async fn open_all(&self, stored: Vec<StoredApp>) -> Result<Vec<GitHubApp>, StoreError> {
        let mut apps = Vec::with_capacity(stored.len());
        for app in stored {
            apps.push(self.open(app).await?);
        }
        Ok(apps)
    }

    /// Finds the first app matching `predicate`, decrypted.
    async fn find<F>(&self, criteria: String, predicate: F) -> Result<GitHubApp, StoreError>
    where
        F: Fn(&GitHubApp) -> bool + Send,
    {
        let found = {
            let state = self.state.read().await;
            state
                .apps
                .values()
                .find(|stored| predicate(&stored.app))
                .cloned()
        };

        match found {
            Some(stored) => self.open(stored).await,
            None => Err(StoreError::AppNotFound { criteria }),
        }
    }
}

fn same_base_url(stored: &str, wanted: &str) -> bool {
    normalize_base_url(stored) == wanted
}

/// Enforces the uniqueness rules for `app` against every app except `except`.
fn check_unique(state: &State, app: &GitHubApp, except: Option<i64>) -> Result<(), StoreError> {
    let base_url = normalize_base_url(&app.base_url);

    for (id, stored) in &state.apps {
        if Some(*id) == except || !same_base_url(&stored.app.base_url, &base_url) {
            continue;
        }

        if stored.app.app_id == app.app_id {
            return Err(StoreError::Conflict(format!(
                "app {} is already registered for {base_url}",
                app.app_id
            )));
        }

        if app.domain == AppDomain::Batches && stored.app.domain == AppDomain::Batches {
            return Err(StoreError::Conflict(format!(
                "a batches app is already registered for {base_url}"
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl GitHubAppsStore for InMemoryStore {
    async fn create(&self, app: &GitHubApp) -> Result<i64, StoreError> {
        let mut stored = self.seal(app.clone()).await?;

        let mut state = self.state.write().await;
        check_unique(&state, app, None)?;

        state.next_id += 1;
        let id = state.next_id;
        let now = Utc::now();
        stored.app.id = id;
        stored.app.created_at = now;
        stored.app.updated_at = now;
        state.apps.insert(id, stored);

        info!(id = id, app_id = app.app_id, app_name = %app.name, "Registered GitHub App");
        Ok(id)
    }

    async fn update(&self, id: i64, app: &GitHubApp) -> Result<GitHubApp, StoreError> {
        let mut stored = self.seal(app.clone()).await?;

        let updated = {
            let mut state = self.state.write().await;
            let created_at = match state.apps.get(&id) {
                Some(existing) => existing.app.created_at,
                None => {
                    return Err(StoreError::AppNotFound {
                        criteria: format!("id = {id}"),
                    })
                }
            };
            check_unique(&state, app, Some(id))?;

            stored.app.id = id;
            stored.app.created_at = created_at;
            stored.app.updated_at = Utc::now();
            state.apps.insert(id, stored.clone());
            stored
        };

        debug!(id = id, app_id = app.app_id, "Updated GitHub App");
        self.open(updated).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.apps.remove(&id).is_none() {
            return Ok(());
        }

        let before = state.installations.len();
        state.installations.retain(|(app, _), _| *app != id);
        let removed = before - state.installations.len();

        info!(id = id, installations_removed = removed, "Deleted GitHub App");
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<GitHubApp, StoreError> {
        self.find(format!("id = {id}"), |app| app.id == id).await
    }

    async fn get_by_app_id(&self, app_id: u64, base_url: &str) -> Result<GitHubApp, StoreError> {
        let base_url = normalize_base_url(base_url);
        self.find(
            format!("app_id = {app_id} AND base_url = {base_url}"),
            |app| app.app_id == app_id && same_base_url(&app.base_url, &base_url),
        )
        .await
    }

    async fn get_by_slug(&self, slug: &str, base_url: &str) -> Result<GitHubApp, StoreError> {
        let base_url = normalize_base_url(base_url);
        self.find(format!("slug = {slug} AND base_url = {base_url}"), |app| {
            app.slug == slug && same_base_url(&app.base_url, &base_url)
        })
        .await
    }

    async fn get_by_domain(
        &self,
        domain: AppDomain,
        base_url: &str,
    ) -> Result<GitHubApp, StoreError> {
        let base_url = normalize_base_url(base_url);
        self.find(
            format!("domain = {domain} AND base_url = {base_url}"),
            |app| app.domain == domain && same_base_url(&app.base_url, &base_url),
        )
        .await
    }

    async fn list(&self, domain: Option<AppDomain>) -> Result<Vec<GitHubApp>, StoreError> {
        let stored: Vec<StoredApp> = {
            let state = self.state.read().await;
            state
                .apps
                .values()
                .filter(|stored| domain.is_none_or(|d| stored.app.domain == d))
                .cloned()
                .collect()
        };

        self.open_all(stored).await
    }

    async fn install(
        &self,
        installation: GitHubAppInstallation,
    ) -> Result<GitHubAppInstallation, StoreError> {
        let mut state = self.state.write().await;
        if !state.apps.contains_key(&installation.app_id) {
            return Err(StoreError::AppNotFound {
                criteria: format!("id = {}", installation.app_id),
            });
        }

        let key = (installation.app_id, installation.installation_id);
        let now = Utc::now();
        let created_at = state
            .installations
            .get(&key)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let record = GitHubAppInstallation {
            created_at,
            updated_at: now,
            ..installation
        };
        state.installations.insert(key, record.clone());

        debug!(
            app_id = record.app_id,
            installation_id = record.installation_id,
            account_login = %record.account_login,
            "Stored GitHub App installation"
        );
        Ok(record)
    }

    async fn get_installations(&self, id: i64) -> Result<Vec<GitHubAppInstallation>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .installations
            .range((id, u64::MIN)..=(id, u64::MAX))
            .map(|(_, installation)| installation.clone())
            .collect())
    }

    async fn bulk_remove_installations(
        &self,
        id: i64,
        installation_ids: &[u64],
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for installation_id in installation_ids {
            state.installations.remove(&(id, *installation_id));
        }

        debug!(app_id = id, installation_ids = ?installation_ids, "Removed GitHub App installations");
        Ok(())
    }

    async fn get_install_id(&self, id: i64, account_login: &str) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        state
            .installations
            .range((id, u64::MIN)..=(id, u64::MAX))
            .map(|(_, installation)| installation)
            .find(|installation| installation.account_login.eq_ignore_ascii_case(account_login))
            .map(|installation| installation.installation_id)
            .ok_or_else(|| StoreError::InstallationNotFound {
                app_id: id,
                account_login: account_login.to_string(),
            })
    }
}
