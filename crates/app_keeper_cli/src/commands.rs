//! Command modules for the App Keeper CLI.
//!
//! - `backfill_cmd`: syncs the installations of every configured app
//! - `token_cmd`: issues an installation access token for one app

use std::sync::Arc;

use app_store::{GitHubAppsStore, InMemoryStore};
use tracing::{debug, info};

use crate::config::{key_from_env, AppConfig};
use crate::errors::Error;

pub mod backfill_cmd;
pub mod token_cmd;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// Builds an in-memory store holding every app in `config`.
///
/// App secrets are encrypted at rest when `store.encryption_key_env` is set.
pub async fn seed_store(config: &AppConfig) -> Result<Arc<InMemoryStore>, Error> {
    let mut store = InMemoryStore::new();
    if let Some(key) = key_from_env(config.store.encryption_key_env.as_deref())? {
        store = store.with_encryption_key(key);
    }

    for app in config.github_apps()? {
        let id = store.create(&app).await?;
        debug!(id, app_id = app.app_id, app_name = %app.name, "Registered GitHub App");
    }

    info!(apps = config.apps.len(), "Seeded app store from configuration");
    Ok(Arc::new(store))
}
