//! Installation sync across every registered app.

use app_store::GitHubAppsStore;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::{BackfillError, InstallationSyncer, InstallationsClientFactory, SyncError, SyncErrors};

#[cfg(test)]
#[path = "backfill_tests.rs"]
mod tests;

/// Brings the stored installations of every app up to date with GitHub.
///
/// One app failing never prevents the remaining apps from being synced.
pub struct BackfillWorker {
    store: Arc<dyn GitHubAppsStore>,
    syncer: InstallationSyncer,
    clients: Arc<dyn InstallationsClientFactory>,
}

impl BackfillWorker {
    pub fn new(store: Arc<dyn GitHubAppsStore>, clients: Arc<dyn InstallationsClientFactory>) -> Self {
        Self {
            syncer: InstallationSyncer::new(store.clone()),
            store,
            clients,
        }
    }

    /// Syncs every app with a GitHub app ID.
    ///
    /// # Errors
    ///
    /// - `BackfillError::ListApps` if the apps cannot be listed; nothing is
    ///   synced in that case.
    /// - `BackfillError::Sync` with the failures of every app otherwise.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), BackfillError> {
        let apps = self.store.list(None).await.map_err(|e| {
            error!(error = %e, "Failed to list GitHub Apps");
            BackfillError::ListApps(e)
        })?;

        let mut errors = SyncErrors::new();
        let mut synced = 0usize;

        for app in &apps {
            if app.app_id == 0 {
                debug!(id = app.id, app_name = %app.name, "Skipping app without a GitHub app ID");
                continue;
            }

            let client = match self.clients.create(app) {
                Ok(client) => client,
                Err(source) => {
                    error!(
                        app_id = app.app_id,
                        app_name = %app.name,
                        error = %source,
                        "Failed to create GitHub client, skipping app"
                    );
                    errors.push(SyncError::CreateClient {
                        app_id: app.app_id,
                        app_name: app.name.clone(),
                        source,
                    });
                    continue;
                }
            };

            if let Err(app_errors) = self.syncer.sync_installations(app, client.as_ref()).await {
                errors.append(app_errors);
            }
            synced += 1;
        }

        info!(
            apps = apps.len(),
            synced = synced,
            errors = errors.len(),
            "Finished installation backfill"
        );
        errors.into_result().map_err(BackfillError::from)
    }
}
