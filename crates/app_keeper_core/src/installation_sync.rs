//! Reconciliation of stored installations with the ones GitHub reports.
//!
//! A pass for one app works on a snapshot of its stored installations:
//!
//! 1. Read the stored installations. If that fails the pass stops.
//! 2. List the app's installations on GitHub. If that fails the app may have
//!    been deleted on GitHub, so every stored installation of the app is
//!    removed before the pass stops.
//! 3. Upsert every reported installation, including ones already stored, so
//!    account metadata stays current.
//! 4. Remove stored installations GitHub no longer reports, in one call.
//!
//! Individual upsert failures are recorded and the pass continues. Running
//! two passes for the same app at the same time is not supported.

use app_store::{GitHubApp, GitHubAppInstallation, GitHubAppsStore};
use github_client::InstallationsClient;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::{SyncError, SyncErrors};

#[cfg(test)]
#[path = "installation_sync_tests.rs"]
mod tests;

/// Syncs the stored installations of apps with GitHub.
#[derive(Clone)]
pub struct InstallationSyncer {
    store: Arc<dyn GitHubAppsStore>,
}

impl InstallationSyncer {
    pub fn new(store: Arc<dyn GitHubAppsStore>) -> Self {
        Self { store }
    }

    /// Runs one sync pass for `app` using `client` to reach GitHub.
    ///
    /// # Errors
    ///
    /// Returns every failure of the pass. A failed upsert does not stop the
    /// remaining installations from being processed.
    #[instrument(skip(self, app, client), fields(app_id = app.app_id, app_name = %app.name))]
    pub async fn sync_installations(
        &self,
        app: &GitHubApp,
        client: &dyn InstallationsClient,
    ) -> Result<(), SyncErrors> {
        let mut errors = SyncErrors::new();

        let local = match self.store.get_installations(app.id).await {
            Ok(local) => local,
            Err(source) => {
                error!(error = %source, "Failed to read stored installations");
                errors.push(SyncError::ListLocal {
                    app_id: app.app_id,
                    app_name: app.name.clone(),
                    source,
                });
                return errors.into_result();
            }
        };

        let remote = match client.get_app_installations().await {
            Ok(remote) => remote,
            Err(source) => {
                error!(error = %source, "Failed to list installations on GitHub");
                errors.push(SyncError::ListRemote {
                    app_id: app.app_id,
                    app_name: app.name.clone(),
                    source,
                });

                let stored: Vec<u64> = local.iter().map(|i| i.installation_id).collect();
                if !stored.is_empty() {
                    warn!(
                        installation_ids = ?stored,
                        "Removing all stored installations because the app could not be listed on GitHub"
                    );
                    self.remove(app, stored, &mut errors).await;
                }
                return errors.into_result();
            }
        };

        let mut unreported: BTreeSet<u64> = local.iter().map(|i| i.installation_id).collect();

        for installation in &remote {
            let Some(record) = GitHubAppInstallation::from_remote(app.id, installation) else {
                debug!("Skipping installation reported without an ID");
                continue;
            };

            let installation_id = record.installation_id;
            unreported.remove(&installation_id);

            if let Err(source) = self.store.install(record).await {
                error!(
                    installation_id = installation_id,
                    error = %source,
                    "Failed to store installation"
                );
                errors.push(SyncError::UpsertInstallation {
                    app_id: app.app_id,
                    app_name: app.name.clone(),
                    installation_id,
                    source,
                });
            }
        }

        if !unreported.is_empty() {
            let removed: Vec<u64> = unreported.into_iter().collect();
            info!(installation_ids = ?removed, "Removing installations no longer reported by GitHub");
            self.remove(app, removed, &mut errors).await;
        }

        info!(
            remote = remote.len(),
            errors = errors.len(),
            "Finished syncing installations"
        );
        errors.into_result()
    }

    async fn remove(&self, app: &GitHubApp, installation_ids: Vec<u64>, errors: &mut SyncErrors) {
        if let Err(source) = self
            .store
            .bulk_remove_installations(app.id, &installation_ids)
            .await
        {
            error!(
                installation_ids = ?installation_ids,
                error = %source,
                "Failed to remove installations"
            );
            errors.push(SyncError::RemoveInstallations {
                app_id: app.app_id,
                app_name: app.name.clone(),
                installation_ids,
                source,
            });
        }
    }
}
