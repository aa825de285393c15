use std::fmt;
use std::sync::Arc;

use app_keeper_core::{
    BackfillError, BackfillWorker, InstallationsClientFactory, OctocrabClientFactory, SyncErrors,
};
use app_store::GitHubAppsStore;
use tracing::{info, instrument, warn};

use crate::commands::seed_store;
use crate::config::AppConfig;
use crate::errors::Error;

/// Installation count of one app after a backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSummary {
    pub app_id: u64,
    pub name: String,
    pub base_url: String,
    pub installations: usize,
}

/// Outcome of a backfill run.
///
/// A run that could sync some apps but not others still produces a report;
/// the failures are kept in `errors`.
#[derive(Debug)]
pub struct BackfillReport {
    pub apps: Vec<AppSummary>,
    pub errors: Option<SyncErrors>,
}

impl BackfillReport {
    pub fn succeeded(&self) -> bool {
        self.errors.is_none()
    }
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for app in &self.apps {
            writeln!(
                f,
                "{} ({}) on {}: {} installation(s)",
                app.name, app.app_id, app.base_url, app.installations
            )?;
        }
        if let Some(errors) = &self.errors {
            write!(f, "{errors}")?;
        }
        Ok(())
    }
}

/// Seeds a store from `config` and backfills it from GitHub.
pub async fn execute(config: &AppConfig) -> Result<BackfillReport, Error> {
    let store = seed_store(config).await?;
    run_backfill(store, Arc::new(OctocrabClientFactory)).await
}

/// Runs the backfill over `store` and summarises the result.
///
/// # Errors
///
/// Returns an error only when the run could not happen at all. Per-app sync
/// failures end up in [`BackfillReport::errors`].
#[instrument(skip_all)]
pub async fn run_backfill(
    store: Arc<dyn GitHubAppsStore>,
    clients: Arc<dyn InstallationsClientFactory>,
) -> Result<BackfillReport, Error> {
    let worker = BackfillWorker::new(store.clone(), clients);

    let errors = match worker.run().await {
        Ok(()) => None,
        Err(BackfillError::Sync(errors)) => {
            warn!(count = errors.len(), "Backfill finished with errors");
            Some(errors)
        }
        Err(e) => return Err(e.into()),
    };

    let mut apps = Vec::new();
    for app in store.list(None).await? {
        let installations = store.get_installations(app.id).await?.len();
        apps.push(AppSummary {
            app_id: app.app_id,
            name: app.name,
            base_url: app.base_url,
            installations,
        });
    }

    info!(apps = apps.len(), "Backfill finished");
    Ok(BackfillReport { apps, errors })
}
