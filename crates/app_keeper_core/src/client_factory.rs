//! Construction of per-app GitHub clients for the backfill.

use app_store::GitHubApp;
use github_client::{create_app_client, GitHubClient, InstallationsClient};

/// Builds an [`InstallationsClient`] authenticated as one app.
pub trait InstallationsClientFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns a `github_client::Error` if the app's key or base URL is
    /// unusable.
    fn create(&self, app: &GitHubApp) -> Result<Box<dyn InstallationsClient>, github_client::Error>;
}

/// Creates octocrab backed clients from the app's stored credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct OctocrabClientFactory;

impl InstallationsClientFactory for OctocrabClientFactory {
    fn create(&self, app: &GitHubApp) -> Result<Box<dyn InstallationsClient>, github_client::Error> {
        let octocrab = create_app_client(app.app_id, &app.private_key, &app.base_url)?;
        Ok(Box::new(GitHubClient::new(octocrab)))
    }
}
