//! Persistence of registered GitHub Apps and their installations.
//!
//! The [`GitHubAppsStore`] trait is what the credential resolver, the
//! installation sync and the backfill worker depend on. [`InMemoryStore`] is
//! the implementation shipped with this workspace.
//!
//! Base URLs are compared with trailing slashes removed, so an app registered
//! for `https://github.com/` is found by a lookup for `https://github.com`.

use async_trait::async_trait;

pub mod errors;
pub use errors::StoreError;

mod memory;
pub use memory::InMemoryStore;

pub mod types;
pub use types::{AppDomain, GitHubApp, GitHubAppInstallation};

/// Storage for GitHub Apps and their installations.
///
/// App IDs named `id` are local identifiers assigned by [`create`]; `app_id`
/// parameters are the numeric IDs GitHub assigned to the app.
///
/// [`create`]: GitHubAppsStore::create
#[async_trait]
pub trait GitHubAppsStore: Send + Sync {
    /// Registers a new app and returns its local ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if an app with the same GitHub app ID
    /// exists for the base URL, or if a second `batches` app would be
    /// registered for the same base URL.
    async fn create(&self, app: &GitHubApp) -> Result<i64, StoreError>;

    /// Replaces the stored fields of app `id`, keeping its creation time.
    async fn update(&self, id: i64, app: &GitHubApp) -> Result<GitHubApp, StoreError>;

    /// Deletes app `id` and all of its installations. Deleting an app that
    /// does not exist is not an error.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<GitHubApp, StoreError>;

    async fn get_by_app_id(&self, app_id: u64, base_url: &str) -> Result<GitHubApp, StoreError>;

    async fn get_by_slug(&self, slug: &str, base_url: &str) -> Result<GitHubApp, StoreError>;

    async fn get_by_domain(
        &self,
        domain: AppDomain,
        base_url: &str,
    ) -> Result<GitHubApp, StoreError>;

    /// Lists apps ordered by local ID, optionally only those of one domain.
    async fn list(&self, domain: Option<AppDomain>) -> Result<Vec<GitHubApp>, StoreError>;

    /// Inserts an installation, or updates it if `(app_id, installation_id)`
    /// already exists. An update keeps the original `created_at`.
    async fn install(
        &self,
        installation: GitHubAppInstallation,
    ) -> Result<GitHubAppInstallation, StoreError>;

    /// Installations of app `id`, ordered by installation ID.
    async fn get_installations(&self, id: i64) -> Result<Vec<GitHubAppInstallation>, StoreError>;

    /// Removes the listed installations of app `id`. Unknown IDs are ignored.
    async fn bulk_remove_installations(
        &self,
        id: i64,
        installation_ids: &[u64],
    ) -> Result<(), StoreError>;

    /// The installation ID of app `id` on the account `account_login`.
    /// Logins are compared case-insensitively, as GitHub does.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InstallationNotFound` if the app is not installed
    /// on that account.
    async fn get_install_id(&self, id: i64, account_login: &str) -> Result<u64, StoreError>;
}
