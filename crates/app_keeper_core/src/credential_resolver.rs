//! Turns a connection configuration into a [`Credential`].
//!
//! A connection without GitHub App details authenticates with its personal
//! access token. A connection with app details authenticates as an
//! installation of that app:
//!
//! 1. The app is looked up by `(app_id, base_url)` in the store.
//! 2. Its private key becomes an [`AppAuthenticator`].
//! 3. The app authenticator is wrapped in an [`InstallationAuthenticator`]
//!    bound to the configured installation, or for
//!    [`CredentialResolver::resolve_for_repository`], to the installation on
//!    the repository owner's account.
//!
//! Callers only ever see a [`Credential`] and never need to know which path
//! was taken.

use app_store::{GitHubApp, GitHubAppsStore};
use auth_handler::{
    AppAuthenticator, Credential, InstallationAuthenticator, OAuthBearerToken, TokenCache,
};
use encryption::Cipher;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{GitHubAppDetails, GitHubConnection, ResolveError};

#[cfg(test)]
#[path = "credential_resolver_tests.rs"]
mod tests;

/// Resolves connections to credentials.
///
/// Installation credentials built by the resolver share its token cache and
/// cipher, so tokens fetched through one credential are visible to others for
/// the same installation.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn GitHubAppsStore>,
    cache: Arc<dyn TokenCache>,
    cipher: Cipher,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn GitHubAppsStore>, cache: Arc<dyn TokenCache>, cipher: Cipher) -> Self {
        Self {
            store,
            cache,
            cipher,
        }
    }

    /// Resolves the credential for `connection`.
    ///
    /// # Errors
    ///
    /// - `ResolveError::MissingToken` if there are no app details and no token.
    /// - `ResolveError::Store` with `StoreError::AppNotFound` if the app is not
    ///   registered for the connection's base URL.
    /// - `ResolveError::Auth` if the stored private key cannot be parsed.
    #[instrument(skip(self, connection), fields(url = %connection.url))]
    pub async fn resolve(&self, connection: &GitHubConnection) -> Result<Credential, ResolveError> {
        let Some(details) = &connection.github_app_details else {
            return static_token(connection);
        };

        let base_url = connection.app_base_url();
        let app = self.store.get_by_app_id(details.app_id, base_url).await?;
        self.installation_credential(&app, details, details.installation_id, base_url)
    }

    /// Resolves the credential for acting on `repository` (`owner/name`).
    ///
    /// With a GitHub App configured, the installation is the one on the
    /// repository owner's account rather than the configured installation.
    ///
    /// # Errors
    ///
    /// As [`CredentialResolver::resolve`], plus
    /// `ResolveError::InvalidRepository` for a malformed name and
    /// `StoreError::InstallationNotFound` if the app is not installed on the
    /// owner's account.
    #[instrument(skip(self, connection), fields(url = %connection.url))]
    pub async fn resolve_for_repository(
        &self,
        connection: &GitHubConnection,
        repository: &str,
    ) -> Result<Credential, ResolveError> {
        let Some(details) = &connection.github_app_details else {
            return static_token(connection);
        };

        let owner = repository_owner(repository)?;
        let base_url = connection.app_base_url();
        let app = self.store.get_by_app_id(details.app_id, base_url).await?;
        let installation_id = self.store.get_install_id(app.id, owner).await?;

        debug!(
            owner = owner,
            installation_id = installation_id,
            "Resolved installation for repository owner"
        );
        self.installation_credential(&app, details, installation_id, base_url)
    }

    fn installation_credential(
        &self,
        app: &GitHubApp,
        details: &GitHubAppDetails,
        installation_id: u64,
        base_url: &str,
    ) -> Result<Credential, ResolveError> {
        let app_authenticator = AppAuthenticator::new(details.app_id, app.private_key.as_bytes())?;
        let installation = InstallationAuthenticator::new(
            installation_id,
            base_url,
            Arc::new(app_authenticator),
            self.cache.clone(),
            self.cipher.clone(),
        )?;

        debug!(
            app_id = details.app_id,
            installation_id = installation_id,
            "Resolved GitHub App installation credential"
        );
        Ok(Credential::Installation(Arc::new(installation)))
    }
}

fn static_token(connection: &GitHubConnection) -> Result<Credential, ResolveError> {
    match connection.token.as_deref() {
        Some(token) if !token.is_empty() => Ok(Credential::Token(OAuthBearerToken::new(token))),
        _ => Err(ResolveError::MissingToken(connection.url.clone())),
    }
}

/// The owner of an `owner/name` repository name.
fn repository_owner(repository: &str) -> Result<&str, ResolveError> {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(owner)
        }
        _ => Err(ResolveError::InvalidRepository(repository.to_string())),
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}
