//! The credential a connection resolved to.

use std::sync::Arc;
use url::Url;

use crate::{
    AuthResult, Authenticator, HttpClient, InstallationAuthenticator, OAuthBearerToken,
    UrlAuthenticator,
};

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;

/// Either a static token or a refreshable installation token.
#[derive(Debug, Clone)]
pub enum Credential {
    Token(OAuthBearerToken),
    Installation(Arc<InstallationAuthenticator>),
}

impl Credential {
    /// Static tokens never need a refresh.
    pub fn needs_refresh(&self) -> bool {
        match self {
            Credential::Token(_) => false,
            Credential::Installation(installation) => installation.needs_refresh(),
        }
    }

    /// Refreshes an installation token. A no-op for static tokens.
    ///
    /// # Errors
    ///
    /// See [`InstallationAuthenticator::refresh`].
    pub async fn refresh(&self, client: &dyn HttpClient) -> AuthResult<()> {
        match self {
            Credential::Token(_) => Ok(()),
            Credential::Installation(installation) => installation.refresh(client).await,
        }
    }

    /// Refreshes only if the held token is missing or stale.
    pub async fn ensure_fresh(&self, client: &dyn HttpClient) -> AuthResult<()> {
        if self.needs_refresh() {
            self.refresh(client).await?;
        }
        Ok(())
    }

    /// Makes sure the credential is fresh, then authenticates `request`.
    pub async fn authorize(
        &self,
        client: &dyn HttpClient,
        request: &mut reqwest::Request,
    ) -> AuthResult<()> {
        self.ensure_fresh(client).await?;
        self.authenticate(request)
    }
}

impl Authenticator for Credential {
    fn authenticate(&self, request: &mut reqwest::Request) -> AuthResult<()> {
        match self {
            Credential::Token(token) => token.authenticate(request),
            Credential::Installation(installation) => installation.authenticate(request),
        }
    }

    fn hash(&self) -> String {
        match self {
            Credential::Token(token) => token.hash(),
            Credential::Installation(installation) => installation.hash(),
        }
    }
}

impl UrlAuthenticator for Credential {
    fn set_url_user(&self, url: &mut Url) -> AuthResult<()> {
        match self {
            Credential::Token(token) => token.set_url_user(url),
            Credential::Installation(installation) => installation.set_url_user(url),
        }
    }
}
