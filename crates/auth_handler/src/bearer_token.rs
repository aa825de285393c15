//! Static personal access or OAuth tokens.

use url::Url;

use crate::{set_bearer, sha256_hex, AuthError, AuthResult, Authenticator, UrlAuthenticator};

#[cfg(test)]
#[path = "bearer_token_tests.rs"]
mod tests;

/// A token configured directly on a connection. It never expires from this
/// crate's point of view.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthBearerToken {
    token: String,
}

impl OAuthBearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Authenticator for OAuthBearerToken {
    fn authenticate(&self, request: &mut reqwest::Request) -> AuthResult<()> {
        set_bearer(request, &self.token)
    }

    fn hash(&self) -> String {
        sha256_hex(self.token.as_bytes())
    }
}

impl UrlAuthenticator for OAuthBearerToken {
    /// Uses the token as the URL user name, with no password.
    fn set_url_user(&self, url: &mut Url) -> AuthResult<()> {
        url.set_username(&self.token)
            .map_err(|_| AuthError::UrlCannotHaveCredentials(url.to_string()))?;
        url.set_password(None)
            .map_err(|_| AuthError::UrlCannotHaveCredentials(url.to_string()))
    }
}

impl std::fmt::Debug for OAuthBearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthBearerToken")
            .field("token", &"<REDACTED>")
            .finish()
    }
}
