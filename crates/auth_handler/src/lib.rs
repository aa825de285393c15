//! Authentication for GitHub App backed connections.
//!
//! This crate turns GitHub App credentials into something an outgoing HTTP
//! request or git remote URL can carry:
//!
//! - [`AppAuthenticator`] signs short-lived app JWTs from the app's RSA key.
//! - [`InstallationAuthenticator`] holds an installation access token, keeps
//!   it fresh and shares it with other processes through a [`TokenCache`].
//! - [`OAuthBearerToken`] wraps a static personal or OAuth token.
//! - [`Credential`] is whichever of the two a connection resolved to.
//!
//! ## Architecture
//!
//! Callers depend on the [`Authenticator`] and [`UrlAuthenticator`] traits.
//! Network access goes through [`HttpClient`] and shared state through
//! [`TokenCache`], so both can be replaced in tests.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use url::Url;

mod app_authenticator;
pub use app_authenticator::{AppAuthenticator, JWT_BACKDATE_SECS, JWT_LIFETIME_SECS};

mod bearer_token;
pub use bearer_token::OAuthBearerToken;

mod credential;
pub use credential::Credential;

pub mod errors;
pub use errors::{AuthError, CacheError};

mod http_client;
pub use http_client::HttpClient;

mod installation_authenticator;
pub use installation_authenticator::{
    InstallationAccessToken, InstallationAuthenticator, REFRESH_MARGIN_SECS,
};

mod token_cache;
pub use token_cache::{InMemoryTokenCache, TokenCache, INSTALLATION_TOKEN_CACHE_TTL};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Result type for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Something that can attach credentials to an outgoing request.
pub trait Authenticator: Send + Sync {
    /// Sets the `Authorization` header of `request`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidHeader` if the credential cannot be encoded
    /// as a header value.
    fn authenticate(&self, request: &mut reqwest::Request) -> AuthResult<()>;

    /// A stable fingerprint of the credential, usable as a cache key.
    ///
    /// The fingerprint never contains the secret itself.
    fn hash(&self) -> String;
}

/// Something that can embed credentials in a git remote URL.
pub trait UrlAuthenticator {
    /// Writes the credential into the user info of `url`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UrlCannotHaveCredentials` for URLs without an
    /// authority, such as `mailto:` or `file:` URLs.
    fn set_url_user(&self, url: &mut Url) -> AuthResult<()>;
}

pub(crate) fn set_bearer(request: &mut reqwest::Request, token: &str) -> AuthResult<()> {
    let mut value =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| AuthError::InvalidHeader)?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}
