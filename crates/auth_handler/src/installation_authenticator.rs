//! Installation access tokens derived from a GitHub App identity.
//!
//! An [`InstallationAuthenticator`] moves through three states:
//!
//! - *Empty*: no token has been fetched yet.
//! - *Valid*: a token is held that does not expire within [`REFRESH_MARGIN_SECS`].
//! - *Stale*: the held token expires within the margin or already has.
//!
//! [`InstallationAuthenticator::refresh`] moves Empty and Stale back to
//! Valid, preferring a token another authenticator already placed in the
//! shared [`TokenCache`] over a new exchange with GitHub.

use chrono::{DateTime, Duration, Utc};
use encryption::Cipher;
use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{
    set_bearer, sha256_hex, AppAuthenticator, AuthError, AuthResult, Authenticator, CacheError,
    HttpClient, TokenCache, UrlAuthenticator,
};

#[cfg(test)]
#[path = "installation_authenticator_tests.rs"]
mod tests;

/// Seconds before its expiry at which a token is considered stale.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// User name GitHub expects when an installation token is used for git.
const URL_USER: &str = "x-access-token";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = concat!("app-keeper/", env!("CARGO_PKG_VERSION"));

/// A short-lived token scoped to one installation.
///
/// This is also the JSON shape GitHub returns from the token exchange and the
/// shape written to the token cache.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationAccessToken {
    pub token: String,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl InstallationAccessToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the token is absent, has no known expiry, or expires within
    /// [`REFRESH_MARGIN_SECS`] of now.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_empty() {
            return true;
        }

        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at <= now + Duration::seconds(REFRESH_MARGIN_SECS),
        }
    }
}

impl std::fmt::Debug for InstallationAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationAccessToken")
            .field("token", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authenticates requests as one installation of a GitHub App.
///
/// The authenticator is safe to share between tasks. Concurrent refreshes
/// are not coordinated beyond the shared cache: the last writer wins.
pub struct InstallationAuthenticator {
    installation_id: u64,
    base_url: String,
    api_root: Url,
    app: Arc<AppAuthenticator>,
    cache: Arc<dyn TokenCache>,
    cipher: Cipher,
    token: RwLock<InstallationAccessToken>,
}

impl InstallationAuthenticator {
    /// Creates an authenticator in the Empty state.
    ///
    /// `base_url` is the web URL of the GitHub instance, for example
    /// `https://github.com` or `https://ghe.example.com`. Trailing slashes are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidBaseUrl` if `base_url` cannot be parsed.
    pub fn new(
        installation_id: u64,
        base_url: &str,
        app: Arc<AppAuthenticator>,
        cache: Arc<dyn TokenCache>,
        cipher: Cipher,
    ) -> AuthResult<Self> {
        let api_root = github_client::api_root(base_url).map_err(|e| match e {
            github_client::Error::InvalidBaseUrl { url, reason } => {
                AuthError::InvalidBaseUrl { url, reason }
            }
            other => AuthError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: other.to_string(),
            },
        })?;

        Ok(Self {
            installation_id,
            base_url: github_client::normalize_base_url(base_url),
            api_root,
            app,
            cache,
            cipher,
            token: RwLock::new(InstallationAccessToken::default()),
        })
    }

    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A copy of the token currently held in memory.
    pub fn access_token(&self) -> InstallationAccessToken {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn needs_refresh(&self) -> bool {
        self.access_token().needs_refresh()
    }

    /// Key under which the token is shared through the [`TokenCache`].
    pub fn cache_key(&self) -> String {
        format!("{}/installations/{}", self.base_url, self.installation_id)
    }

    /// Brings the held token back to the Valid state.
    ///
    /// A token found in the shared cache that differs from the held one is
    /// adopted; if it is not stale no request is made. Otherwise a new token
    /// is requested from GitHub with an app JWT and written back to the cache.
    /// Cache failures of any kind are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// - `AuthError::RefreshRequest` if GitHub could not be reached.
    /// - `AuthError::RefreshFailed` if GitHub answered with anything but 201.
    /// - `AuthError::InvalidTokenResponse` if the 201 body is not a token.
    #[instrument(skip(self, client), fields(installation_id = self.installation_id, base_url = %self.base_url))]
    pub async fn refresh(&self, client: &dyn HttpClient) -> AuthResult<()> {
        if let Some(cached) = self.read_cache().await {
            if cached.token != self.access_token().token {
                let stale = cached.needs_refresh();
                self.replace_token(cached);
                if !stale {
                    debug!("Adopted installation token from cache");
                    return Ok(());
                }
            }
        }

        let fresh = self.request_token(client).await?;
        self.replace_token(fresh.clone());
        info!(expires_at = ?fresh.expires_at, "Refreshed installation access token");

        if let Err(e) = self.write_cache(&fresh).await {
            warn!(error = %e, "Failed to cache installation access token");
        }

        Ok(())
    }

    pub(crate) fn replace_token(&self, token: InstallationAccessToken) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    async fn read_cache(&self) -> Option<InstallationAccessToken> {
        match self.try_read_cache().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable token cache entry");
                None
            }
        }
    }

    async fn try_read_cache(&self) -> Result<Option<InstallationAccessToken>, CacheError> {
        let Some(payload) = self.cache.get(&self.cache_key()).await? else {
            return Ok(None);
        };

        let plaintext = self.cipher.open(payload).await.map_err(CacheError::Decrypt)?;
        Ok(Some(serde_json::from_slice(&plaintext)?))
    }

    async fn write_cache(&self, token: &InstallationAccessToken) -> Result<(), CacheError> {
        let plaintext = serde_json::to_vec(token)?;
        let payload = self
            .cipher
            .seal(plaintext)
            .await
            .map_err(CacheError::Encrypt)?;
        self.cache.set(&self.cache_key(), payload).await
    }

    async fn request_token(&self, client: &dyn HttpClient) -> AuthResult<InstallationAccessToken> {
        let url = self
            .api_root
            .join(&format!(
                "app/installations/{}/access_tokens",
                self.installation_id
            ))
            .map_err(|e| AuthError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let mut request = reqwest::Request::new(Method::POST, url);
        let headers = request.headers_mut();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        self.app.authenticate(&mut request)?;

        let response = client
            .execute(request)
            .await
            .map_err(AuthError::RefreshRequest)?;

        let status = response.status();
        if status != StatusCode::CREATED {
            warn!(
                status = status.as_u16(),
                "GitHub rejected the installation token request"
            );
            return Err(AuthError::RefreshFailed {
                installation_id: self.installation_id,
                status: status.as_u16(),
            });
        }

        let token: InstallationAccessToken = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;

        if token.token.is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "response did not contain a token".to_string(),
            ));
        }

        Ok(token)
    }
}

impl Authenticator for InstallationAuthenticator {
    /// Sets the held token as a bearer credential. Callers refresh first.
    fn authenticate(&self, request: &mut reqwest::Request) -> AuthResult<()> {
        set_bearer(request, &self.access_token().token)
    }

    /// Derived from the installation ID so it survives token rotation.
    fn hash(&self) -> String {
        sha256_hex(self.installation_id.to_string().as_bytes())
    }
}

impl UrlAuthenticator for InstallationAuthenticator {
    fn set_url_user(&self, url: &mut Url) -> AuthResult<()> {
        let token = self.access_token().token;
        if url.set_username(URL_USER).is_err() || url.set_password(Some(&token)).is_err() {
            return Err(AuthError::UrlCannotHaveCredentials(url.to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for InstallationAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationAuthenticator")
            .field("installation_id", &self.installation_id)
            .field("base_url", &self.base_url)
            .field("app", &self.app)
            .field("cipher", &self.cipher)
            .field("token", &self.access_token())
            .finish()
    }
}
