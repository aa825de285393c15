//! GitHub App identity: JWT signing from the app's RSA private key.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{set_bearer, sha256_hex, AuthError, AuthResult, Authenticator};

#[cfg(test)]
#[path = "app_authenticator_tests.rs"]
mod tests;

/// Seconds `iat` is moved into the past to tolerate clock drift with GitHub.
pub const JWT_BACKDATE_SECS: i64 = 60;

/// Validity of an app JWT in seconds, counted from its (backdated) `iat`.
pub const JWT_LIFETIME_SECS: i64 = 10 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) iat: i64,
    pub(crate) exp: i64,
    pub(crate) iss: String,
}

/// Authenticates requests as a GitHub App.
///
/// Every call to [`Authenticator::authenticate`] signs a new JWT, so the
/// authenticator can be shared and held for as long as the key is valid.
pub struct AppAuthenticator {
    app_id: u64,
    key: EncodingKey,
    key_hash: String,
}

impl AppAuthenticator {
    /// Parses `private_key` as a PEM encoded RSA key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyParse` if the PEM is malformed or does not hold
    /// an RSA private key that can sign.
    #[instrument(skip(private_key))]
    pub fn new(app_id: u64, private_key: &[u8]) -> AuthResult<Self> {
        let key = EncodingKey::from_rsa_pem(private_key).map_err(|e| {
            error!(app_id = app_id, error = %e, "Failed to parse GitHub App private key");
            AuthError::KeyParse(e.to_string())
        })?;

        let authenticator = Self {
            app_id,
            key,
            key_hash: sha256_hex(private_key),
        };

        // Some malformed keys only fail once they are used.
        authenticator.generate_jwt().map_err(|e| {
            error!(app_id = app_id, error = %e, "GitHub App private key cannot sign");
            AuthError::KeyParse(e.to_string())
        })?;

        debug!(app_id = app_id, "Loaded GitHub App private key");
        Ok(authenticator)
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// Signs a JWT valid from one minute ago for ten minutes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Jwt` if signing fails, which does not happen for a
    /// key that passed [`AppAuthenticator::new`].
    pub fn generate_jwt(&self) -> AuthResult<String> {
        self.generate_jwt_at(Utc::now())
    }

    /// Signs a JWT as if the current time were `now`.
    pub fn generate_jwt_at(&self, now: DateTime<Utc>) -> AuthResult<String> {
        let iat = now.timestamp() - JWT_BACKDATE_SECS;
        let claims = Claims {
            iat,
            exp: iat + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AuthError::Jwt(e.to_string()))
    }
}

impl Authenticator for AppAuthenticator {
    fn authenticate(&self, request: &mut reqwest::Request) -> AuthResult<()> {
        let jwt = self.generate_jwt()?;
        set_bearer(request, &jwt)
    }

    fn hash(&self) -> String {
        self.key_hash.clone()
    }
}

impl std::fmt::Debug for AppAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppAuthenticator")
            .field("app_id", &self.app_id)
            .field("key", &"<REDACTED>")
            .finish()
    }
}
