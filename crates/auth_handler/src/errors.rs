//! Error types for GitHub App authentication.

use encryption::EncryptionError;
use thiserror::Error;

/// Errors that can occur while authenticating as a GitHub App or one of its
/// installations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The app private key is not a usable RSA PEM key.
    #[error("Failed to parse the GitHub App private key: {0}")]
    KeyParse(String),

    /// A JWT could not be signed with an already parsed key.
    #[error("Failed to sign the GitHub App JWT: {0}")]
    Jwt(String),

    #[error("Invalid GitHub base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The credential contains characters that cannot go in a header.
    #[error("Credential cannot be encoded as an Authorization header")]
    InvalidHeader,

    #[error("URL '{0}' cannot carry credentials")]
    UrlCannotHaveCredentials(String),

    /// The token exchange request never got a response.
    #[error("Failed to request an installation access token")]
    RefreshRequest(#[source] reqwest::Error),

    /// GitHub answered the token exchange with something other than 201.
    #[error("Failed to refresh the access token for installation {installation_id}: GitHub returned status {status}")]
    RefreshFailed { installation_id: u64, status: u16 },

    #[error("Invalid installation access token response: {0}")]
    InvalidTokenResponse(String),
}

impl AuthError {
    /// The HTTP status GitHub returned, if this error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::RefreshFailed { status, .. } => Some(*status),
            AuthError::RefreshRequest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors returned by a [`crate::TokenCache`] or while moving tokens in and out
/// of it.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A cached payload could not be decrypted. Callers treat this as a miss.
    #[error("Failed to decrypt cached token")]
    Decrypt(#[source] EncryptionError),

    #[error("Failed to encrypt token for caching")]
    Encrypt(#[source] EncryptionError),

    /// The cache backend itself failed.
    #[error("Token cache backend error: {0}")]
    Backend(String),

    #[error("Failed to (de)serialize cached token")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
