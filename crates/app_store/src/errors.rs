use encryption::EncryptionError;
use thiserror::Error;

/// Errors returned by a [`crate::GitHubAppsStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No app matched a lookup. `criteria` describes the lookup.
    #[error("no app exists matching criteria: '{criteria}'")]
    AppNotFound { criteria: String },

    #[error("app {app_id} has no installation for account '{account_login}'")]
    InstallationNotFound { app_id: i64, account_login: String },

    /// A uniqueness rule would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("failed to protect app secrets")]
    Encryption(#[from] EncryptionError),

    /// A stored secret could not be decoded after decryption.
    #[error("stored secret is corrupt: {0}")]
    CorruptSecret(String),

    /// The storage backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error means "does not exist" rather than "failed".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::AppNotFound { .. } | StoreError::InstallationNotFound { .. }
        )
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
