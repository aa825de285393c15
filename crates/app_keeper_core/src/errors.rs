//! Error types for credential resolution and installation sync.

use app_store::StoreError;
use auth_handler::AuthError;
use std::fmt;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors from [`crate::CredentialResolver`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The app or installation could not be looked up. Not-found cases are
    /// `StoreError::AppNotFound` and `StoreError::InstallationNotFound`.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("connection to {0} has neither a token nor GitHub App details")]
    MissingToken(String),

    #[error("invalid repository name '{0}', expected 'owner/name'")]
    InvalidRepository(String),
}

impl ResolveError {
    /// Whether the app or installation simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::Store(e) if e.is_not_found())
    }
}

/// One failure recorded while syncing the installations of an app.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read stored installations of app '{app_name}' ({app_id})")]
    ListLocal {
        app_id: u64,
        app_name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to list installations of app '{app_name}' ({app_id}) on GitHub")]
    ListRemote {
        app_id: u64,
        app_name: String,
        #[source]
        source: github_client::Error,
    },

    #[error("failed to remove installations {installation_ids:?} of app '{app_name}' ({app_id})")]
    RemoveInstallations {
        app_id: u64,
        app_name: String,
        installation_ids: Vec<u64>,
        #[source]
        source: StoreError,
    },

    #[error("failed to store installation {installation_id} of app '{app_name}' ({app_id})")]
    UpsertInstallation {
        app_id: u64,
        app_name: String,
        installation_id: u64,
        #[source]
        source: StoreError,
    },

    #[error("failed to create a GitHub client for app '{app_name}' ({app_id})")]
    CreateClient {
        app_id: u64,
        app_name: String,
        #[source]
        source: github_client::Error,
    },
}

/// Every failure of a sync or backfill pass.
///
/// Sync functions return `Result<(), SyncErrors>` built with
/// [`SyncErrors::into_result`], so an `Err` always holds at least one error.
#[derive(Debug, Default)]
pub struct SyncErrors {
    errors: Vec<SyncError>,
}

impl SyncErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: SyncError) {
        self.errors.push(error);
    }

    /// Appends every error of `other`.
    pub fn append(&mut self, other: SyncErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SyncError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), SyncErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for SyncErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            1 => write!(f, "1 error occurred during installation sync:")?,
            n => write!(f, "{n} errors occurred during installation sync:")?,
        }
        for error in &self.errors {
            write!(f, "\n\t* {error}")?;
            if let Some(source) = std::error::Error::source(error) {
                write!(f, ": {source}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SyncErrors {}

impl IntoIterator for SyncErrors {
    type Item = SyncError;
    type IntoIter = std::vec::IntoIter<SyncError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a SyncErrors {
    type Item = &'a SyncError;
    type IntoIter = std::slice::Iter<'a, SyncError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors from [`crate::BackfillWorker::run`].
#[derive(Debug, Error)]
pub enum BackfillError {
    /// The registered apps could not be listed. Nothing was synced.
    #[error("failed to list GitHub Apps")]
    ListApps(#[source] StoreError),

    /// At least one app could not be synced completely.
    #[error(transparent)]
    Sync(#[from] SyncErrors),
}
