use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the App Keeper CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error occurred while loading or interpreting configuration.
    ///
    /// Returned for missing files, invalid values and missing environment
    /// variables named by the configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failed to read a file referenced by the configuration.
    #[error("Failed to load file {path:?}.")]
    LoadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to parse a TOML configuration file.
    #[error("Failed to parse TOML configuration file.")]
    ParseTomlFile(#[source] toml::de::Error),

    /// A configured encryption key could not be used.
    #[error("Invalid encryption key: {0}")]
    Encryption(#[from] encryption::EncryptionError),

    /// The app store rejected an operation.
    #[error("Store error: {0}")]
    Store(#[from] app_store::StoreError),

    /// A credential could not be resolved.
    #[error("Failed to resolve credential: {0}")]
    Resolve(#[from] app_keeper_core::ResolveError),

    /// A resolved credential could not be refreshed.
    #[error("Authentication error: {0}")]
    Auth(#[from] auth_handler::AuthError),

    /// A GitHub client could not be built for an app.
    #[error("GitHub client error: {0}")]
    GitHub(#[from] github_client::Error),

    /// The backfill could not run or finished with errors.
    #[error(transparent)]
    Backfill(#[from] app_keeper_core::BackfillError),

    /// Installations could not be synced before resolving a repository.
    #[error(transparent)]
    Sync(#[from] app_keeper_core::SyncErrors),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// `1` for failures of the operation itself, `2` for problems with the
    /// configuration or arguments.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::InvalidArguments(_)
            | Error::LoadFile { .. }
            | Error::ParseTomlFile(_)
            | Error::Encryption(_) => 2,
            _ => 1,
        }
    }
}
