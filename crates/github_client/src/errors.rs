//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when talking to the
//! GitHub REST API on behalf of a GitHub App. Callers that need to react to a
//! specific HTTP status (for example the installation sync, which treats a
//! failed listing as "the app may be gone") match on [`Error::ApiError`].

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_app_installations().await {
///     Ok(installations) => println!("{} installations", installations.len()),
///     Err(Error::ApiError { status: 404, .. }) => eprintln!("App no longer exists"),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GitHub answered with a non-success status.
    ///
    /// `status` is the HTTP status code, `message` the message GitHub put in
    /// the error body.
    #[error("GitHub API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - GitHub App credentials are invalid (for example a malformed private key)
    /// - The underlying HTTP client cannot be built
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// The configured base URL of the GitHub instance cannot be used.
    #[error("Invalid GitHub base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The request could not be completed (connection, TLS, timeout or an
    /// unexpected response shape).
    #[error("GitHub request failed: {0}")]
    RequestFailed(String),

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Error {
    /// The HTTP status GitHub answered with, if the failure came from GitHub
    /// itself rather than from the transport.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ApiError { status, .. } => Some(*status),
            Error::RateLimitExceeded => Some(429),
            _ => None,
        }
    }
}
