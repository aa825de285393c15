//! Minimal outbound HTTP seam used for token exchange.

use async_trait::async_trait;

/// Sends a prepared request.
///
/// [`reqwest::Client`] implements this directly. Tests substitute their own
/// implementation to count or script calls.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl HttpClient for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        reqwest::Client::execute(self, request).await
    }
}
