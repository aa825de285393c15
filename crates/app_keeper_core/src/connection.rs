//! Connection configuration consumed by the credential resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured connection to a GitHub instance.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConnection {
    /// Web URL of the GitHub instance, e.g. `https://github.com`.
    pub url: String,

    /// Personal access token, used when no GitHub App is configured.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default, rename = "gitHubAppDetails", alias = "github_app_details")]
    pub github_app_details: Option<GitHubAppDetails>,
}

/// The GitHub App a connection authenticates through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubAppDetails {
    #[serde(rename = "appID", alias = "app_id")]
    pub app_id: u64,

    /// Base URL the app is registered for. Defaults to the connection URL.
    #[serde(default, rename = "baseURL", alias = "baseUrl", alias = "base_url")]
    pub base_url: String,

    #[serde(rename = "installationID", alias = "installation_id", default)]
    pub installation_id: u64,

    #[serde(default, alias = "clone_all_repositories")]
    pub clone_all_repositories: bool,
}

impl GitHubConnection {
    /// The base URL to look the app up under.
    pub fn app_base_url(&self) -> &str {
        match &self.github_app_details {
            Some(details) if !details.base_url.is_empty() => &details.base_url,
            _ => &self.url,
        }
    }
}

impl fmt::Debug for GitHubConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConnection")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("github_app_details", &self.github_app_details)
            .finish()
    }
}
