//! Records held by the store.

use chrono::{DateTime, Utc};
use github_client::Installation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;

/// Why an app is registered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppDomain {
    /// Code host connection and repository sync.
    #[default]
    Repos,
    /// Batch changes. At most one per GitHub instance.
    Batches,
}

impl AppDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppDomain::Repos => "repos",
            AppDomain::Batches => "batches",
        }
    }
}

impl fmt::Display for AppDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repos" => Ok(AppDomain::Repos),
            "batches" => Ok(AppDomain::Batches),
            other => Err(format!(
                "unknown app domain '{other}', expected 'repos' or 'batches'"
            )),
        }
    }
}

/// A registered GitHub App.
///
/// `id`, `created_at` and `updated_at` are assigned by the store and ignored
/// on create.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GitHubApp {
    pub id: i64,
    pub app_id: u64,
    pub name: String,
    pub domain: AppDomain,
    pub slug: String,
    pub base_url: String,
    pub app_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// PEM encoded RSA private key.
    pub private_key: String,
    pub webhook_secret: Option<String>,
    pub logo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for GitHubApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubApp")
            .field("id", &self.id)
            .field("app_id", &self.app_id)
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("slug", &self.slug)
            .field("base_url", &self.base_url)
            .field("app_url", &self.app_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("private_key", &"<REDACTED>")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// One app's presence on one GitHub account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubAppInstallation {
    /// Local ID of the owning app.
    pub app_id: i64,
    pub installation_id: u64,
    pub url: String,
    pub account_login: String,
    pub account_url: String,
    pub account_avatar_url: String,
    pub account_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GitHubAppInstallation {
    /// Builds the local record for an installation reported by GitHub.
    ///
    /// Returns `None` when GitHub did not report an installation ID.
    pub fn from_remote(app_id: i64, installation: &Installation) -> Option<Self> {
        let installation_id = installation.id?;
        let account = installation.account.clone().unwrap_or_default();

        Some(Self {
            app_id,
            installation_id,
            url: installation.html_url.clone().unwrap_or_default(),
            account_login: account.login.unwrap_or_default(),
            account_url: account.html_url.unwrap_or_default(),
            account_avatar_url: account.avatar_url.unwrap_or_default(),
            account_type: account.account_type.unwrap_or_default(),
            ..Default::default()
        })
    }
}
