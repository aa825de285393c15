//! GitHub App installation domain types.
//!
//! These mirror the subset of the `GET /app/installations` response that the
//! installation sync cares about. Every field is optional because GitHub omits
//! fields for suspended or partially deleted installations, and the sync has
//! to cope with an installation that has no ID at all.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;

/// Represents the GitHub account (user or organization) an app is installed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    /// The login name of the account
    #[serde(default)]
    pub login: Option<String>,
    /// Avatar image URL of the account
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Web URL of the account
    #[serde(default)]
    pub html_url: Option<String>,
    /// The type of account (User or Organization)
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
}

/// Represents a GitHub App installation as reported by GitHub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Installation {
    /// The unique ID of the installation
    #[serde(default)]
    pub id: Option<u64>,
    /// Web URL of the installation settings page
    #[serde(default)]
    pub html_url: Option<String>,
    /// The account where the app is installed
    #[serde(default)]
    pub account: Option<Account>,
}

impl Installation {
    /// The account login, or an empty string when GitHub did not report one.
    pub fn account_login(&self) -> &str {
        self.account
            .as_ref()
            .and_then(|a| a.login.as_deref())
            .unwrap_or_default()
    }
}
