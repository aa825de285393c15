//! Base URL handling for github.com and GitHub Enterprise instances.
//!
//! Apps are registered against the *web* base URL of a GitHub instance
//! (`https://github.com/`, `https://ghe.example.com/`). The REST API lives
//! somewhere else: `https://api.github.com/` for github.com and
//! `<base>/api/v3/` for Enterprise Server.

use url::Url;

use crate::Error;

#[cfg(test)]
#[path = "urls_tests.rs"]
mod tests;

const GITHUB_DOT_COM_API: &str = "https://api.github.com/";

/// Normalizes a base URL for comparison and storage by trimming trailing
/// slashes. `https://github.com////` and `https://github.com` are the same
/// instance.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Returns the REST API root for the GitHub instance at `base_url`.
///
/// The returned URL always ends with a `/` so that relative routes can be
/// joined onto it.
///
/// # Errors
///
/// Returns `Error::InvalidBaseUrl` if `base_url` cannot be parsed or has no
/// host.
pub fn api_root(base_url: &str) -> Result<Url, Error> {
    let normalized = normalize_base_url(base_url);
    let mut parsed = Url::parse(&normalized).map_err(|e| Error::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: "URL has no host".to_string(),
        })?
        .to_ascii_lowercase();

    if host == "github.com" || host == "www.github.com" || host == "api.github.com" {
        return Url::parse(GITHUB_DOT_COM_API).map_err(|e| Error::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        });
    }

    let path = parsed.path().trim_end_matches('/').to_string();
    if host.starts_with("api.") || path.ends_with("/api/v3") {
        parsed.set_path(&format!("{path}/"));
    } else {
        parsed.set_path(&format!("{path}/api/v3/"));
    }
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}
