//! Configuration for the App Keeper CLI.
//!
//! The configuration is a TOML file listing the registered GitHub Apps and
//! how secrets are protected:
//!
//! ```toml
//! [cache]
//! ttl_minutes = 55
//! encryption_key_env = "APP_KEEPER_CACHE_KEY"
//!
//! [store]
//! encryption_key_env = "APP_KEEPER_STORE_KEY"
//!
//! [[apps]]
//! app_id = 123456
//! name = "Code host sync"
//! base_url = "https://github.com"
//! private_key_path = "keys/code-host-sync.pem"
//! ```
//!
//! Encryption keys are never written to the file. The file names an
//! environment variable holding a base64 encoded 32 byte key instead.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use app_store::{AppDomain, GitHubApp};
use auth_handler::INSTALLATION_TOKEN_CACHE_TTL;
use encryption::{AesGcmKey, EncryptionKey};
use serde::Deserialize;
use tracing::debug;

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "app-keeper.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Main configuration structure for the App Keeper CLI.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub apps: Vec<AppEntry>,

    /// Directory relative `private_key_path` values are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Settings of the installation token cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Environment variable holding the cache encryption key.
    #[serde(default)]
    pub encryption_key_env: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            encryption_key_env: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }
}

fn default_ttl_minutes() -> u64 {
    INSTALLATION_TOKEN_CACHE_TTL.as_secs() / 60
}

/// Settings of the app store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Environment variable holding the key app secrets are encrypted with.
    #[serde(default)]
    pub encryption_key_env: Option<String>,
}

/// One GitHub App to register.
#[derive(Clone, Deserialize)]
pub struct AppEntry {
    pub app_id: u64,
    pub name: String,
    #[serde(default)]
    pub domain: AppDomain,
    pub base_url: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Inline PEM encoded private key.
    #[serde(default)]
    pub private_key: Option<String>,
    /// Path of a PEM file holding the private key.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for AppEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppEntry")
            .field("app_id", &self.app_id)
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("base_url", &self.base_url)
            .field("slug", &self.slug)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("private_key", &self.private_key.as_ref().map(|_| "<REDACTED>"))
            .field("private_key_path", &self.private_key_path)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl AppEntry {
    /// Builds the store record for this entry, reading the private key from
    /// disk when it is given as a path.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if neither or both of `private_key` and
    ///   `private_key_path` are set.
    /// - `Error::LoadFile` if the key file cannot be read.
    pub fn to_github_app(&self, base_dir: &Path) -> Result<GitHubApp, Error> {
        let private_key = match (&self.private_key, &self.private_key_path) {
            (Some(key), None) => key.clone(),
            (None, Some(path)) => {
                let path = base_dir.join(path);
                fs::read_to_string(&path).map_err(|source| Error::LoadFile { path, source })?
            }
            (Some(_), Some(_)) => {
                return Err(Error::Config(format!(
                    "App '{}' sets both private_key and private_key_path",
                    self.name
                )))
            }
            (None, None) => {
                return Err(Error::Config(format!(
                    "App '{}' has no private_key or private_key_path",
                    self.name
                )))
            }
        };

        Ok(GitHubApp {
            app_id: self.app_id,
            name: self.name.clone(),
            domain: self.domain,
            slug: self.slug.clone(),
            base_url: self.base_url.clone(),
            app_url: self.app_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            private_key,
            webhook_secret: self.webhook_secret.clone(),
            ..GitHubApp::default()
        })
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the file does not exist.
    /// - `Error::LoadFile` if it cannot be read.
    /// - `Error::ParseTomlFile` if it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path).map_err(|source| Error::LoadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        debug!(apps = config.apps.len(), "Configuration loaded");
        Ok(config)
    }

    /// Parses configuration from TOML text. Key paths resolve against the
    /// current directory.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let config: AppConfig = toml::from_str(content).map_err(Error::ParseTomlFile)?;

        if config.cache.ttl_minutes == 0 {
            return Err(Error::Config(
                "cache.ttl_minutes must be greater than zero".to_string(),
            ));
        }
        if config.cache.ttl_minutes.checked_mul(60).is_none() {
            return Err(Error::Config(format!(
                "cache.ttl_minutes is too large: {}",
                config.cache.ttl_minutes
            )));
        }

        Ok(config)
    }

    /// The store records of every configured app.
    pub fn github_apps(&self) -> Result<Vec<GitHubApp>, Error> {
        self.apps
            .iter()
            .map(|entry| entry.to_github_app(&self.base_dir))
            .collect()
    }
}

/// Reads the encryption key named by `env_name`.
///
/// Returns `None` when no variable is configured.
///
/// # Errors
///
/// - `Error::Config` if the variable is configured but not set.
/// - `Error::Encryption` if its value is not a base64 encoded 32 byte key.
pub fn key_from_env(env_name: Option<&str>) -> Result<Option<Arc<dyn EncryptionKey>>, Error> {
    let Some(name) = env_name else {
        return Ok(None);
    };

    let value = env::var(name).map_err(|_| {
        Error::Config(format!("Environment variable {name} is not set"))
    })?;

    let key = AesGcmKey::from_base64(&value)?;
    debug!(variable = name, "Loaded encryption key from environment");
    Ok(Some(Arc::new(key)))
}

/// Returns the configuration path to use.
pub fn get_config_path(path: Option<&str>) -> PathBuf {
    PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILENAME))
}
