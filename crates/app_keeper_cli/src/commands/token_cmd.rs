use std::sync::Arc;

use app_keeper_core::{
    CredentialResolver, GitHubAppDetails, GitHubConnection, InstallationSyncer,
    InstallationsClientFactory, OctocrabClientFactory,
};
use app_store::GitHubAppsStore;
use auth_handler::{Credential, HttpClient, InMemoryTokenCache};
use chrono::{DateTime, Utc};
use clap::Args;
use encryption::Cipher;
use tracing::{debug, instrument};

use crate::commands::seed_store;
use crate::config::{key_from_env, AppConfig, CacheConfig};
use crate::errors::Error;

/// Arguments for the token command
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// GitHub App ID
    #[arg(long)]
    pub app_id: u64,

    /// Installation to issue the token for
    #[arg(long, conflicts_with = "repository", required_unless_present = "repository")]
    pub installation_id: Option<u64>,

    /// Repository (owner/name) whose owner's installation should be used
    #[arg(long)]
    pub repository: Option<String>,

    /// Base URL of the GitHub instance the app is registered on
    #[arg(long, default_value = "https://github.com")]
    pub base_url: String,
}

/// A freshly issued token.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Seeds a store from `config` and issues a token against GitHub.
pub async fn execute(config: &AppConfig, args: &TokenArgs) -> Result<IssuedToken, Error> {
    let store = seed_store(config).await?;
    let http = reqwest::Client::new();
    issue_token(&config.cache, store, &OctocrabClientFactory, &http, args).await
}

/// Resolves the installation credential described by `args` and refreshes it.
///
/// With `--repository` the app's installations are synced first, so the
/// repository owner's installation can be found.
#[instrument(skip(cache_config, store, clients, http))]
pub async fn issue_token(
    cache_config: &CacheConfig,
    store: Arc<dyn GitHubAppsStore>,
    clients: &dyn InstallationsClientFactory,
    http: &dyn HttpClient,
    args: &TokenArgs,
) -> Result<IssuedToken, Error> {
    let cipher = Cipher::from_option(key_from_env(cache_config.encryption_key_env.as_deref())?);
    let cache = Arc::new(InMemoryTokenCache::new(cache_config.ttl()));
    let resolver = CredentialResolver::new(store.clone(), cache, cipher);

    let connection = GitHubConnection {
        url: args.base_url.clone(),
        token: None,
        github_app_details: Some(GitHubAppDetails {
            app_id: args.app_id,
            base_url: args.base_url.clone(),
            installation_id: args.installation_id.unwrap_or_default(),
            clone_all_repositories: false,
        }),
    };

    let credential = match (&args.repository, args.installation_id) {
        (Some(repository), _) => {
            sync_app(store.clone(), clients, args).await?;
            resolver
                .resolve_for_repository(&connection, repository)
                .await?
        }
        (None, Some(_)) => resolver.resolve(&connection).await?,
        (None, None) => {
            return Err(Error::InvalidArguments(
                "--installation-id or --repository is required".to_string(),
            ))
        }
    };

    credential.ensure_fresh(http).await?;

    let issued = match credential {
        Credential::Installation(installation) => {
            let token = installation.access_token();
            IssuedToken {
                token: token.token,
                expires_at: token.expires_at,
            }
        }
        Credential::Token(token) => IssuedToken {
            token: token.token().to_string(),
            expires_at: None,
        },
    };

    debug!(expires_at = ?issued.expires_at, "Issued token");
    Ok(issued)
}

async fn sync_app(
    store: Arc<dyn GitHubAppsStore>,
    clients: &dyn InstallationsClientFactory,
    args: &TokenArgs,
) -> Result<(), Error> {
    let app = store.get_by_app_id(args.app_id, &args.base_url).await?;
    let client = clients.create(&app)?;
    InstallationSyncer::new(store)
        .sync_installations(&app, client.as_ref())
        .await?;
    Ok(())
}
