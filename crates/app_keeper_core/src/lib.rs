//! # App Keeper Core
//!
//! GitHub App credential resolution and installation lifecycle.
//!
//! ## Overview
//!
//! - [`CredentialResolver`] turns a [`GitHubConnection`] into an
//!   [`auth_handler::Credential`]: a static token, or an installation token
//!   derived from a registered GitHub App.
//! - [`InstallationSyncer`] reconciles the stored installations of one app
//!   with the installations GitHub reports.
//! - [`BackfillWorker`] runs the syncer for every registered app.
//!
//! ## Architecture
//!
//! Every component takes its collaborators through its constructor: the
//! [`app_store::GitHubAppsStore`], the [`auth_handler::TokenCache`], and for
//! the backfill an [`InstallationsClientFactory`] that builds a GitHub client
//! per app.
//!
//! ## Error Handling
//!
//! Resolution fails fast with a [`ResolveError`]. Sync and backfill collect
//! every failure into [`SyncErrors`] and keep going.

mod backfill;
pub use backfill::BackfillWorker;

mod client_factory;
pub use client_factory::{InstallationsClientFactory, OctocrabClientFactory};

mod connection;
pub use connection::{GitHubAppDetails, GitHubConnection};

mod credential_resolver;
pub use credential_resolver::CredentialResolver;

pub mod errors;
pub use errors::{BackfillError, ResolveError, SyncError, SyncErrors};

mod installation_sync;
pub use installation_sync::InstallationSyncer;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
