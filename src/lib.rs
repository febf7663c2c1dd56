//! File Saver Server Library
//!
//! Upload files to local disk and/or a GitHub repository, list them and
//! delete them, behind a flat-file user registry.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod models;
pub mod naming;
pub mod routes;
pub mod security;
pub mod service;
pub mod sessions;
pub mod storage;

pub use config::{Config, GitHubConfig};
pub use credentials::CredentialStore;
pub use error::{AppError, Result};
pub use service::{ArtifactListing, ArtifactService, UploadReport};
pub use sessions::{Session, SessionStore};

use std::sync::Arc;

use storage::{LocalBackend, RemoteBackend};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
    pub artifacts: ArtifactService,
}

impl AppState {
    /// Open the credential file and wire both storage backends
    pub fn new(config: Config) -> Result<Self> {
        let credentials = CredentialStore::open(&config.users_csv)?;

        std::fs::create_dir_all(&config.local_root).map_err(|e| {
            tracing::error!("Failed to create local storage root: {}", e);
            e
        })?;
        let local = LocalBackend::new(&config.local_root);
        let remote = RemoteBackend::new(&config.github)?;

        tracing::info!(
            "Remote storage: {}/{} on branch {} under {:?}",
            config.github.repo_owner,
            config.github.repo_name,
            config.github.branch,
            config.github.target_path
        );

        Ok(Self {
            artifacts: ArtifactService::new(Arc::new(local), Arc::new(remote)),
            credentials,
            sessions: SessionStore::new(),
            config,
        })
    }
}
