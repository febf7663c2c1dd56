//! Artifact facade
//!
//! Dispatches upload/list/get/delete to the local and remote backends and
//! normalizes what they return into [`Artifact`]s. Holds no state of its own.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::constants::{
    ERR_NAME_REQUIRED, ERR_NO_TARGETS, KEY_NONCE_LEN, MAX_UPLOAD_SIZE_BYTES, WARN_UPLOAD_SIZE_BYTES,
};
use crate::error::{AppError, Result};
use crate::models::{Artifact, Backend, StoredObject};
use crate::naming::{make_key, parse_key, validate_key};
use crate::security::generate_nonce;
use crate::storage::ArtifactBackend;

/// Outcome of one upload, per requested target
///
/// A target that was not requested is `None`. One target failing never
/// affects the other.
#[derive(Debug)]
pub struct UploadReport {
    pub local: Option<Result<Artifact>>,
    pub remote: Option<Result<Artifact>>,
}

/// Both backends' artifacts for one owner, kept apart
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactListing {
    pub local: Vec<Artifact>,
    pub remote: Vec<Artifact>,
}

#[derive(Clone)]
pub struct ArtifactService {
    local: Arc<dyn ArtifactBackend>,
    remote: Arc<dyn ArtifactBackend>,
}

impl ArtifactService {
    pub fn new(local: Arc<dyn ArtifactBackend>, remote: Arc<dyn ArtifactBackend>) -> Self {
        Self { local, remote }
    }

    /// Same service with remote uploads under `folder` instead of the
    /// configured target path; local storage is unaffected
    ///
    /// A missing or blank folder keeps the configured one.
    pub fn in_folder(&self, folder: Option<&str>) -> Result<Self> {
        match folder.map(str::trim).filter(|f| !f.is_empty()) {
            None => Ok(self.clone()),
            Some(folder) => Ok(Self {
                local: self.local.clone(),
                remote: self.remote.relocated(folder)?,
            }),
        }
    }

    fn backend(&self, target: Backend) -> &dyn ArtifactBackend {
        match target {
            Backend::Local => self.local.as_ref(),
            Backend::Remote => self.remote.as_ref(),
        }
    }

    /// Store one file in every requested backend
    ///
    /// Request-level problems (no targets, oversized body, unsafe name) fail
    /// the whole call. Backend failures are reported per target.
    pub async fn upload(
        &self,
        owner: &str,
        original_name: &str,
        bytes: &[u8],
        targets: &BTreeSet<Backend>,
    ) -> Result<UploadReport> {
        if targets.is_empty() {
            return Err(AppError::InvalidInput(ERR_NO_TARGETS.to_string()));
        }
        if original_name.is_empty() {
            return Err(AppError::InvalidInput(ERR_NAME_REQUIRED.to_string()));
        }
        // Reject unsafe or overlong names once, up front, with a full-width nonce
        make_key(owner, original_name, Utc::now(), &"0".repeat(KEY_NONCE_LEN))?;

        if bytes.len() > MAX_UPLOAD_SIZE_BYTES {
            tracing::warn!(
                "Upload too large from user {}: {} bytes (max: {})",
                owner,
                bytes.len(),
                MAX_UPLOAD_SIZE_BYTES
            );
            return Err(AppError::PayloadTooLarge);
        }

        // Log warning for large uploads (monitoring)
        if bytes.len() > WARN_UPLOAD_SIZE_BYTES {
            tracing::info!("Large upload from user {}: {} bytes", owner, bytes.len());
        }

        let local = async {
            if targets.contains(&Backend::Local) {
                Some(self.upload_to(Backend::Local, owner, original_name, bytes).await)
            } else {
                None
            }
        };
        let remote = async {
            if targets.contains(&Backend::Remote) {
                Some(self.upload_to(Backend::Remote, owner, original_name, bytes).await)
            } else {
                None
            }
        };

        let (local, remote) = tokio::join!(local, remote);
        Ok(UploadReport { local, remote })
    }

    async fn upload_to(
        &self,
        target: Backend,
        owner: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Artifact> {
        // Fresh key per target; local and remote copies are unrelated
        let key = make_key(owner, original_name, Utc::now(), &generate_nonce())?;
        let backend = self.backend(target);

        match backend.put(owner, &key, bytes).await {
            Ok(stored) => {
                tracing::info!(
                    "Upload by {} stored in {} as {} ({} bytes)",
                    owner,
                    target,
                    key,
                    stored.size
                );
                Ok(to_artifact(owner, backend.kind(), stored))
            }
            Err(e) => {
                tracing::warn!("Upload by {} to {} failed: {}", owner, target, e);
                Err(e)
            }
        }
    }

    /// Every artifact the owner has in each backend
    pub async fn list(&self, owner: &str) -> Result<ArtifactListing> {
        let (local, remote) =
            tokio::try_join!(self.local.list(owner), self.remote.list(owner))?;

        Ok(ArtifactListing {
            local: local
                .into_iter()
                .map(|o| to_artifact(owner, Backend::Local, o))
                .collect(),
            remote: remote
                .into_iter()
                .map(|o| to_artifact(owner, Backend::Remote, o))
                .collect(),
        })
    }

    /// Bytes of one artifact
    pub async fn get(&self, owner: &str, key: &str, target: Backend) -> Result<Vec<u8>> {
        validate_key(key)?;
        self.backend(target).get(owner, key).await
    }

    /// Remove one artifact from the named backend only
    pub async fn delete(&self, owner: &str, key: &str, target: Backend) -> Result<()> {
        validate_key(key)?;
        self.backend(target).delete(owner, key).await?;
        tracing::info!("Artifact {} deleted from {} by {}", key, target, owner);
        Ok(())
    }
}

fn to_artifact(owner: &str, backend: Backend, stored: StoredObject) -> Artifact {
    let (original_name, created_at) = match parse_key(&stored.key) {
        Some(parts) => (parts.original_name, Some(parts.created_at)),
        // Placed by hand, not by an upload
        None => (stored.key.clone(), None),
    };

    Artifact {
        owner: owner.to_string(),
        original_name,
        key: stored.key,
        size: stored.size,
        backend,
        created_at,
        location: stored.location,
        url: stored.url,
    }
}
