//! Artifact backends
//!
//! Both backends honour the same contract: keys are generated by the caller,
//! `put` never overwrites in practice because keys are unique, `list` of an
//! owner with no files is empty rather than an error, and `get`/`delete` of a
//! missing key fail with [`AppError::NotFound`](crate::error::AppError::NotFound).

pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Backend, StoredObject};

pub use local::LocalBackend;
pub use remote::{RemoteBackend, RemoteEntry};

#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Which storage medium this is
    fn kind(&self) -> Backend;

    /// Store `bytes` under `key` in the owner's folder
    async fn put(&self, owner: &str, key: &str, bytes: &[u8]) -> Result<StoredObject>;

    /// Every object in the owner's folder, sorted by key
    async fn list(&self, owner: &str) -> Result<Vec<StoredObject>>;

    async fn get(&self, owner: &str, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, owner: &str, key: &str) -> Result<()>;

    /// Same backend with owner folders under `folder`
    ///
    /// Only backends with a configurable prefix support this.
    fn relocated(&self, folder: &str) -> Result<Arc<dyn ArtifactBackend>> {
        Err(AppError::InvalidInput(format!(
            "The {} backend has no configurable folder (requested {:?})",
            self.kind(),
            folder
        )))
    }
}
