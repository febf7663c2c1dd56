use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Backend, StoredObject};
use crate::naming::{is_safe_path_component, validate_key};
use crate::storage::ArtifactBackend;

/// Filesystem backend laid out as `{root}/{owner}/{key}`
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create backend with given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn owner_dir(&self, owner: &str) -> Result<PathBuf> {
        if !is_safe_path_component(owner) {
            return Err(AppError::InvalidInput(format!("Invalid owner: {}", owner)));
        }
        Ok(self.root.join(owner))
    }

    fn artifact_path(&self, owner: &str, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.owner_dir(owner)?.join(key))
    }
}

fn not_found(key: &str) -> AppError {
    AppError::NotFound(format!("Artifact {}", key))
}

fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[async_trait]
impl ArtifactBackend for LocalBackend {
    fn kind(&self) -> Backend {
        Backend::Local
    }

    async fn put(&self, owner: &str, key: &str, bytes: &[u8]) -> Result<StoredObject> {
        let dir = self.owner_dir(owner)?;
        let path = self.artifact_path(owner, key)?;
        let bytes = bytes.to_vec();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<StoredObject> {
            fs::create_dir_all(&dir)?;

            if let Err(e) = write_new(&path, &bytes) {
                tracing::error!("Local write failed for {:?}: {}", path, e);
                // Only remove what this call created
                if e.kind() != io::ErrorKind::AlreadyExists {
                    let _ = fs::remove_file(&path);
                }
                return Err(e.into());
            }

            tracing::info!("Stored {} bytes at {:?}", bytes.len(), path);

            Ok(StoredObject {
                key,
                size: bytes.len() as u64,
                location: path.display().to_string(),
                url: None,
            })
        })
        .await?
    }

    async fn list(&self, owner: &str) -> Result<Vec<StoredObject>> {
        let dir = self.owner_dir(owner)?;

        tokio::task::spawn_blocking(move || -> Result<Vec<StoredObject>> {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut objects = Vec::new();
            for entry in entries {
                let entry = entry?;
                let metadata = entry.metadata()?;
                if !metadata.is_file() {
                    continue;
                }
                let Ok(key) = entry.file_name().into_string() else {
                    tracing::warn!("Skipping non UTF-8 file name in {:?}", dir);
                    continue;
                };
                objects.push(StoredObject {
                    key,
                    size: metadata.len(),
                    location: entry.path().display().to_string(),
                    url: None,
                });
            }

            objects.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(objects)
        })
        .await?
    }

    async fn get(&self, owner: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(owner, key)?;
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            match fs::read(&path) {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(&key)),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn delete(&self, owner: &str, key: &str) -> Result<()> {
        let path = self.artifact_path(owner, key)?;
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("Deleted local artifact {:?}", path);
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(&key)),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }
}
