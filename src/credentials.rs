//! Flat-file credential store
//!
//! One CSV row per user under the header `username,password,recovery_hint`.
//! Rows are only ever appended.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::constants::{CREDENTIALS_HEADER, ERR_FIELDS_REQUIRED};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::security::{burn_password_check, hash_password, verify_password};

/// Handle to the credential file (cheap to clone)
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    // Serializes check-then-append so a username can only be inserted once
    lock: Mutex<()>,
}

impl CredentialStore {
    /// Open the credential file, creating it with a header row if absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Opening credential store at: {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    tracing::error!("Failed to create credential directory: {}", e);
                    e
                })?;
            }
        }

        let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        if needs_header {
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(CREDENTIALS_HEADER)?;
            writer.flush()?;
            tracing::info!("Credential file initialized");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                path: path.to_path_buf(),
                lock: Mutex::new(()),
            }),
        })
    }

    /// Find a user by exact, case-sensitive username
    pub async fn lookup(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.clone();
        let username = username.to_string();

        tokio::task::spawn_blocking(move || {
            let _guard = inner.lock.lock().unwrap_or_else(|e| e.into_inner());
            inner.find(&username)
        })
        .await?
    }

    /// Register a new user
    ///
    /// Returns [`AppError::UserAlreadyExists`] if the username is taken. The
    /// password is hashed before it reaches the file.
    pub async fn insert(&self, username: &str, password: &str, recovery_hint: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() || recovery_hint.trim().is_empty() {
            return Err(AppError::InvalidInput(ERR_FIELDS_REQUIRED.to_string()));
        }
        if !User::validate_username(username) {
            tracing::warn!("Invalid username format: {:?}", username);
            return Err(AppError::InvalidInput(
                "Username must be a plain name without slashes or surrounding spaces".to_string(),
            ));
        }

        let inner = self.inner.clone();
        let username = username.to_string();
        let password = password.to_string();
        let recovery_hint = recovery_hint.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            // PBKDF2 is slow; hash before taking the file lock
            let user = User {
                username,
                password: hash_password(&password),
                recovery_hint,
            };

            let _guard = inner.lock.lock().unwrap_or_else(|e| e.into_inner());

            if inner.find(&user.username)?.is_some() {
                tracing::info!("User already exists: {}", user.username);
                return Err(AppError::UserAlreadyExists);
            }

            let file = OpenOptions::new().append(true).open(&inner.path)?;
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer.serialize(&user)?;
            writer.flush()?;

            tracing::info!("New user registered: {}", user.username);
            Ok(())
        })
        .await?
    }

    /// Check a login attempt, returning the stored user on success
    ///
    /// Unknown usernames still pay for one password verification.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User> {
        let found = self.lookup(username).await?;
        let password = password.to_string();

        let user = tokio::task::spawn_blocking(move || match found {
            Some(user) if verify_password(&password, &user.password) => Some(user),
            Some(_) => None,
            None => {
                burn_password_check(&password);
                None
            }
        })
        .await?;

        user.ok_or_else(|| {
            tracing::warn!("Failed login for user {}", username);
            AppError::InvalidCredentials
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl Inner {
    fn find(&self, username: &str) -> Result<Option<User>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        for row in reader.deserialize::<User>() {
            let user = row?;
            if user.username == username {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> CredentialStore {
        CredentialStore::open(temp_dir.path().join("users.csv")).unwrap()
    }

    #[test]
    fn test_open_writes_header_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("users.csv");

        CredentialStore::open(&path).unwrap();
        CredentialStore::open(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "username,password,recovery_hint\n");
    }

    #[tokio::test]
    async fn test_insert_then_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.insert("alice", "pw1", "pet name").await.unwrap();

        let user = store.lookup("alice").await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.recovery_hint, "pet name");
        assert_ne!(user.password, "pw1");

        // Case-sensitive
        assert!(store.lookup("Alice").await.unwrap().is_none());
        assert!(store.lookup("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.insert("alice", "pw1", "pet name").await.unwrap();
        let second = store.insert("alice", "other", "other hint").await;
        assert!(matches!(second, Err(AppError::UserAlreadyExists)));

        let text = fs::read_to_string(store.path()).unwrap();
        let rows = text.lines().filter(|l| l.starts_with("alice,")).count();
        assert_eq!(rows, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.insert("race", &format!("pw{}", i), "hint").await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(AppError::UserAlreadyExists) => {}
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(successes, 1);

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("race,")).count(), 1);
    }

    #[tokio::test]
    async fn test_insert_validation() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        assert!(matches!(
            store.insert("", "pw", "hint").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert("alice", "", "hint").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert("alice", "pw", " ").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert("../alice", "pw", "hint").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_verify() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        store.insert("alice", "pw1", "pet name").await.unwrap();

        assert_eq!(store.verify("alice", "pw1").await.unwrap().username, "alice");
        assert!(matches!(
            store.verify("alice", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            store.verify("nobody", "pw1").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_costs_a_hash() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        store.insert("alice", "pw1", "pet name").await.unwrap();

        // Warm the throwaway hash so both timings cover verification only
        let _ = store.verify("nobody", "pw1").await;

        let started = std::time::Instant::now();
        let _ = store.verify("alice", "wrong").await;
        let known = started.elapsed();

        let started = std::time::Instant::now();
        let _ = store.verify("nobody", "wrong").await;
        let unknown = started.elapsed();

        // Same order of magnitude, not a bare file scan
        assert!(unknown * 4 > known, "unknown {:?} vs known {:?}", unknown, known);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        open_store(&temp_dir)
            .insert("alice", "pw1", "hint, with comma")
            .await
            .unwrap();

        let reopened = open_store(&temp_dir);
        let user = reopened.lookup("alice").await.unwrap().unwrap();
        assert_eq!(user.recovery_hint, "hint, with comma");
        assert!(reopened.verify("alice", "pw1").await.is_ok());
    }
}
