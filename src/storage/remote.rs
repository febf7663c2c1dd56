//! GitHub Contents API backend
//!
//! Artifacts live at `{target_path}/{owner}/uploads/{key}` on the configured
//! branch. Every write is a commit: the current blob SHA is resolved first and
//! sent along when the path already exists, otherwise the API rejects the
//! write. Nothing here retries; a stale SHA from a concurrent writer comes back
//! as [`AppError::Remote`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{header, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::config::GitHubConfig;
use crate::constants::{GITHUB_ACCEPT, REMOTE_UPLOADS_DIR, USER_AGENT};
use crate::error::{AppError, Result};
use crate::models::{Backend, StoredObject};
use crate::naming::{is_safe_path_component, normalize_folder, parse_key, validate_key};
use crate::storage::ArtifactBackend;

const GITHUB_RAW_ACCEPT: &str = "application/vnd.github.raw";

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutContentRequest {
    pub message: String,
    /// Base64 of the file bytes
    pub content: String,
    pub branch: String,
    /// Present only when updating an existing blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl PutContentRequest {
    pub fn new(message: &str, bytes: &[u8], branch: &str, sha: Option<String>) -> Self {
        Self {
            message: message.to_string(),
            content: BASE64.encode(bytes),
            branch: branch.to_string(),
            sha,
        }
    }
}

/// Body of `DELETE /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteContentRequest {
    pub message: String,
    pub sha: String,
    pub branch: String,
}

/// File or directory entry returned by the contents endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: RemoteEntry,
}

/// Decode the `content` field, which GitHub wraps at 60 columns
pub fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(BASE64.decode(compact)?)
}

async fn remote_error(response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AppError::Remote { status, body }
}

/// Client for one repository and branch
#[derive(Clone)]
pub struct RemoteBackend {
    client: reqwest::Client,
    api_base: Url,
    config: GitHubConfig,
}

impl RemoteBackend {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(AppError::Config("GitHub token must be set".to_string()));
        }

        let api_base = Url::parse(&config.api_url)
            .map_err(|e| AppError::Config(format!("Invalid GitHub API URL: {}", e)))?;
        if api_base.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "GitHub API URL cannot be a base: {}",
                config.api_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            config: config.clone(),
        })
    }

    /// Same repository and branch, with uploads under `folder` instead of the
    /// configured target path
    pub fn with_target_path(&self, folder: &str) -> Result<Self> {
        let mut relocated = self.clone();
        relocated.config.target_path = normalize_folder(folder)?;
        Ok(relocated)
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}` with each segment escaped
    fn contents_url(&self, path: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([
                    "repos",
                    self.config.repo_owner.as_str(),
                    self.config.repo_name.as_str(),
                    "contents",
                ])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    fn contents_url_on_branch(&self, path: &str) -> Url {
        let mut url = self.contents_url(path);
        url.query_pairs_mut()
            .append_pair("ref", &self.config.branch);
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.request_accepting(method, url, GITHUB_ACCEPT)
    }

    fn request_accepting(&self, method: Method, url: Url, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header(header::ACCEPT, accept)
    }

    /// Folder holding one owner's uploads
    pub fn owner_dir(&self, owner: &str) -> Result<String> {
        if !is_safe_path_component(owner) {
            return Err(AppError::InvalidInput(format!("Invalid owner: {}", owner)));
        }
        let mut parts: Vec<&str> = self
            .config
            .target_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        parts.push(owner);
        parts.push(REMOTE_UPLOADS_DIR);
        Ok(parts.join("/"))
    }

    /// Repository path of one artifact
    pub fn artifact_path(&self, owner: &str, key: &str) -> Result<String> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.owner_dir(owner)?, key))
    }

    /// Current blob SHA at `path`, or `None` when nothing is there yet
    pub async fn resolve_sha(&self, path: &str) -> Result<Option<String>> {
        let response = self
            .request(Method::GET, self.contents_url_on_branch(path))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let entry: RemoteEntry = response.json().await?;
                Ok(Some(entry.sha))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(remote_error(response).await),
        }
    }

    /// Commit `bytes` to `path`, creating or updating as needed
    ///
    /// Returns the committed entry; its `path` is the repository path.
    pub async fn put_path(&self, path: &str, bytes: &[u8], message: &str) -> Result<RemoteEntry> {
        let sha = self.resolve_sha(path).await?;
        let updating = sha.is_some();
        let body = PutContentRequest::new(message, bytes, &self.config.branch, sha);

        let response = self
            .request(Method::PUT, self.contents_url(path))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = remote_error(response).await;
            tracing::warn!("Remote commit to {} failed: {}", path, err);
            return Err(err);
        }

        let committed: PutContentResponse = response.json().await?;
        tracing::info!(
            "Remote {} {} ({} bytes)",
            if updating { "updated" } else { "created" },
            committed.content.path,
            bytes.len()
        );
        Ok(committed.content)
    }

    /// Entries directly under `path`; a path that does not exist yet is empty
    pub async fn list_path(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let response = self
            .request(Method::GET, self.contents_url_on_branch(path))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response.json().await?),
            _ => Err(remote_error(response).await),
        }
    }

    /// File bytes at `path`
    pub async fn get_path(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .request(Method::GET, self.contents_url_on_branch(path))
            .send()
            .await?;

        let entry: RemoteEntry = match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!("Remote file {}", path)))
            }
            status if status.is_success() => response.json().await?,
            _ => return Err(remote_error(response).await),
        };

        match (entry.encoding.as_deref(), entry.content.as_deref()) {
            (Some("base64"), Some(content)) => decode_content(content),
            // Files over 1MB come back without inline content
            _ => self.get_raw(path).await,
        }
    }

    async fn get_raw(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .request_accepting(Method::GET, self.contents_url_on_branch(path), GITHUB_RAW_ACCEPT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Remove the file at `path` with a commit
    pub async fn delete_path(&self, path: &str, message: &str) -> Result<()> {
        let sha = self
            .resolve_sha(path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Remote file {}", path)))?;

        let body = DeleteContentRequest {
            message: message.to_string(),
            sha,
            branch: self.config.branch.clone(),
        };

        let response = self
            .request(Method::DELETE, self.contents_url(path))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        tracing::info!("Remote deleted {}", path);
        Ok(())
    }
}

#[async_trait]
impl ArtifactBackend for RemoteBackend {
    fn kind(&self) -> Backend {
        Backend::Remote
    }

    fn relocated(&self, folder: &str) -> Result<Arc<dyn ArtifactBackend>> {
        Ok(Arc::new(self.with_target_path(folder)?))
    }

    async fn put(&self, owner: &str, key: &str, bytes: &[u8]) -> Result<StoredObject> {
        let path = self.artifact_path(owner, key)?;
        let name = parse_key(key)
            .map(|parts| parts.original_name)
            .unwrap_or_else(|| key.to_string());
        let message = format!("Upload {} by {}", name, owner);

        let entry = self.put_path(&path, bytes, &message).await?;

        Ok(StoredObject {
            key: key.to_string(),
            size: bytes.len() as u64,
            location: entry.path,
            url: entry.html_url,
        })
    }

    async fn list(&self, owner: &str) -> Result<Vec<StoredObject>> {
        let dir = self.owner_dir(owner)?;
        let mut objects: Vec<StoredObject> = self
            .list_path(&dir)
            .await?
            .into_iter()
            .filter(|entry| entry.kind == "file")
            .map(|entry| StoredObject {
                key: entry.name,
                size: entry.size,
                location: entry.path,
                url: entry.html_url,
            })
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get(&self, owner: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(owner, key)?;
        self.get_path(&path).await
    }

    async fn delete(&self, owner: &str, key: &str) -> Result<()> {
        let path = self.artifact_path(owner, key)?;
        self.delete_path(&path, &format!("Delete {} by {}", key, owner))
            .await
    }
}
