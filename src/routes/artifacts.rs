use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{parse_targets, Artifact, Backend};
use crate::naming::parse_key;
use crate::service::ArtifactListing;
use crate::sessions::Session;
use crate::AppState;

fn default_targets() -> String {
    "local,remote".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Original file name
    pub name: String,
    /// Comma separated backends, e.g. `local,remote`
    #[serde(default = "default_targets")]
    pub targets: String,
    /// Repository folder for the remote copy, overriding the configured one
    pub path: Option<String>,
}

/// Optional remote folder for list, download and delete
#[derive(Debug, Default, Deserialize)]
pub struct FolderParams {
    pub path: Option<String>,
}

/// Result of one target within an upload
#[derive(Debug, Serialize)]
pub struct TargetOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<Artifact>> for TargetOutcome {
    fn from(result: Result<Artifact>) -> Self {
        match result {
            Ok(artifact) => TargetOutcome {
                success: true,
                artifact: Some(artifact),
                error: None,
            },
            Err(e) => TargetOutcome {
                success: false,
                artifact: None,
                error: Some(e.status_and_message().1),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<TargetOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<TargetOutcome>,
}

#[derive(Debug, Serialize)]
pub struct DeleteArtifactResponse {
    pub success: bool,
}

/// Upload the request body as a file
///
/// `POST /api/artifacts?name=report.pdf&targets=local,remote&path=team/reports`
///
/// Each target is attempted independently; the response carries one outcome
/// per requested target, so a remote failure still reports the local copy.
pub async fn upload_artifact(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let targets = parse_targets(&params.targets)?;
    let artifacts = state.artifacts.in_folder(params.path.as_deref())?;

    let report = artifacts
        .upload(&session.username, &params.name, &body, &targets)
        .await?;

    Ok(Json(UploadResponse {
        local: report.local.map(TargetOutcome::from),
        remote: report.remote.map(TargetOutcome::from),
    }))
}

/// List the caller's artifacts in both backends
pub async fn list_artifacts(
    State(state): State<AppState>,
    session: Session,
    Query(folder): Query<FolderParams>,
) -> Result<Json<ArtifactListing>> {
    let artifacts = state.artifacts.in_folder(folder.path.as_deref())?;
    Ok(Json(artifacts.list(&session.username).await?))
}

/// Download one artifact
pub async fn download_artifact(
    State(state): State<AppState>,
    session: Session,
    Path((backend, key)): Path<(String, String)>,
    Query(folder): Query<FolderParams>,
) -> Result<Response> {
    let backend: Backend = backend.parse()?;
    let bytes = state
        .artifacts
        .in_folder(folder.path.as_deref())?
        .get(&session.username, &key, backend)
        .await?;

    let name = parse_key(&key)
        .map(|parts| parts.original_name)
        .unwrap_or(key);
    let disposition = format!("attachment; filename=\"{}\"", header_safe(&name));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Delete one artifact from the named backend
pub async fn delete_artifact(
    State(state): State<AppState>,
    session: Session,
    Path((backend, key)): Path<(String, String)>,
    Query(folder): Query<FolderParams>,
) -> Result<Json<DeleteArtifactResponse>> {
    let backend: Backend = backend.parse()?;
    state
        .artifacts
        .in_folder(folder.path.as_deref())?
        .delete(&session.username, &key, backend)
        .await?;

    Ok(Json(DeleteArtifactResponse { success: true }))
}

/// File name reduced to characters valid inside a quoted header parameter
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
