use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "recoveryHint")]
    pub recovery_hint: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
}

/// Register a new user
///
/// Returns 409 Conflict if the username already exists and 400 if any field is
/// blank or the username is not usable as a folder name.
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    state
        .credentials
        .insert(&payload.username, &payload.password, &payload.recovery_hint)
        .await?;

    Ok(Json(RegisterResponse { success: true }))
}
