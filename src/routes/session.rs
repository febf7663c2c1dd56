use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sessions::Session;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Exchange username and password for a bearer session token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state
        .credentials
        .verify(&payload.username, &payload.password)
        .await?;

    let session = state.sessions.create(&user.username);

    Ok(Json(LoginResponse {
        expires_at: session.expires_at(state.sessions.ttl()).to_rfc3339(),
        token: session.token,
        username: session.username,
    }))
}

/// End the caller's session
pub async fn logout(State(state): State<AppState>, session: Session) -> Json<LogoutResponse> {
    state.sessions.revoke(&session.token);
    tracing::info!("Session ended for {}", session.username);

    Json(LogoutResponse { success: true })
}
