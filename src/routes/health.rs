use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Reports whether the local storage root and the credential file are
/// reachable. The remote backend is not probed to keep the check cheap and
/// within API rate limits.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let local_root = state.config.local_root.clone();
    let users_csv = state.credentials.path().to_path_buf();

    let (local_status, credentials_status) = tokio::task::spawn_blocking(move || {
        let local = match std::fs::metadata(&local_root) {
            Ok(m) if m.is_dir() => "available",
            Ok(_) => "unavailable",
            Err(e) => {
                tracing::error!("Local storage health check failed: {:?}", e);
                "unavailable"
            }
        };
        let credentials = match std::fs::metadata(&users_csv) {
            Ok(m) if m.is_file() => "available",
            _ => "unavailable",
        };
        (local, credentials)
    })
    .await
    .unwrap_or(("error", "error"));

    let healthy = local_status == "available" && credentials_status == "available";

    Json(json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "localStorage": local_status,
        "credentials": credentials_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
