pub mod artifacts;
pub mod health;
pub mod register;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::constants::MAX_UPLOAD_SIZE_BYTES;
use crate::AppState;

pub use artifacts::{delete_artifact, download_artifact, list_artifacts, upload_artifact};
pub use health::health_check;
pub use register::register_user;
pub use session::{login, logout};

/// All API routes, without transport layers (CORS, tracing)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(register_user))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/artifacts", post(upload_artifact).get(list_artifacts))
        .route(
            "/api/artifacts/:backend/:key",
            get(download_artifact).delete(delete_artifact),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE_BYTES))
        .with_state(state)
}
