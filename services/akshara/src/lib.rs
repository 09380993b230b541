pub mod config;
pub mod error;
pub mod state;
pub mod routes_handwriting;
pub mod routes_profile;
pub mod routes_students;
pub mod routes_audio;
pub mod routes_device;

use axum::{extract::{DefaultBodyLimit, State}, routing::{get, post}, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub fn app(state: SharedState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/ingest-handwriting", post(crate::routes_handwriting::ingest_handwriting))
        .route("/api/fetch-profile", get(crate::routes_profile::fetch_profile))
        .route("/api/save-profile", post(crate::routes_profile::save_profile))
        .route("/api/create-student", post(crate::routes_students::create_student))
        .route("/api/list-students", get(crate::routes_students::list_students))
        .route("/api/upload-audio", post(crate::routes_audio::upload_audio))
        .route("/api/device-class", get(crate::routes_device::device_class))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.backend.as_str(),
    }))
}

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
