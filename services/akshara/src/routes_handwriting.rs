use axum::{extract::State, http::{header::USER_AGENT, HeaderMap}, Json};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use practice::{HandwritingAttempt, StoredAttempt};

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const SAVE_FAILED: &str = "Failed to save handwriting sample";

#[derive(Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: &'static str,
    pub filepath: String,
}

/// Persist one practice attempt as its own JSON object under the
/// practice-type partition.
pub async fn ingest_handwriting(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<IngestResponse>> {
    // unparsable payloads are a server-side failure for this endpoint, not a 400
    let attempt: HandwritingAttempt =
        serde_json::from_slice(&body).map_err(ApiError::internal(SAVE_FAILED))?;
    attempt
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let stored = StoredAttempt::new(attempt, user_agent, Utc::now(), Uuid::new_v4());
    let key = stored.object_key();
    let partition = stored.attempt.practice_type.as_str();

    state
        .samples
        .ensure_prefix(partition)
        .await
        .map_err(ApiError::internal(SAVE_FAILED))?;

    let bytes = serde_json::to_vec_pretty(&stored).map_err(ApiError::internal(SAVE_FAILED))?;
    state
        .samples
        .put_object(&key, Bytes::from(bytes), "application/json")
        .await
        .map_err(ApiError::internal(SAVE_FAILED))?;

    info!(
        key = %key,
        practice_type = partition,
        session_id = %stored.attempt.session_id,
        expected = %stored.attempt.expected_alphabet,
        "handwriting: sample saved"
    );

    Ok(Json(IngestResponse {
        success: true,
        message: "Handwriting sample saved",
        filepath: key,
    }))
}
