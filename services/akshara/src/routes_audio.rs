use axum::extract::{multipart::MultipartRejection, Multipart, State};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use practice::sanitize_name;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const MAX_LETTER_LEN: usize = 8;

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
}

/// `english/alphabets/{letter}/{name}_{epoch millis}.wav`
pub fn audio_key(letter: &str, user_name: Option<&str>, epoch_millis: i64) -> String {
    format!(
        "english/alphabets/{letter}/{}_{epoch_millis}.wav",
        sanitize_name(user_name)
    )
}

pub async fn upload_audio(
    State(state): State<SharedState>,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut mp = mp.map_err(bad_request)?;

    let mut audio: Option<Bytes> = None;
    let mut letter: Option<String> = None;
    let mut user_id: Option<String> = None;
    let mut user_name: Option<String> = None;

    while let Some(field) = mp.next_field().await.map_err(bad_request)? {
        match field.name() {
            Some("audio") => audio = Some(field.bytes().await.map_err(bad_request)?),
            Some("letter") => letter = Some(field.text().await.map_err(bad_request)?),
            Some("userId") => user_id = Some(field.text().await.map_err(bad_request)?),
            Some("userName") => user_name = Some(field.text().await.map_err(bad_request)?),
            _ => {}
        }
    }

    let audio = audio.filter(|b| !b.is_empty());
    let letter = crate::required(letter);
    let user_id = crate::required(user_id);

    let mut missing = Vec::new();
    if audio.is_none() {
        missing.push("audio");
    }
    if letter.is_none() {
        missing.push("letter");
    }
    if user_id.is_none() {
        missing.push("userId");
    }
    let (Some(audio), Some(letter), Some(user_id)) = (audio, letter, user_id) else {
        return Err(ApiError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    // the letter becomes a key segment
    if letter.len() > MAX_LETTER_LEN || !letter.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::BadRequest(format!(
            "letter must be 1 to {MAX_LETTER_LEN} ASCII letters or digits"
        )));
    }

    let key = audio_key(&letter, user_name.as_deref(), Utc::now().timestamp_millis());
    let size = audio.len();
    state
        .audio
        .put_object(&key, audio, "audio/wav")
        .await
        .map_err(ApiError::internal("Failed to upload audio"))?;

    info!(key = %key, user_id = %user_id, bytes = size, "audio: uploaded");
    Ok(Json(UploadResponse { success: true, key }))
}

fn bad_request<E: std::fmt::Display>(e: E) -> ApiError {
    ApiError::BadRequest(e.to_string())
}
