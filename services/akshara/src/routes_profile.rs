use axum::{extract::{Query, State}, Json};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use cloudstore::{to_item, Item, ItemKey};
use practice::{ProfileDetails, UserProfile, CREATED_AT};

use crate::error::{ApiError, ApiResult};
use crate::required;
use crate::state::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    pub user_sub: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(flatten)]
    pub profile: Item,
}

/// Returns the stored attributes as-is. Other clients write this table too,
/// so nothing is re-typed on the way out.
pub async fn fetch_profile(
    State(state): State<SharedState>,
    Query(q): Query<ProfileQuery>,
) -> ApiResult<Json<ProfileResponse>> {
    let user_sub = required(q.user_sub)
        .ok_or_else(|| ApiError::BadRequest("userSub is required".into()))?;

    let mut profile = state
        .kv
        .get_item(&state.profiles, &ItemKey::partition(user_sub))
        .await
        .map_err(ApiError::internal("Failed to fetch profile"))?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    // the envelope owns this key
    profile.remove("success");
    Ok(Json(ProfileResponse { success: true, profile }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub user_sub: Option<String>,
    #[serde(flatten)]
    pub details: ProfileDetails,
}

#[derive(Serialize)]
pub struct SaveProfileResponse {
    pub success: bool,
    pub profile: UserProfile,
}

/// Create or replace the caller's profile.
pub async fn save_profile(
    State(state): State<SharedState>,
    body: Bytes,
) -> ApiResult<Json<SaveProfileResponse>> {
    const SAVE_FAILED: &str = "Failed to save profile";

    let req: SaveProfileRequest =
        serde_json::from_slice(&body).map_err(ApiError::internal(SAVE_FAILED))?;
    let user_sub = required(req.user_sub)
        .ok_or_else(|| ApiError::BadRequest("userSub is required".into()))?;

    // a re-save keeps the original creation time, whatever its stored shape
    let existing = state
        .kv
        .get_item(&state.profiles, &ItemKey::partition(user_sub.as_str()))
        .await
        .map_err(ApiError::internal(SAVE_FAILED))?;
    let created_at = existing
        .and_then(|mut item| item.remove(CREATED_AT))
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)));

    let profile = UserProfile {
        user_sub,
        details: req.details,
        created_at: Some(created_at),
    };

    let item = to_item(&profile).map_err(ApiError::internal(SAVE_FAILED))?;
    state
        .kv
        .put_item(&state.profiles, item)
        .await
        .map_err(ApiError::internal(SAVE_FAILED))?;

    info!(user_sub = %profile.user_sub, "profile: saved");
    Ok(Json(SaveProfileResponse { success: true, profile }))
}
