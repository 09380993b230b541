use std::fmt::Display;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every way a handler can fail, mapped onto a `{success:false, ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// `detail` is logged, the caller only sees `message`.
    #[error("{message}: {detail}")]
    Internal { message: &'static str, detail: String },

    /// Like `Internal`, but `detail` is forwarded to the caller.
    #[error("{message}: {detail}")]
    Upstream { message: &'static str, detail: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn internal<E: Display>(message: &'static str) -> impl FnOnce(E) -> ApiError {
        move |e| ApiError::Internal { message, detail: e.to_string() }
    }

    pub fn upstream<E: Display>(message: &'static str) -> impl FnOnce(E) -> ApiError {
        move |e| ApiError::Upstream { message, detail: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": msg }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": msg }),
            ),
            ApiError::Internal { message, detail } => {
                error!(%detail, "{message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": message }),
                )
            }
            ApiError::Upstream { message, detail } => {
                error!(%detail, "{message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": message, "message": detail }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
