use axum::{http::HeaderMap, Json};
use serde::Serialize;

use practice::{is_desktop, ClientEnvironment};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClassResponse {
    pub desktop: bool,
    pub viewport_width: Option<u32>,
}

/// Classify the caller from client hints. Browsers only send the viewport
/// width when asked to (`Accept-CH`); without it there is nothing to measure.
pub async fn device_class(headers: HeaderMap) -> Json<DeviceClassResponse> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let viewport_width = header("sec-ch-viewport-width")
        .or_else(|| header("viewport-width"))
        .and_then(|v| v.trim().parse::<u32>().ok());

    let env = viewport_width.map(|width| ClientEnvironment {
        viewport_width: width,
        user_agent: header("user-agent").unwrap_or_default().to_string(),
        ..Default::default()
    });

    Json(DeviceClassResponse {
        desktop: is_desktop(env.as_ref()),
        viewport_width,
    })
}
