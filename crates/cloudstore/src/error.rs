use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status} ({code}): {message}")]
    Service {
        service: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
