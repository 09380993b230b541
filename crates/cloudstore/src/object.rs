use async_trait::async_trait;
use bytes::Bytes;

use crate::{Result, StoreError};

const MAX_KEY_LEN: usize = 1024;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Make sure `prefix` can hold objects. Idempotent and safe to race.
    async fn ensure_prefix(&self, prefix: &str) -> Result<()>;

    /// Write one object, replacing any existing object under `key`.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}

/// Keys are `/`-separated relative paths with no empty, `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = |why: &str| Err(StoreError::InvalidKey(format!("{key:?}: {why}")));

    if key.is_empty() {
        return invalid("empty");
    }
    if key.len() > MAX_KEY_LEN {
        return invalid("too long");
    }
    if key.contains('\\') || key.chars().any(char::is_control) {
        return invalid("contains a backslash or control character");
    }
    for segment in key.split('/') {
        match segment {
            "" => return invalid("empty segment"),
            "." | ".." => return invalid("relative segment"),
            _ => {}
        }
    }
    Ok(())
}
