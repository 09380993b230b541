use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cloudstore::Credentials;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Local,
    Aws,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Local => "local",
            StorageBackend::Aws => "aws",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "local" => Ok(StorageBackend::Local),
            "aws" => Ok(StorageBackend::Aws),
            other => bail!("STORAGE_BACKEND must be one of memory, local, aws (got {other:?})"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub backend: StorageBackend,
    pub data_dir: PathBuf,

    pub aws_region: String,
    pub credentials: Option<Credentials>,

    pub profile_table: String,
    pub students_table: String,
    pub audio_bucket: String,
    pub handwriting_bucket: String,

    pub s3_endpoint: Option<String>,
    pub s3_force_path_style: bool,
    pub dynamodb_endpoint: Option<String>,

    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            backend: StorageBackend::Local,
            data_dir: PathBuf::from("data"),
            aws_region: "us-east-1".to_string(),
            credentials: None,
            profile_table: "UserProfiles".to_string(),
            students_table: "Students".to_string(),
            audio_bucket: "akshara-audio-recordings".to_string(),
            handwriting_bucket: "akshara-handwriting-samples".to_string(),
            s3_endpoint: None,
            s3_force_path_style: false,
            dynamodb_endpoint: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads through `lookup`.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("AKSHARA_BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Some(v) = get("STORAGE_BACKEND") {
            cfg.backend = StorageBackend::parse(&v)?;
        }
        if let Some(v) = get("DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("AWS_REGION") {
            cfg.aws_region = v;
        }
        if let Some(v) = get("PROFILE_TABLE") {
            cfg.profile_table = v;
        }
        if let Some(v) = get("STUDENTS_TABLE") {
            cfg.students_table = v;
        }
        if let Some(v) = get("AUDIO_BUCKET") {
            cfg.audio_bucket = v;
        }
        if let Some(v) = get("HANDWRITING_BUCKET") {
            cfg.handwriting_bucket = v;
        }

        cfg.s3_endpoint = get("S3_ENDPOINT");
        cfg.dynamodb_endpoint = get("DYNAMODB_ENDPOINT");
        // custom endpoints (MinIO) almost never do virtual-hosted buckets
        cfg.s3_force_path_style = match get("S3_FORCE_PATH_STYLE") {
            Some(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"),
            None => cfg.s3_endpoint.is_some(),
        };

        if let Some(v) = get("MAX_UPLOAD_BYTES") {
            cfg.max_upload_bytes = v
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES is not a number: {v}"))?;
        }

        cfg.credentials = match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: get("AWS_SESSION_TOKEN"),
            }),
            _ => None,
        };

        for (name, url) in [("S3_ENDPOINT", &cfg.s3_endpoint), ("DYNAMODB_ENDPOINT", &cfg.dynamodb_endpoint)] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    bail!("{name} must start with http:// or https://");
                }
            }
        }
        if cfg.backend == StorageBackend::Aws && cfg.credentials.is_none() {
            bail!("STORAGE_BACKEND=aws needs AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY");
        }

        Ok(cfg)
    }
}
