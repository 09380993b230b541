use std::sync::Arc;

use anyhow::{Context, Result};
use cloudstore::{
    DynamoKv, FileKv, FsObjects, KvStore, MemoryKv, MemoryObjects, ObjectStore, S3Objects, TableSpec,
};
use practice::{PROFILE_KEY, STUDENT_PARTITION_KEY, STUDENT_SORT_KEY};
use tracing::info;

use crate::config::{AppConfig, StorageBackend};

pub type SharedState = Arc<AppState>;

/// Everything a handler needs. Storage handles are injected, never global.
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    pub audio: Arc<dyn ObjectStore>,
    pub samples: Arc<dyn ObjectStore>,
    pub profiles: TableSpec,
    pub students: TableSpec,
    pub backend: StorageBackend,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        kv: Arc<dyn KvStore>,
        audio: Arc<dyn ObjectStore>,
        samples: Arc<dyn ObjectStore>,
        cfg: &AppConfig,
    ) -> Self {
        Self {
            kv,
            audio,
            samples,
            profiles: TableSpec::new(&cfg.profile_table, PROFILE_KEY),
            students: TableSpec::new(&cfg.students_table, STUDENT_PARTITION_KEY)
                .with_sort_key(STUDENT_SORT_KEY),
            backend: cfg.backend,
            max_upload_bytes: cfg.max_upload_bytes,
        }
    }

    /// Build the configured backends. Fails fast on anything unusable.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let (kv, audio, samples): (Arc<dyn KvStore>, Arc<dyn ObjectStore>, Arc<dyn ObjectStore>) =
            match cfg.backend {
                StorageBackend::Memory => (
                    Arc::new(MemoryKv::new()),
                    Arc::new(MemoryObjects::new()),
                    Arc::new(MemoryObjects::new()),
                ),
                StorageBackend::Local => {
                    let root = &cfg.data_dir;
                    std::fs::create_dir_all(root)
                        .with_context(|| format!("Failed to create data dir {}", root.display()))?;
                    info!(data_dir = %root.display(), "storage: local filesystem");
                    (
                        Arc::new(FileKv::new(root.join("kv"))),
                        Arc::new(FsObjects::new(root.join("audio"))),
                        Arc::new(FsObjects::new(root.join("handwriting-samples"))),
                    )
                }
                StorageBackend::Aws => {
                    let creds = cfg
                        .credentials
                        .clone()
                        .context("aws backend without credentials")?;
                    let region = &cfg.aws_region;
                    let endpoint = cfg.s3_endpoint.as_deref();
                    let path_style = cfg.s3_force_path_style;
                    info!(region = %region, "storage: dynamodb + s3");
                    (
                        Arc::new(
                            DynamoKv::new(region, creds.clone(), cfg.dynamodb_endpoint.as_deref())
                                .context("Failed to build DynamoDB client")?,
                        ),
                        Arc::new(S3Objects::new(&cfg.audio_bucket, region, creds.clone(), endpoint, path_style)),
                        Arc::new(S3Objects::new(&cfg.handwriting_bucket, region, creds, endpoint, path_style)),
                    )
                }
            };

        Ok(Self::new(kv, audio, samples, cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_backend_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig {
            data_dir: dir.path().join("nested").join("data"),
            ..AppConfig::default()
        };
        let state = AppState::from_config(&cfg).unwrap();
        assert!(cfg.data_dir.is_dir());
        assert_eq!(state.backend, StorageBackend::Local);
        assert_eq!(state.students.sort_key.as_deref(), Some("studentId"));
    }

    #[test]
    fn test_memory_backend() {
        let cfg = AppConfig {
            backend: StorageBackend::Memory,
            profile_table: "Profiles-dev".into(),
            ..AppConfig::default()
        };
        let state = AppState::from_config(&cfg).unwrap();
        assert_eq!(state.profiles.name, "Profiles-dev");
        assert_eq!(state.profiles.partition_key, "userSub");
    }
}
