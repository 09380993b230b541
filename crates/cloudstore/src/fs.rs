//! Local filesystem backends

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::kv::{Item, ItemKey, KvStore, TableSpec};
use crate::object::{validate_key, ObjectStore};
use crate::{Result, StoreError};

/// Objects as plain files under `root`, key segments mapped to directories.
#[derive(Clone, Debug)]
pub struct FsObjects {
    root: PathBuf,
}

impl FsObjects {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }
}

#[async_trait]
impl ObjectStore for FsObjects {
    async fn ensure_prefix(&self, prefix: &str) -> Result<()> {
        let dir = self.path_for(prefix.trim_end_matches('/'))?;
        // create_dir_all treats a concurrent creator's directory as success
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(&path, &body).await?;
        debug!(key, content_type, bytes = body.len(), "fs: object written");
        Ok(())
    }
}

/// One JSON array file per table under `dir`.
///
/// Writes are serialized through a single lock; readers see either the old
/// or the new file thanks to rename.
pub struct FileKv {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn table_path(&self, table: &TableSpec) -> Result<PathBuf> {
        let ok = !table.name.is_empty()
            && table
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !table.name.starts_with('.');
        if !ok {
            return Err(StoreError::InvalidKey(format!("bad table name {:?}", table.name)));
        }
        Ok(self.dir.join(format!("{}.json", table.name)))
    }

    async fn load(&self, path: &Path) -> Result<Vec<Item>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn put_item(&self, table: &TableSpec, item: Item) -> Result<()> {
        let path = self.table_path(table)?;
        let key = table.key_of(&item)?;

        let _guard = self.write_lock.lock().await;
        let mut items = self.load(&path).await?;
        match items
            .iter()
            .position(|it| table.key_of(it).map(|k| k == key).unwrap_or(false))
        {
            Some(i) => items[i] = item,
            None => items.push(item),
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        write_atomic(&path, &serde_json::to_vec_pretty(&items)?).await?;
        Ok(())
    }

    async fn get_item(&self, table: &TableSpec, key: &ItemKey) -> Result<Option<Item>> {
        table.check_key(key)?;
        let items = self.load(&self.table_path(table)?).await?;
        Ok(items
            .into_iter()
            .find(|it| table.key_of(it).map(|k| &k == key).unwrap_or(false)))
    }

    async fn query(&self, table: &TableSpec, partition: &str) -> Result<Vec<Item>> {
        let items = self.load(&self.table_path(table)?).await?;
        let mut hits: Vec<(ItemKey, Item)> = items
            .into_iter()
            .filter_map(|it| table.key_of(&it).ok().map(|k| (k, it)))
            .filter(|(k, _)| k.partition == partition)
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(hits.into_iter().map(|(_, it)| it).collect())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::InvalidKey(format!("no file name in {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp-{}", Uuid::new_v4().simple()));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::to_item;
    use serde_json::json;

    #[tokio::test]
    async fn test_objects_land_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjects::new(dir.path());

        store.ensure_prefix("capital-alphabets").await.unwrap();
        assert!(dir.path().join("capital-alphabets").is_dir());

        store
            .put_object("capital-alphabets/a.json", Bytes::from_static(b"{\"a\":1}"), "application/json")
            .await
            .unwrap();
        let on_disk = std::fs::read(dir.path().join("capital-alphabets").join("a.json")).unwrap();
        assert_eq!(on_disk, b"{\"a\":1}");

        // no temp files left behind
        let names: Vec<_> = std::fs::read_dir(dir.path().join("capital-alphabets"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_objects_reject_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjects::new(dir.path().join("root"));
        assert!(store.put_object("../escape.txt", Bytes::new(), "text/plain").await.is_err());
        assert!(store.ensure_prefix("/etc").await.is_err());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_ensure_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsObjects::new(dir.path()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let s = store.clone();
            handles.push(tokio::spawn(async move { s.ensure_prefix("numbers").await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(dir.path().join("numbers").is_dir());
    }

    #[tokio::test]
    async fn test_file_kv_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::new(dir.path().join("kv"));
        let table = TableSpec::new("UserProfiles", "userSub");

        assert!(kv.get_item(&table, &ItemKey::partition("u1")).await.unwrap().is_none());

        kv.put_item(&table, to_item(&json!({"userSub": "u1", "school": "A"})).unwrap())
            .await
            .unwrap();
        kv.put_item(&table, to_item(&json!({"userSub": "u1", "school": "B"})).unwrap())
            .await
            .unwrap();
        kv.put_item(&table, to_item(&json!({"userSub": "u2", "school": "C"})).unwrap())
            .await
            .unwrap();

        let u1 = kv.get_item(&table, &ItemKey::partition("u1")).await.unwrap().unwrap();
        assert_eq!(u1["school"], "B");

        // a fresh handle sees the persisted file
        let reopened = FileKv::new(dir.path().join("kv"));
        assert_eq!(reopened.query(&table, "u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_kv_rejects_bad_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::new(dir.path());
        let table = TableSpec::new("../oops", "id");
        assert!(kv.query(&table, "x").await.is_err());
    }
}
