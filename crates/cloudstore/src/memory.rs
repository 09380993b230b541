//! In-memory backends (tests and `STORAGE_BACKEND=memory`)

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::kv::{Item, ItemKey, KvStore, TableSpec};
use crate::object::{validate_key, ObjectStore};
use crate::Result;

#[derive(Clone, Default)]
pub struct MemoryKv {
    tables: Arc<RwLock<HashMap<String, BTreeMap<ItemKey, Item>>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn put_item(&self, table: &TableSpec, item: Item) -> Result<()> {
        let key = table.key_of(&item)?;
        let mut tables = self.tables.write().await;
        tables.entry(table.name.clone()).or_default().insert(key, item);
        Ok(())
    }

    async fn get_item(&self, table: &TableSpec, key: &ItemKey) -> Result<Option<Item>> {
        table.check_key(key)?;
        let tables = self.tables.read().await;
        Ok(tables.get(&table.name).and_then(|t| t.get(key)).cloned())
    }

    async fn query(&self, table: &TableSpec, partition: &str) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        let Some(t) = tables.get(&table.name) else {
            return Ok(vec![]);
        };
        Ok(t.iter()
            .filter(|(k, _)| k.partition == partition)
            .map(|(_, item)| item.clone())
            .collect())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Clone, Default)]
pub struct MemoryObjects {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    prefixes: Arc<RwLock<BTreeSet<String>>>,
}

impl MemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn has_prefix(&self, prefix: &str) -> bool {
        self.prefixes.read().await.contains(prefix.trim_end_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn ensure_prefix(&self, prefix: &str) -> Result<()> {
        let prefix = prefix.trim_end_matches('/');
        validate_key(prefix)?;
        self.prefixes.write().await.insert(prefix.to_string());
        Ok(())
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        validate_key(key)?;
        let obj = StoredObject {
            body,
            content_type: content_type.to_string(),
        };
        self.objects.write().await.insert(key.to_string(), obj);
        Ok(())
    }
}
