use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{Result, StoreError};

/// One record: a flat JSON object, key attributes included.
pub type Item = serde_json::Map<String, Value>;

/// Table name plus its key schema. Key attributes are always strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Pull the key out of an item, failing if a key attribute is missing or not a string.
    pub fn key_of(&self, item: &Item) -> Result<ItemKey> {
        let partition = string_attr(item, &self.partition_key)?;
        let sort = match &self.sort_key {
            Some(sk) => Some(string_attr(item, sk)?),
            None => None,
        };
        Ok(ItemKey { partition, sort })
    }

    /// A lookup key must carry a sort value exactly when the table has a sort key.
    pub fn check_key(&self, key: &ItemKey) -> Result<()> {
        match (&self.sort_key, &key.sort) {
            (Some(sk), None) => Err(StoreError::InvalidKey(format!(
                "table {} requires sort key {sk}",
                self.name
            ))),
            (None, Some(_)) => Err(StoreError::InvalidKey(format!(
                "table {} has no sort key",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

fn string_attr(item: &Item, attr: &str) -> Result<String> {
    item.get(attr)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidItem(format!("missing string key attribute {attr}")))
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub partition: String,
    pub sort: Option<String>,
}

impl ItemKey {
    pub fn partition(value: impl Into<String>) -> Self {
        Self { partition: value.into(), sort: None }
    }

    pub fn with_sort(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Insert or fully replace the item with the same key.
    async fn put_item(&self, table: &TableSpec, item: Item) -> Result<()>;

    async fn get_item(&self, table: &TableSpec, key: &ItemKey) -> Result<Option<Item>>;

    /// Every item under `partition`, ordered by sort key.
    async fn query(&self, table: &TableSpec, partition: &str) -> Result<Vec<Item>>;
}

pub fn to_item<T: Serialize>(record: &T) -> Result<Item> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidItem(format!("expected a JSON object, got {other}"))),
    }
}
