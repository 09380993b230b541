//! DynamoDB over its JSON 1.0 protocol.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::kv::{Item, ItemKey, KvStore, TableSpec};
use crate::sigv4::{Credentials, RequestSigner};
use crate::{Result, StoreError};

const TARGET_PREFIX: &str = "DynamoDB_20120810";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

pub struct DynamoKv {
    client: reqwest::Client,
    endpoint: Url,
    signer: RequestSigner,
}

impl DynamoKv {
    /// `endpoint` overrides the regional AWS endpoint (DynamoDB Local).
    pub fn new(region: &str, creds: Credentials, endpoint: Option<&str>) -> Result<Self> {
        let raw = match endpoint {
            Some(ep) => ep.to_string(),
            None => format!("https://dynamodb.{region}.amazonaws.com/"),
        };
        let endpoint = Url::parse(&raw).map_err(|e| StoreError::Config(format!("dynamodb endpoint {raw}: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            signer: RequestSigner::new(creds, region, "dynamodb"),
        })
    }

    async fn call(&self, operation: &str, body: &Value) -> Result<Value> {
        let payload = serde_json::to_vec(body)?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let headers = self.signer.sign(
            "POST",
            &self.endpoint,
            &[("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())],
            &payload,
            Utc::now(),
        );

        let mut req = self.client.post(self.endpoint.clone()).body(payload);
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        debug!(operation, status = status.as_u16(), "dynamodb: response");

        if !status.is_success() {
            return Err(service_error(status.as_u16(), &bytes));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn key_attributes(table: &TableSpec, key: &ItemKey) -> Result<Map<String, Value>> {
        table.check_key(key)?;
        let mut out = Map::new();
        out.insert(table.partition_key.clone(), json!({ "S": key.partition }));
        if let (Some(sk), Some(sort)) = (&table.sort_key, &key.sort) {
            out.insert(sk.clone(), json!({ "S": sort }));
        }
        Ok(out)
    }
}

#[async_trait]
impl KvStore for DynamoKv {
    async fn put_item(&self, table: &TableSpec, item: Item) -> Result<()> {
        table.key_of(&item)?;
        let body = json!({
            "TableName": table.name,
            "Item": to_attribute_map(&item),
        });
        self.call("PutItem", &body).await?;
        Ok(())
    }

    async fn get_item(&self, table: &TableSpec, key: &ItemKey) -> Result<Option<Item>> {
        let body = json!({
            "TableName": table.name,
            "Key": Self::key_attributes(table, key)?,
        });
        let resp = self.call("GetItem", &body).await?;
        match resp.get("Item").and_then(Value::as_object) {
            Some(attrs) => Ok(Some(from_attribute_map(attrs)?)),
            None => Ok(None),
        }
    }

    async fn query(&self, table: &TableSpec, partition: &str) -> Result<Vec<Item>> {
        let mut out = Vec::new();
        let mut start_key: Option<Value> = None;

        loop {
            let mut body = json!({
                "TableName": table.name,
                "KeyConditionExpression": "#pk = :pk",
                "ExpressionAttributeNames": { "#pk": table.partition_key },
                "ExpressionAttributeValues": { ":pk": { "S": partition } },
            });
            if let Some(k) = start_key.take() {
                body["ExclusiveStartKey"] = k;
            }

            let resp = self.call("Query", &body).await?;
            if let Some(items) = resp.get("Items").and_then(Value::as_array) {
                for attrs in items {
                    let attrs = attrs
                        .as_object()
                        .ok_or_else(|| StoreError::InvalidItem("query item is not an object".into()))?;
                    out.push(from_attribute_map(attrs)?);
                }
            }

            match resp.get("LastEvaluatedKey") {
                Some(k) if !k.is_null() => start_key = Some(k.clone()),
                _ => break,
            }
        }
        Ok(out)
    }
}

fn service_error(status: u16, body: &[u8]) -> StoreError {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let code = parsed
        .get("__type")
        .and_then(Value::as_str)
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let message = parsed
        .get("message")
        .or_else(|| parsed.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    StoreError::Service { service: "dynamodb", status, code, message }
}

/// Plain JSON value to a DynamoDB attribute value.
pub fn to_attribute(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "NULL": true }),
        Value::Bool(b) => json!({ "BOOL": b }),
        Value::Number(n) => json!({ "N": n.to_string() }),
        Value::String(s) => json!({ "S": s }),
        Value::Array(items) => json!({ "L": items.iter().map(to_attribute).collect::<Vec<_>>() }),
        Value::Object(map) => json!({ "M": to_attribute_map(map) }),
    }
}

fn to_attribute_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect()
}

/// DynamoDB attribute value back to plain JSON. Sets come back as arrays,
/// binary as its base64 text.
pub fn from_attribute(attr: &Value) -> Result<Value> {
    let bad = || StoreError::InvalidItem(format!("not an attribute value: {attr}"));

    let obj = attr.as_object().filter(|o| o.len() == 1).ok_or_else(bad)?;
    let Some((tag, inner)) = obj.iter().next() else {
        return Err(bad());
    };

    match tag.as_str() {
        "S" | "B" => inner.as_str().map(|s| Value::String(s.to_string())).ok_or_else(bad),
        "N" => parse_number(inner.as_str().ok_or_else(bad)?),
        "BOOL" => inner.as_bool().map(Value::Bool).ok_or_else(bad),
        "NULL" => Ok(Value::Null),
        "L" => inner
            .as_array()
            .ok_or_else(bad)?
            .iter()
            .map(from_attribute)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        "M" => from_attribute_map(inner.as_object().ok_or_else(bad)?).map(Value::Object),
        "SS" | "BS" => Ok(inner.clone()),
        "NS" => inner
            .as_array()
            .ok_or_else(bad)?
            .iter()
            .map(|n| parse_number(n.as_str().ok_or_else(bad)?))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(StoreError::InvalidItem(format!("unsupported attribute type {other}"))),
    }
}

fn from_attribute_map(attrs: &Map<String, Value>) -> Result<Item> {
    attrs
        .iter()
        .map(|(k, v)| from_attribute(v).map(|v| (k.clone(), v)))
        .collect()
}

fn parse_number(text: &str) -> Result<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Ok(Value::from(u));
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::InvalidItem(format!("bad number attribute {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_item_to_attributes() {
        let item = json!({
            "userSub": "abc-123",
            "age": 7,
            "verified": false,
            "school": null,
            "tags": ["a", 1],
            "address": { "district": "Pune" }
        });
        let attrs = to_attribute(&item);
        assert_eq!(
            attrs,
            json!({ "M": {
                "userSub": { "S": "abc-123" },
                "age": { "N": "7" },
                "verified": { "BOOL": false },
                "school": { "NULL": true },
                "tags": { "L": [{ "S": "a" }, { "N": "1" }] },
                "address": { "M": { "district": { "S": "Pune" } } }
            }})
        );
        assert_eq!(from_attribute(&attrs).unwrap(), item);
    }

    #[test]
    fn test_numbers_and_sets_from_attributes() {
        assert_eq!(from_attribute(&json!({ "N": "0.93" })).unwrap(), json!(0.93));
        assert_eq!(from_attribute(&json!({ "N": "-4" })).unwrap(), json!(-4));
        assert_eq!(from_attribute(&json!({ "SS": ["x", "y"] })).unwrap(), json!(["x", "y"]));
        assert_eq!(from_attribute(&json!({ "NS": ["1", "2.5"] })).unwrap(), json!([1, 2.5]));
    }

    #[test]
    fn test_rejects_malformed_attributes() {
        assert!(from_attribute(&json!({ "N": "seven" })).is_err());
        assert!(from_attribute(&json!({ "S": "a", "N": "1" })).is_err());
        assert!(from_attribute(&json!("plain")).is_err());
        assert!(from_attribute(&json!({ "Q": 1 })).is_err());
    }

    #[test]
    fn test_service_error_parsing() {
        let body = br#"{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","message":"Requested resource not found"}"#;
        match service_error(400, body) {
            StoreError::Service { code, message, status, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code, "ResourceNotFoundException");
                assert_eq!(message, "Requested resource not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_key_attributes() {
        let table = TableSpec::new("Students", "teacherUserId").with_sort_key("studentId");
        let key = DynamoKv::key_attributes(&table, &ItemKey::with_sort("t1", "s1")).unwrap();
        assert_eq!(
            Value::Object(key),
            json!({ "teacherUserId": { "S": "t1" }, "studentId": { "S": "s1" } })
        );
        assert!(DynamoKv::key_attributes(&table, &ItemKey::partition("t1")).is_err());
    }
}
