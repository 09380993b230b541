//! S3 (or any S3-compatible endpoint such as MinIO) over the REST API.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::Url;
use tracing::debug;

use crate::object::{validate_key, ObjectStore};
use crate::sigv4::{Credentials, RequestSigner};
use crate::{Result, StoreError};

pub struct S3Objects {
    client: reqwest::Client,
    bucket: String,
    endpoint: Option<String>,
    force_path_style: bool,
    signer: RequestSigner,
}

impl S3Objects {
    pub fn new(
        bucket: impl Into<String>,
        region: &str,
        creds: Credentials,
        endpoint: Option<&str>,
        force_path_style: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            bucket: bucket.into(),
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
            force_path_style,
            signer: RequestSigner::new(creds, region, "s3"),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object_url(&self, key: &str) -> Result<Url> {
        let encoded = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let bucket = &self.bucket;
        let region = &self.signer.region;

        let raw = match (&self.endpoint, self.force_path_style) {
            (Some(ep), true) => format!("{ep}/{bucket}/{encoded}"),
            (Some(ep), false) => {
                let mut url = parse_url(ep)?;
                let host = format!("{bucket}.{}", url.host_str().unwrap_or_default());
                url.set_host(Some(&host))
                    .map_err(|e| StoreError::Config(format!("s3 host {host}: {e}")))?;
                url.set_path(&encoded);
                return Ok(url);
            }
            (None, true) => format!("https://s3.{region}.amazonaws.com/{bucket}/{encoded}"),
            (None, false) => format!("https://{bucket}.s3.{region}.amazonaws.com/{encoded}"),
        };
        parse_url(&raw)
    }
}

#[async_trait]
impl ObjectStore for S3Objects {
    async fn ensure_prefix(&self, prefix: &str) -> Result<()> {
        // prefixes exist implicitly once an object is written under them
        validate_key(prefix.trim_end_matches('/'))
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        validate_key(key)?;
        let url = self.object_url(key)?;
        let headers = self
            .signer
            .sign("PUT", &url, &[("content-type", content_type)], &body, Utc::now());

        let mut req = self.client.put(url).body(body.clone());
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), &text));
        }
        debug!(bucket = %self.bucket, key, bytes = body.len(), "s3: object written");
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| StoreError::Config(format!("s3 url {raw}: {e}")))
}

/// Text of the first `<tag>` element. Only valid for the flat S3 `<Error>`
/// document: nested elements or attributes on `tag` are not handled.
fn xml_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

fn service_error(status: u16, body: &str) -> StoreError {
    StoreError::Service {
        service: "s3",
        status,
        code: xml_tag(body, "Code").unwrap_or("Unknown").to_string(),
        message: xml_tag(body, "Message").unwrap_or(body).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        }
    }

    #[test]
    fn test_virtual_hosted_aws_url() {
        let s3 = S3Objects::new("akshara-audio", "ap-south-1", creds(), None, false);
        let url = s3.object_url("english/alphabets/A/john_1.wav").unwrap();
        assert_eq!(
            url.as_str(),
            "https://akshara-audio.s3.ap-south-1.amazonaws.com/english/alphabets/A/john_1.wav"
        );
    }

    #[test]
    fn test_path_style_custom_endpoint_encodes_segments() {
        let s3 = S3Objects::new("samples", "us-east-1", creds(), Some("http://localhost:9000/"), true);
        let url = s3.object_url("numbers/a b+c.json").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/samples/numbers/a%20b%2Bc.json");
    }

    #[test]
    fn test_virtual_hosted_custom_endpoint() {
        let s3 = S3Objects::new("samples", "us-east-1", creds(), Some("https://storage.example.com"), false);
        let url = s3.object_url("k.json").unwrap();
        assert_eq!(url.as_str(), "https://samples.storage.example.com/k.json");
    }

    #[test]
    fn test_error_body_parsing() {
        let body = "<?xml version=\"1.0\"?><Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>";
        match service_error(404, body) {
            StoreError::Service { code, message, .. } => {
                assert_eq!(code, "NoSuchBucket");
                assert_eq!(message, "The specified bucket does not exist");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ensure_prefix_is_local() {
        let s3 = S3Objects::new("b", "us-east-1", creds(), Some("http://127.0.0.1:1"), true);
        s3.ensure_prefix("capital-alphabets").await.unwrap();
        assert!(s3.ensure_prefix("../x").await.is_err());
    }
}
