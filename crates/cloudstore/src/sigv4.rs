//! AWS Signature Version 4 request signing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Derived key: HMAC chain over date, region, service and `aws4_request`.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

/// Signs requests for one service in one region.
#[derive(Clone, Debug)]
pub struct RequestSigner {
    pub creds: Credentials,
    pub region: String,
    pub service: &'static str,
}

impl RequestSigner {
    pub fn new(creds: Credentials, region: impl Into<String>, service: &'static str) -> Self {
        Self { creds, region: region.into(), service }
    }

    /// Sign a request and return every header to send except `Host`
    /// (the HTTP client derives that one from `url`).
    ///
    /// `headers` are signed and passed through; `x-amz-date`,
    /// `x-amz-content-sha256`, the session token and `authorization` are added.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &[(&str, &str)],
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let (creds, region, service) = (&self.creds, self.region.as_str(), self.service);
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));

        let mut signed: BTreeMap<String, String> = BTreeMap::new();
        signed.insert("host".into(), host_header(url));
        for (name, value) in headers {
            signed.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }
        signed.insert("x-amz-date".into(), amz_date.clone());
        signed.insert("x-amz-content-sha256".into(), payload_hash.clone());
        if let Some(token) = &creds.session_token {
            signed.insert("x-amz-security-token".into(), token.clone());
        }

        let canonical_headers: String = signed.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
        let signed_headers = signed.keys().map(String::as_str).collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "{method}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            canonical_uri(url),
            canonical_query(url),
        );

        let scope = format!("{date}/{region}/{service}/aws4_request");
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&creds.secret_access_key, &date, region, service);
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            creds.access_key_id
        );

        let mut out: Vec<(String, String)> = signed.into_iter().filter(|(k, _)| k != "host").collect();
        out.push(("authorization".into(), authorization));
        out
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

// Paths are built pre-encoded, so they are used as-is.
fn canonical_uri(url: &Url) -> &str {
    match url.path() {
        "" => "/",
        p => p,
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (urlencoding::encode(&k).into_owned(), urlencoding::encode(&v).into_owned()))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds(token: Option<&str>) -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", "20150830", "us-east-1", "iam");
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let url = Url::parse("https://dynamodb.us-east-1.amazonaws.com/").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let signer = RequestSigner::new(creds(None), "us-east-1", "dynamodb");
        let headers = signer.sign(
            "POST",
            &url,
            &[("Content-Type", "application/x-amz-json-1.0"), ("X-Amz-Target", "DynamoDB_20120810.GetItem")],
            b"{}",
            now,
        );

        let get = |name: &str| headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
        assert_eq!(get("x-amz-date").as_deref(), Some("20240501T120000Z"));
        assert!(get("host").is_none());
        assert_eq!(get("x-amz-target").as_deref(), Some("DynamoDB_20120810.GetItem"));

        let auth = get("authorization").unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/us-east-1/dynamodb/aws4_request, \
             SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date;x-amz-target, Signature="
        ));
        let sig = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn test_full_signature_matches_reference_signer() {
        let url = Url::parse(
            "https://samples.s3.us-east-1.amazonaws.com/capital-alphabets/a%20b_1.json?x=1&a=b%2Fc",
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let signer = RequestSigner::new(creds(None), "us-east-1", "s3");
        let headers = signer.sign("PUT", &url, &[("content-type", "application/json")], br#"{"a":1}"#, now);

        let auth = headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert_eq!(
            auth,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/us-east-1/s3/aws4_request, \
             SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date, \
             Signature=a178332600b08ecb9f16bb7eac4923700d09cf8fa4eefe6a6e966f288b08ffe8"
        );
    }

    #[test]
    fn test_signature_is_deterministic_and_payload_bound() {
        let url = Url::parse("http://localhost:9000/bucket/a%20b.wav").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let signer = RequestSigner::new(creds(Some("tok")), "us-east-1", "s3");
        let sign = |payload: &[u8]| signer.sign("PUT", &url, &[], payload, now);

        assert_eq!(sign(b"abc"), sign(b"abc"));
        assert_ne!(sign(b"abc"), sign(b"abd"));

        let headers = sign(b"abc");
        assert!(headers.iter().any(|(k, v)| k == "x-amz-security-token" && v == "tok"));
    }

    #[test]
    fn test_host_keeps_non_default_port() {
        assert_eq!(host_header(&Url::parse("http://localhost:9000/x").unwrap()), "localhost:9000");
        assert_eq!(host_header(&Url::parse("https://s3.amazonaws.com:443/x").unwrap()), "s3.amazonaws.com");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let dbg = format!("{:?}", creds(Some("tok")));
        assert!(!dbg.contains("EXAMPLEKEY"));
        assert!(!dbg.contains("tok\""));
    }
}
