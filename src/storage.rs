//! Persistence of generated markup in S3-compatible object storage.
//!
//! [`MarkupStore`] is the seam the orchestrator depends on; production uses
//! [`S3MarkupStore`], tests substitute an in-memory double. The S3 client
//! speaks only the path-style `PUT Object` call, signed with AWS Signature
//! Version 4 when credentials are configured and sent anonymously otherwise.

use crate::config::StorageConfig;
use crate::pipeline::markup::SVG_CONTENT_TYPE;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Destination for generated markup.
#[async_trait]
pub trait MarkupStore: Send + Sync {
    /// Store `markup` in `bucket` under a fresh key and return that key.
    async fn persist(&self, markup: &str, bucket: &str) -> Result<String, StoreError>;
}

struct Credentials {
    access_key: String,
    secret_key: String,
}

/// [`MarkupStore`] backed by an S3-compatible endpoint (Wasabi by default).
pub struct S3MarkupStore {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    credentials: Option<Credentials>,
}

impl S3MarkupStore {
    pub fn new(client: reqwest::Client, config: &StorageConfig) -> Self {
        let credentials = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => Some(Credentials {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
            }),
            _ => None,
        };
        Self {
            client,
            endpoint: config.endpoint_url(),
            region: config.region().to_string(),
            credentials,
        }
    }

    /// Public URL of an object, without any query string.
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: &str) -> Result<(), StoreError> {
        let raw_url = format!("{}/{}/{}", self.endpoint, uri_encode(bucket), uri_encode(key));
        let url = Url::parse(&raw_url).map_err(|e| StoreError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;

        let payload_hash = hex::encode(Sha256::digest(body.as_bytes()));
        let now = Utc::now();
        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();

        let mut request = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, SVG_CONTENT_TYPE)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date)
            .body(body.to_string());

        if let Some(creds) = &self.credentials {
            let host = host_header(&url)?;
            let headers = [
                ("content-type", SVG_CONTENT_TYPE),
                ("host", host.as_str()),
                ("x-amz-content-sha256", payload_hash.as_str()),
                ("x-amz-date", amz_date.as_str()),
            ];
            let authorization = authorization(
                &CanonicalRequest {
                    method: "PUT",
                    uri: url.path(),
                    headers: &headers,
                    payload_hash: &payload_hash,
                },
                now,
                &self.region,
                creds,
            )?;
            request = request.header(AUTHORIZATION, authorization);
        } else {
            debug!("No storage credentials configured, sending unsigned PUT");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarkupStore for S3MarkupStore {
    async fn persist(&self, markup: &str, bucket: &str) -> Result<String, StoreError> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        self.put_object(bucket, &key, markup).await?;
        info!("Stored {} bytes of markup as {}/{}", markup.len(), bucket, key);
        Ok(key)
    }
}

impl fmt::Debug for S3MarkupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3MarkupStore")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("signed", &self.credentials.is_some())
            .finish()
    }
}

// ── Signature V4 ─────────────────────────────────────────────────────────

const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// The parts of a request covered by the signature. Query strings are
/// never used, so the canonical query is always empty.
struct CanonicalRequest<'a> {
    method: &'a str,
    /// Already URI-encoded path.
    uri: &'a str,
    /// Lower-case header names with their values; every one is signed.
    headers: &'a [(&'a str, &'a str)],
    payload_hash: &'a str,
}

impl CanonicalRequest<'_> {
    fn signed_headers(&self) -> String {
        let mut names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.join(";")
    }

    fn render(&self) -> String {
        let mut headers = self.headers.to_vec();
        headers.sort_unstable_by_key(|(name, _)| *name);
        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        format!(
            "{}\n{}\n\n{}\n{}\n{}",
            self.method,
            self.uri,
            canonical_headers,
            self.signed_headers(),
            self.payload_hash
        )
    }
}

/// `Authorization` header value for `request` signed at `now`.
fn authorization(
    request: &CanonicalRequest<'_>,
    now: DateTime<Utc>,
    region: &str,
    creds: &Credentials,
) -> Result<String, StoreError> {
    let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
    let date = now.format("%Y%m%d").to_string();

    let scope = format!("{date}/{region}/s3/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(request.render().as_bytes()))
    );

    let mut key = hmac(format!("AWS4{}", creds.secret_key).as_bytes(), date.as_bytes())?;
    for part in [region, "s3", "aws4_request"] {
        key = hmac(&key, part.as_bytes())?;
    }
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
        creds.access_key,
        request.signed_headers()
    ))
}

/// S3 URI encoding of one path segment: everything but unreserved characters
/// is percent-encoded.
fn uri_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(b))
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn host_header(url: &Url) -> Result<String, StoreError> {
    let host = url.host_str().ok_or_else(|| StoreError::InvalidUrl {
        url: url.to_string(),
        reason: "missing host".into(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| StoreError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
