//! # Content Integrity — Fetch, Canonicalize, Compare
//!
//! Off-chain metadata is committed on-chain as a hash of its canonical JSON
//! form. This module fetches the document, re-canonicalizes it, and
//! compares the digest with the commitment.
//!
//! ## Fetch Discipline
//!
//! The metadata host is untrusted:
//!
//! - The `Content-Type` must be a JSON type before any body byte is read.
//! - A declared `Content-Length` over the budget fails immediately.
//! - The body is read chunk by chunk and abandoned as soon as the running
//!   total exceeds the budget.
//! - The whole fetch runs under one deadline.
//! - Any non-2xx status is a hard failure carrying the status code.

use std::time::Duration;

use omatrust_core::{
    canonicalize_for_hash, ensure_hash_matches, hash_hex_matches, CanonicalizationResult, Did, HashAlgorithm,
    TrustError,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::TrustClientConfig;
use crate::error::IntegrityError;
use crate::registry::RegistryReader;
use crate::retry::RetryPolicy;

/// Byte and time budget for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_bytes: usize,
    pub timeout: Duration,
}

impl FetchLimits {
    pub fn from_config(config: &TrustClientConfig) -> Self {
        Self {
            max_bytes: config.max_metadata_bytes,
            timeout: config.metadata_timeout(),
        }
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self::from_config(&TrustClientConfig::default())
    }
}

/// Result of comparing a recomputed digest with a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashVerification {
    /// Whether the digests agree (case-insensitive, `0x` optional).
    pub ok: bool,
    /// `0x`-prefixed digest of the fetched document.
    pub computed_hash: String,
    /// The commitment as supplied.
    pub expected_hash: String,
    /// Algorithm used for `computed_hash`.
    pub algorithm: HashAlgorithm,
}

impl HashVerification {
    /// Turn a mismatch into [`TrustError::IntegrityMismatch`].
    pub fn ensure_ok(&self) -> Result<(), TrustError> {
        ensure_hash_matches(&self.computed_hash, &self.expected_hash)
    }
}

/// Fetches metadata documents and checks them against commitments.
#[derive(Debug, Clone)]
pub struct IntegrityChecker {
    http: reqwest::Client,
    limits: FetchLimits,
    retry: RetryPolicy,
}

impl IntegrityChecker {
    pub fn new(http: reqwest::Client, limits: FetchLimits) -> Self {
        Self {
            http,
            limits,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the connection-retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The default limits used by [`verify_hash`](Self::verify_hash).
    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    /// Fetch `url` and parse it as JSON under `limits`.
    pub async fn fetch_json(&self, url: &str, limits: FetchLimits) -> Result<serde_json::Value, IntegrityError> {
        let parsed = parse_http_url(url)?;
        let timeout_ms = u64::try_from(limits.timeout.as_millis()).unwrap_or(u64::MAX);

        match tokio::time::timeout(limits.timeout, self.fetch_json_inner(parsed, url, limits.max_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(IntegrityError::Timeout {
                url: url.to_string(),
                timeout_ms,
            }),
        }
    }

    async fn fetch_json_inner(
        &self,
        parsed: Url,
        url: &str,
        max_bytes: usize,
    ) -> Result<serde_json::Value, IntegrityError> {
        let resp = self.retry.send(|| {
            self.http
                .get(parsed.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
        })
        .await
        .map_err(|source| IntegrityError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IntegrityError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(IntegrityError::ContentType {
                url: url.to_string(),
                content_type: if content_type.is_empty() {
                    "<missing>".to_string()
                } else {
                    content_type
                },
            });
        }

        let body = read_limited(resp, max_bytes).await.map_err(|e| match e {
            BodyError::TooLarge => IntegrityError::TooLarge {
                url: url.to_string(),
                limit: max_bytes,
            },
            BodyError::Transport(source) => IntegrityError::Http {
                url: url.to_string(),
                source,
            },
        })?;

        serde_json::from_slice(&body).map_err(|source| IntegrityError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch `url`, canonicalize the JSON, and hash it with `algorithm`.
    pub async fn compute_hash_from_url(
        &self,
        url: &str,
        algorithm: HashAlgorithm,
        limits: FetchLimits,
    ) -> Result<CanonicalizationResult, IntegrityError> {
        let value = self.fetch_json(url, limits).await?;
        let result = canonicalize_for_hash(&value, algorithm)?;
        tracing::debug!(url, hash = %result.hash, algorithm = %algorithm, "hashed metadata document");
        Ok(result)
    }

    /// Recompute the digest of `url` and compare it with `expected`.
    ///
    /// A mismatch is reported through `ok: false`, not as an error.
    pub async fn verify_hash(
        &self,
        url: &str,
        expected: &str,
        algorithm: HashAlgorithm,
    ) -> Result<HashVerification, IntegrityError> {
        let computed = self.compute_hash_from_url(url, algorithm, self.limits).await?;
        let ok = hash_hex_matches(&computed.hash, expected);
        if ok {
            tracing::info!(url, hash = %computed.hash, "metadata hash verified");
        } else {
            tracing::warn!(url, expected, computed = %computed.hash, "metadata hash mismatch");
        }
        Ok(HashVerification {
            ok,
            computed_hash: computed.hash,
            expected_hash: expected.to_string(),
            algorithm,
        })
    }

    /// Look up the registry record for `did` and verify the metadata it
    /// points to against the hash it commits to.
    pub async fn verify_registered_metadata(
        &self,
        reader: &dyn RegistryReader,
        did: &str,
    ) -> Result<HashVerification, IntegrityError> {
        let did = Did::parse(did).map_err(crate::error::RegistryError::from)?;
        let record = reader.get_record(&did).await?;

        let url = record
            .data_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| IntegrityError::MissingCommitment {
                did: did.to_string(),
                field: "dataUrl",
            })?;
        let expected = record
            .data_hash
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| IntegrityError::MissingCommitment {
                did: did.to_string(),
                field: "dataHash",
            })?;

        self.verify_hash(url, expected, record.data_hash_algorithm).await
    }
}

fn parse_http_url(url: &str) -> Result<Url, IntegrityError> {
    let parsed = Url::parse(url).map_err(|e| IntegrityError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(IntegrityError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// `application/json`, `text/json`, or any `application/*+json`.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || essence == "text/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

pub(crate) enum BodyError {
    TooLarge,
    Transport(reqwest::Error),
}

/// Read the body chunk by chunk, failing once it exceeds `max_bytes`.
pub(crate) async fn read_limited(mut resp: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, BodyError> {
    if resp.content_length().is_some_and(|len| len > max_bytes as u64) {
        return Err(BodyError::TooLarge);
    }
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(BodyError::Transport)? {
        if body.len() + chunk.len() > max_bytes {
            return Err(BodyError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
