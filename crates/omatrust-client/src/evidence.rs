//! # Controller Evidence Verifier
//!
//! Checks whether an expected controller is published for a domain, either
//! as a `_omatrust.<domain>` TXT record or in
//! `https://<domain>/.well-known/did.json`.
//!
//! Both sources are untrusted and may be missing, slow, or hostile. Every
//! path is bounded by a timeout and ends in an [`EvidenceResult`]; nothing
//! here returns an error or panics on bad upstream data.

use std::sync::Arc;
use std::time::Duration;

use omatrust_core::{controllers_match, normalize_domain, parse_evidence_record, EvidenceResult, EvidenceSource};
use serde::Deserialize;

use crate::config::TrustClientConfig;
use crate::dns::TxtResolver;
use crate::integrity::{read_limited, BodyError};
use crate::retry::RetryPolicy;

/// The subset of a DID document inspected for controller evidence.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidDocument {
    #[serde(default)]
    verification_method: Vec<VerificationMethod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationMethod {
    #[serde(default)]
    blockchain_account_id: Option<String>,
    #[serde(default)]
    public_key_hex: Option<String>,
}

/// Verifies controller evidence over DNS and HTTPS.
#[derive(Clone)]
pub struct EvidenceVerifier {
    resolver: Arc<dyn TxtResolver>,
    http: reqwest::Client,
    dns_prefix: String,
    dns_timeout: Duration,
    http_timeout: Duration,
    did_document_scheme: String,
    max_document_bytes: usize,
    retry: RetryPolicy,
}

impl std::fmt::Debug for EvidenceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceVerifier")
            .field("dns_prefix", &self.dns_prefix)
            .field("dns_timeout", &self.dns_timeout)
            .field("http_timeout", &self.http_timeout)
            .field("did_document_scheme", &self.did_document_scheme)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl EvidenceVerifier {
    pub fn new(resolver: Arc<dyn TxtResolver>, http: reqwest::Client, config: &TrustClientConfig) -> Self {
        Self {
            resolver,
            http,
            dns_prefix: config.dns_prefix.clone(),
            dns_timeout: config.dns_timeout(),
            http_timeout: config.http_timeout(),
            did_document_scheme: config.did_document_scheme.clone(),
            max_document_bytes: config.max_metadata_bytes,
            retry: config.retry_policy(),
        }
    }

    /// The TXT record name for `domain` (`_omatrust.example.com`), or
    /// `None` if the domain is malformed. Any port is dropped.
    pub fn dns_record_name(&self, domain: &str) -> Option<String> {
        let host = normalize_domain(domain)?;
        let host = host.split(':').next().unwrap_or_default();
        Some(format!("{}.{host}", self.dns_prefix))
    }

    /// The did.json URL for `domain`, or `None` if the domain is malformed.
    pub fn did_document_url(&self, domain: &str) -> Option<String> {
        let host = normalize_domain(domain)?;
        Some(format!("{}://{host}/.well-known/did.json", self.did_document_scheme))
    }

    /// Look for `expected` among the controllers of `_omatrust.<domain>`.
    pub async fn find_controller_in_dns_txt(&self, domain: &str, expected: &str) -> EvidenceResult {
        let source = EvidenceSource::DnsTxt;
        let Some(name) = self.dns_record_name(domain) else {
            return EvidenceResult::not_found(source, format!("invalid domain '{domain}'"));
        };

        let records = match tokio::time::timeout(self.dns_timeout, self.resolver.lookup_txt(&name)).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                tracing::warn!(name = %name, error = %e, "TXT evidence lookup failed");
                return EvidenceResult::not_found(source, e.to_string());
            }
            Err(_) => {
                tracing::warn!(name = %name, timeout = ?self.dns_timeout, "TXT evidence lookup timed out");
                return EvidenceResult::not_found(
                    source,
                    format!("TXT lookup for {name} timed out after {:?}", self.dns_timeout),
                );
            }
        };
        if records.is_empty() {
            return EvidenceResult::not_found(source, format!("no TXT records at {name}"));
        }

        let mut valid_records = 0usize;
        for text in &records {
            let Some(record) = parse_evidence_record(text) else {
                tracing::debug!(name = %name, "ignoring TXT record without v=1");
                continue;
            };
            valid_records += 1;
            if let Some(controller) = record.controllers.iter().find(|c| controllers_match(c, expected)) {
                tracing::info!(name = %name, controller = %controller, "controller found in DNS evidence");
                return EvidenceResult::found(source, controller.clone());
            }
        }

        let details = if valid_records == 0 {
            format!("no v=1 evidence record among {} TXT record(s) at {name}", records.len())
        } else {
            format!("no controller in {valid_records} evidence record(s) at {name} matches {expected}")
        };
        EvidenceResult::not_found(source, details)
    }

    /// Look for `expected` in the verification methods of the domain's
    /// did.json.
    pub async fn find_controller_in_did_document(&self, domain: &str, expected: &str) -> EvidenceResult {
        let source = EvidenceSource::DidDocument;
        let Some(url) = self.did_document_url(domain) else {
            return EvidenceResult::not_found(source, format!("invalid domain '{domain}'"));
        };

        let document = match tokio::time::timeout(self.http_timeout, self.fetch_did_document(&url)).await {
            Ok(Ok(doc)) => doc,
            Ok(Err(details)) => {
                tracing::warn!(url = %url, details = %details, "did.json evidence unavailable");
                return EvidenceResult::not_found(source, details);
            }
            Err(_) => {
                tracing::warn!(url = %url, timeout = ?self.http_timeout, "did.json fetch timed out");
                return EvidenceResult::not_found(
                    source,
                    format!("fetching {url} timed out after {:?}", self.http_timeout),
                );
            }
        };

        for vm in &document.verification_method {
            if let Some(account) = vm.blockchain_account_id.as_deref() {
                // Only 3-part CAIP-10 account ids carry an address.
                if account.split(':').count() == 3
                    && controllers_match(&format!("did:pkh:{account}"), expected)
                {
                    tracing::info!(url = %url, controller = %account, "controller found in did.json");
                    return EvidenceResult::found(source, account);
                }
            }
            if let Some(key) = vm.public_key_hex.as_deref() {
                let key = if key.starts_with("0x") || key.starts_with("0X") {
                    key.to_string()
                } else {
                    format!("0x{key}")
                };
                if controllers_match(&key, expected) {
                    tracing::info!(url = %url, controller = %key, "controller found in did.json");
                    return EvidenceResult::found(source, key);
                }
            }
        }

        EvidenceResult::not_found(
            source,
            format!(
                "none of {} verification method(s) at {url} matches {expected}",
                document.verification_method.len()
            ),
        )
    }

    /// Try DNS first, then did.json.
    pub async fn verify_controller(&self, domain: &str, expected: &str) -> EvidenceResult {
        let dns = self.find_controller_in_dns_txt(domain, expected).await;
        if dns.found {
            return dns;
        }
        let doc = self.find_controller_in_did_document(domain, expected).await;
        if doc.found {
            return doc;
        }
        EvidenceResult {
            found: false,
            matched_controller: None,
            details: Some(format!(
                "dns: {}; did.json: {}",
                dns.details.unwrap_or_default(),
                doc.details.unwrap_or_default()
            )),
            source: None,
        }
    }

    async fn fetch_did_document(&self, url: &str) -> Result<DidDocument, String> {
        let resp = self.retry.send(|| {
            self.http
                .get(url)
                .header(reqwest::header::ACCEPT, "application/did+json, application/json")
                .send()
        })
        .await
        .map_err(|e| format!("fetching {url} failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("{url} returned HTTP {}", status.as_u16()));
        }

        let body = read_limited(resp, self.max_document_bytes).await.map_err(|e| match e {
            BodyError::TooLarge => format!("{url} response too large (over {} bytes)", self.max_document_bytes),
            BodyError::Transport(e) => format!("reading {url} failed: {e}"),
        })?;

        serde_json::from_slice(&body).map_err(|e| format!("{url} is not a valid DID document: {e}"))
    }
}
