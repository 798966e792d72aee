//! # Controller Evidence — Parsing and Address-Level Matching
//!
//! A domain owner publishes which identifier controls the domain as a
//! DNS TXT record (`_omatrust.<domain>`) or in a did.json document. This
//! module holds the I/O-free half of evidence verification: parsing the
//! TXT record text and comparing controllers.
//!
//! ## Record Format
//!
//! ```text
//! v=1; controller=did:pkh:eip155:1:0xAbC...; controller=did:web:example.com
//! ```
//!
//! Tokens are separated by `;` and/or whitespace, in any order. `v=1` is
//! mandatory. Only `controller=` values that are themselves valid DIDs are
//! kept; bare addresses and CAIP-10 strings are dropped, as are unknown
//! tokens.
//!
//! ## Address-Level Matching
//!
//! Controllers are compared by the underlying address, ignoring case and
//! chain id: the same key controls the same address on every EVM chain.

use serde::{Deserialize, Serialize};

use crate::checksum::parse_evm_address;
use crate::did::{canonicalize, extract_method, is_valid_did};

/// The only evidence record version understood.
pub const EVIDENCE_VERSION: &str = "1";

/// A parsed evidence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Record version; always `"1"`.
    pub version: String,
    /// Controller DIDs in record order.
    pub controllers: Vec<String>,
}

/// Parse one TXT record value.
///
/// Returns `None` when the `v=1` token is absent.
pub fn parse_evidence_record(text: &str) -> Option<EvidenceRecord> {
    let mut has_version = false;
    let mut controllers = Vec::new();

    for token in text
        .split(|c: char| c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        // Keys are case-sensitive: `V=1` is not a version token.
        match key {
            "v" if value == EVIDENCE_VERSION => has_version = true,
            "controller" if value.starts_with("did:") && is_valid_did(value) => {
                controllers.push(value.to_string());
            }
            _ => {}
        }
    }

    has_version.then(|| EvidenceRecord {
        version: EVIDENCE_VERSION.to_string(),
        controllers,
    })
}

/// Extract the lowercase address a controller string refers to.
///
/// - `did:pkh:<ns>:<ref>:<address>` yields the address segment.
/// - A bare `0x` + 40 hex string yields itself.
/// - Anything else yields `None`.
pub fn extract_address(controller: &str) -> Option<String> {
    let controller = controller.trim();
    if extract_method(controller).is_some_and(|m| m.eq_ignore_ascii_case("pkh")) {
        let canonical = canonicalize(controller).ok()?;
        return canonical.rsplit(':').next().map(str::to_string);
    }
    parse_evm_address(controller).map(|_| controller.to_ascii_lowercase())
}

/// True if both controllers resolve to the same address.
pub fn controllers_match(a: &str, b: &str) -> bool {
    match (extract_address(a), extract_address(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Where a piece of evidence was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// `_omatrust.<domain>` TXT record.
    DnsTxt,
    /// `https://<domain>/.well-known/did.json`.
    DidDocument,
}

/// Outcome of an evidence check. Never an error: unreachable or malformed
/// sources are reported through `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceResult {
    /// Whether the expected controller was found.
    pub found: bool,
    /// The published controller that matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_controller: Option<String>,
    /// Diagnostic text for the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Which source produced the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<EvidenceSource>,
}

impl EvidenceResult {
    /// A positive result.
    pub fn found(source: EvidenceSource, controller: impl Into<String>) -> Self {
        Self {
            found: true,
            matched_controller: Some(controller.into()),
            details: None,
            source: Some(source),
        }
    }

    /// A negative result with a diagnostic.
    pub fn not_found(source: EvidenceSource, details: impl Into<String>) -> Self {
        Self {
            found: false,
            matched_controller: None,
            details: Some(details.into()),
            source: Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xabc0000000000000000000000000000000000def";

    #[test]
    fn parses_semicolon_and_whitespace_separated_tokens() {
        let rec = parse_evidence_record(&format!(
            "v=1;controller=did:pkh:eip155:1:{ADDR}  controller=did:web:example.com; future=thing"
        ))
        .unwrap();
        assert_eq!(rec.version, "1");
        assert_eq!(
            rec.controllers,
            vec![format!("did:pkh:eip155:1:{ADDR}"), "did:web:example.com".to_string()]
        );
    }

    #[test]
    fn token_order_is_irrelevant() {
        let rec = parse_evidence_record("controller=did:web:a.com;v=1").unwrap();
        assert_eq!(rec.controllers, vec!["did:web:a.com"]);
    }

    #[test]
    fn missing_version_is_not_a_record() {
        assert!(parse_evidence_record("controller=did:web:a.com").is_none());
        assert!(parse_evidence_record("v=2;controller=did:web:a.com").is_none());
        assert!(parse_evidence_record("").is_none());
    }

    #[test]
    fn keys_are_case_sensitive() {
        assert!(parse_evidence_record("V=1;controller=did:web:a.com").is_none());
        let rec = parse_evidence_record("v=1;Controller=did:web:a.com;controller=did:web:b.com").unwrap();
        assert_eq!(rec.controllers, vec!["did:web:b.com"]);
    }

    #[test]
    fn bare_and_malformed_controllers_are_dropped() {
        let rec = parse_evidence_record(&format!(
            "v=1 controller={ADDR} controller=eip155:1:{ADDR} controller=did:pkh:eip155:1 controller=did:web:ok.com"
        ))
        .unwrap();
        assert_eq!(rec.controllers, vec!["did:web:ok.com"]);
    }

    #[test]
    fn version_only_record_has_no_controllers() {
        let rec = parse_evidence_record("v=1").unwrap();
        assert!(rec.controllers.is_empty());
    }

    #[test]
    fn address_extraction() {
        assert_eq!(
            extract_address(&format!("did:pkh:eip155:137:{}", ADDR.to_uppercase().replace("0X", "0x"))).as_deref(),
            Some(ADDR)
        );
        assert_eq!(extract_address(&ADDR.to_uppercase().replace("0X", "0x")).as_deref(), Some(ADDR));
        assert_eq!(extract_address("did:web:example.com"), None);
        assert_eq!(extract_address("0x1234"), None);
    }

    #[test]
    fn matching_ignores_chain_id_and_case() {
        let published = "did:pkh:eip155:1:0xABC0000000000000000000000000000000000DEF";
        let expected = format!("did:pkh:eip155:137:{ADDR}");
        assert!(controllers_match(published, &expected));
        assert!(controllers_match(published, ADDR));
        assert!(!controllers_match(published, "did:web:example.com"));
        assert!(!controllers_match("did:web:example.com", "did:web:example.com"));
    }

    #[test]
    fn result_constructors() {
        let r = EvidenceResult::found(EvidenceSource::DnsTxt, "did:web:a.com");
        assert!(r.found);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["matchedController"], "did:web:a.com");
        assert_eq!(json["source"], "dns_txt");
        let r = EvidenceResult::not_found(EvidenceSource::DidDocument, "404");
        assert!(!r.found);
        assert_eq!(r.details.as_deref(), Some("404"));
    }
}
