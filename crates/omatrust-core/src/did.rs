//! # Decentralized Identifiers — Canonical Form
//!
//! Canonicalizes `did:<method>:<method-specific-id>` strings so that every
//! spelling of the same identifier maps to one string, and therefore to
//! one index address.
//!
//! ## Canonicalization Rules
//!
//! - The `did` scheme and the method name are lowercased.
//! - `did:web`: only the host (and port) is lowercased. A port is carried
//!   as a percent-escaped colon (`example.com%3A8443`); the escape is
//!   decoded, the host lowercased, and the colon re-escaped as `%3A`. Path
//!   segments after the host are kept verbatim.
//! - `did:pkh`: exactly `did:pkh:<namespace>:<reference>:<address>`; only
//!   the address is lowercased.
//! - Other methods keep their method-specific id verbatim.
//!
//! ## Security Invariant
//!
//! Canonicalization is idempotent: `canonicalize(canonicalize(d)) ==
//! canonicalize(d)` for every accepted `d`.

use serde::{Deserialize, Serialize};

use crate::error::DidError;

/// Percent-escape used by did:web for the host/port separator.
const PORT_ESCAPE: &str = "%3A";

/// DID methods with method-specific canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidMethod {
    /// `did:web`: a domain, optionally with port and path.
    Web,
    /// `did:pkh`: a CAIP-10 blockchain account.
    Pkh,
    /// Any other method; the method-specific id is opaque.
    Other(String),
}

impl DidMethod {
    fn from_name(name: &str) -> Self {
        match name {
            "web" => Self::Web,
            "pkh" => Self::Pkh,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A DID in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and canonicalize.
    pub fn parse(input: &str) -> Result<Self, DidError> {
        canonicalize(input).map(Self)
    }

    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method.
    pub fn method(&self) -> DidMethod {
        DidMethod::from_name(extract_method(&self.0).unwrap_or_default())
    }

    /// Everything after `did:<method>:`.
    pub fn method_specific_id(&self) -> &str {
        extract_method_specific_id(&self.0).unwrap_or_default()
    }

    /// For `did:web`, the host with any port decoded (`example.com:8443`).
    pub fn web_domain(&self) -> Option<String> {
        if self.method() != DidMethod::Web {
            return None;
        }
        let host = self.method_specific_id().split(':').next()?;
        Some(host.replace(PORT_ESCAPE, ":"))
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = DidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

/// Split into `(method, method_specific_id)` if `did` has DID syntax.
fn split_did(did: &str) -> Option<(&str, &str)> {
    let mut parts = did.splitn(3, ':');
    let scheme = parts.next()?;
    let method = parts.next()?;
    let msid = parts.next()?;
    let well_formed = scheme.eq_ignore_ascii_case("did")
        && !method.is_empty()
        && method.bytes().all(|b| b.is_ascii_alphanumeric())
        && !msid.is_empty()
        && !did.chars().any(char::is_whitespace);
    well_formed.then_some((method, msid))
}

/// Canonicalize a DID string.
///
/// # Errors
///
/// `DidError::InvalidFormat` if the input is not `did:<method>:<id>`;
/// `DidError::InvalidPkhFormat` for a `did:pkh` without exactly five
/// non-empty colon-separated segments.
pub fn canonicalize(did: &str) -> Result<String, DidError> {
    let trimmed = did.trim();
    let (method, msid) =
        split_did(trimmed).ok_or_else(|| DidError::InvalidFormat(did.to_string()))?;
    let method = method.to_ascii_lowercase();

    let msid = match DidMethod::from_name(&method) {
        DidMethod::Web => canonicalize_web_id(msid).ok_or_else(|| DidError::InvalidFormat(did.to_string()))?,
        DidMethod::Pkh => canonicalize_pkh_id(msid).ok_or_else(|| DidError::InvalidPkhFormat(did.to_string()))?,
        DidMethod::Other(_) => msid.to_string(),
    };

    Ok(format!("did:{method}:{msid}"))
}

fn canonicalize_web_id(msid: &str) -> Option<String> {
    let (host, path) = match msid.split_once(':') {
        Some((host, path)) => (host, Some(path)),
        None => (msid, None),
    };
    let decoded = host.replace(PORT_ESCAPE, ":").replace("%3a", ":").to_ascii_lowercase();
    if decoded.is_empty() || decoded.starts_with(':') {
        return None;
    }
    let mut out = decoded.replace(':', PORT_ESCAPE);
    if let Some(path) = path {
        if path.split(':').any(str::is_empty) {
            return None;
        }
        out.push(':');
        out.push_str(path);
    }
    Some(out)
}

fn canonicalize_pkh_id(msid: &str) -> Option<String> {
    let segments: Vec<&str> = msid.split(':').collect();
    match segments.as_slice() {
        [namespace, reference, address]
            if !namespace.is_empty() && !reference.is_empty() && !address.is_empty() =>
        {
            Some(format!("{namespace}:{reference}:{}", address.to_ascii_lowercase()))
        }
        _ => None,
    }
}

/// True if `did` canonicalizes without error.
pub fn is_valid_did(did: &str) -> bool {
    canonicalize(did).is_ok()
}

/// The method name as written, or `None` for malformed input.
pub fn extract_method(did: &str) -> Option<&str> {
    split_did(did.trim()).map(|(method, _)| method)
}

/// The method-specific id as written, or `None` for malformed input.
pub fn extract_method_specific_id(did: &str) -> Option<&str> {
    split_did(did.trim()).map(|(_, msid)| msid)
}

/// Reduce a user-entered domain or URL to a bare lowercase host[:port].
///
/// `https://Example.COM/path?q` becomes `example.com`. Returns `None` when
/// nothing host-like remains.
pub fn normalize_domain(input: &str) -> Option<String> {
    let mut s = input.trim();
    for scheme in ["https://", "http://"] {
        if s.get(..scheme.len()).is_some_and(|p| p.eq_ignore_ascii_case(scheme)) {
            s = &s[scheme.len()..];
        }
    }
    let end = s.find(['/', '?', '#']).unwrap_or(s.len());
    let host = s[..end].trim_end_matches('.').to_ascii_lowercase();
    let valid = !host.is_empty()
        && !host.starts_with(':')
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b':' | b'_'));
    valid.then_some(host)
}

/// Build the canonical `did:web` for a domain.
pub fn build_did_web(domain: &str) -> Result<String, DidError> {
    let host = normalize_domain(domain).ok_or_else(|| DidError::InvalidFormat(domain.to_string()))?;
    canonicalize(&format!("did:web:{}", host.replace(':', PORT_ESCAPE)))
}

/// Build the canonical `did:pkh` for an account.
pub fn build_did_pkh(namespace: &str, reference: &str, address: &str) -> Result<String, DidError> {
    canonicalize(&format!("did:pkh:{namespace}:{reference}:{address}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_host_is_lowercased() {
        assert_eq!(canonicalize("did:web:Example.COM").unwrap(), "did:web:example.com");
    }

    #[test]
    fn web_port_is_decoded_lowercased_and_reescaped() {
        assert_eq!(
            canonicalize("did:web:Example.com%3a8443").unwrap(),
            "did:web:example.com%3A8443"
        );
        let did = Did::parse("did:web:Example.com%3A8443:Users:Alice").unwrap();
        assert_eq!(did.as_str(), "did:web:example.com%3A8443:Users:Alice");
        assert_eq!(did.web_domain().as_deref(), Some("example.com:8443"));
    }

    #[test]
    fn web_path_case_is_preserved() {
        assert_eq!(
            canonicalize("did:web:APP.example.com:Apps:MyGame").unwrap(),
            "did:web:app.example.com:Apps:MyGame"
        );
    }

    #[test]
    fn web_empty_segments_rejected() {
        assert!(canonicalize("did:web::path").is_err());
        assert!(canonicalize("did:web:example.com::x").is_err());
    }

    #[test]
    fn pkh_address_is_lowercased_only() {
        assert_eq!(
            canonicalize("did:pkh:eip155:1:0xAbC0000000000000000000000000000000000DeF").unwrap(),
            "did:pkh:eip155:1:0xabc0000000000000000000000000000000000def"
        );
        assert_eq!(
            canonicalize("did:pkh:EIP155:1:0xAB").unwrap(),
            "did:pkh:EIP155:1:0xab"
        );
    }

    #[test]
    fn pkh_wrong_segment_count() {
        for bad in ["did:pkh:eip155:1", "did:pkh:eip155:1:0xab:extra", "did:pkh:eip155::0xab"] {
            assert!(
                matches!(canonicalize(bad), Err(DidError::InvalidPkhFormat(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn scheme_and_method_are_lowercased() {
        assert_eq!(canonicalize("DID:WEB:example.com").unwrap(), "did:web:example.com");
        assert_eq!(canonicalize("did:Key:z6MkABC").unwrap(), "did:key:z6MkABC");
    }

    #[test]
    fn invalid_format() {
        for bad in ["", "did", "did:", "did:web", "did:web:", "did::x", "web:example.com", "did:we b:x", "did:web:exa mple.com"] {
            assert!(
                matches!(canonicalize(bad), Err(DidError::InvalidFormat(_))),
                "{bad:?}"
            );
            assert!(!is_valid_did(bad));
        }
    }

    #[test]
    fn predicates_are_total() {
        assert_eq!(extract_method("did:web:example.com"), Some("web"));
        assert_eq!(extract_method_specific_id("did:pkh:eip155:1:0xab"), Some("eip155:1:0xab"));
        assert_eq!(extract_method("not a did"), None);
        assert_eq!(extract_method_specific_id("did:web"), None);
    }

    #[test]
    fn did_type_accessors() {
        let did: Did = "did:pkh:eip155:1:0xAB".parse().unwrap();
        assert_eq!(did.method(), DidMethod::Pkh);
        assert_eq!(did.method_specific_id(), "eip155:1:0xab");
        assert_eq!(did.web_domain(), None);
        let other = Did::parse("did:ethr:0x1").unwrap();
        assert_eq!(other.method(), DidMethod::Other("ethr".into()));
    }

    #[test]
    fn did_serde_canonicalizes_on_deserialize() {
        let did: Did = serde_json::from_str("\"did:web:EXAMPLE.com\"").unwrap();
        assert_eq!(did.as_str(), "did:web:example.com");
        assert!(serde_json::from_str::<Did>("\"nope\"").is_err());
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain("https://Example.COM/path?q=1").as_deref(), Some("example.com"));
        assert_eq!(normalize_domain("example.com.").as_deref(), Some("example.com"));
        assert_eq!(normalize_domain("localhost:8080").as_deref(), Some("localhost:8080"));
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("exa mple.com"), None);
    }

    #[test]
    fn builders() {
        assert_eq!(build_did_web("HTTPS://Example.com/").unwrap(), "did:web:example.com");
        assert_eq!(build_did_web("localhost:8080").unwrap(), "did:web:localhost%3A8080");
        assert_eq!(
            build_did_pkh("eip155", "1", "0xABC").unwrap(),
            "did:pkh:eip155:1:0xabc"
        );
        assert!(build_did_web("").is_err());
    }
}
