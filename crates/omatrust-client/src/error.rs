//! Client error types.
//!
//! Evidence checks never error; they report through
//! [`EvidenceResult`](omatrust_core::EvidenceResult). Everything else
//! returns one of the enums below, each classifiable with `kind()`.

use omatrust_core::{CanonicalizationError, DidError, ErrorKind};

/// Errors from fetching and hashing a metadata document.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    /// The URL did not parse or uses a scheme other than http(s).
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// HTTP transport error.
    #[error("HTTP error fetching {url}: {source}")]
    Http { url: String, source: reqwest::Error },
    /// Non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// Missing or non-JSON `Content-Type`.
    #[error("{url} served unacceptable content type '{content_type}'")]
    ContentType { url: String, content_type: String },
    /// Body exceeded the byte budget.
    #[error("response too large from {url}: exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
    /// Fetch did not complete in time.
    #[error("timed out fetching {url} after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },
    /// Body is not JSON.
    #[error("invalid JSON from {url}: {source}")]
    InvalidJson { url: String, source: serde_json::Error },
    /// Canonical encoding failed.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
    /// Registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Registry record carries no data URL or hash to check against.
    #[error("registry record for {did} has no {field}")]
    MissingCommitment { did: String, field: &'static str },
}

impl IntegrityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::MalformedInput,
            Self::Http { .. } | Self::Status { .. } | Self::TooLarge { .. } | Self::Timeout { .. } => {
                ErrorKind::NetworkFailure
            }
            Self::ContentType { .. }
            | Self::InvalidJson { .. }
            | Self::Canonicalization(_)
            | Self::MissingCommitment { .. } => ErrorKind::UpstreamDataShape,
            Self::Registry(e) => e.kind(),
        }
    }
}

/// Errors constructing a [`TrustClient`](crate::TrustClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
}

/// Errors from the on-chain registry read client.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no registry record for {did}")]
    NotFound { did: String },
    #[error("registry unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    InvalidDid(#[from] DidError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::UpstreamDataShape,
            Self::Unavailable(_) => ErrorKind::NetworkFailure,
            Self::InvalidDid(_) => ErrorKind::MalformedInput,
        }
    }
}

/// Errors from the attestation-service read client.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The service could not be reached or refused the request.
    #[error("attestation service unavailable: {0}")]
    Unavailable(String),
    /// No attestation with this uid.
    #[error("attestation {uid} not found")]
    NotFound { uid: String },
    /// The service answered with something that is not an attestation.
    #[error("malformed attestation response: {0}")]
    Malformed(String),
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::NetworkFailure,
            Self::NotFound { .. } | Self::Malformed(_) => ErrorKind::UpstreamDataShape,
        }
    }
}

/// Errors that abort an attestation query.
///
/// Per-record failures are skipped and logged; only a bad subject or a
/// failed event scan surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("invalid subject DID: {0}")]
    InvalidDid(#[from] DidError),
    #[error("event scan failed: {0}")]
    Read(#[from] ReadError),
}

impl AttestationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDid(_) => ErrorKind::MalformedInput,
            Self::Read(e) => e.kind(),
        }
    }
}

/// Errors decoding an attestation payload or record envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid schema field '{0}'")]
    InvalidSchema(String),
    #[error("unsupported ABI type '{0}'")]
    UnsupportedType(String),
    /// The payload does not decode against the schema's parameter types.
    #[error("ABI payload does not match schema: {0}")]
    Abi(String),
    #[error("field '{field}' holds an out-of-range value")]
    OutOfRange { field: String },
    #[error("payload has no string field '{0}'")]
    MissingField(&'static str),
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::UpstreamDataShape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_kinds() {
        let e = IntegrityError::TooLarge {
            url: "https://a.com/m.json".into(),
            limit: 10,
        };
        assert_eq!(e.kind(), ErrorKind::NetworkFailure);
        assert!(e.to_string().contains("response too large"));

        let e = IntegrityError::Status {
            url: "https://a.com/m.json".into(),
            status: 503,
        };
        assert!(e.to_string().contains("503"));

        let e = IntegrityError::Registry(RegistryError::InvalidDid(DidError::InvalidFormat("x".into())));
        assert_eq!(e.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn attestation_kinds() {
        let e = AttestationError::from(ReadError::Unavailable("rpc down".into()));
        assert_eq!(e.kind(), ErrorKind::NetworkFailure);
        let e = AttestationError::from(DidError::InvalidFormat("nope".into()));
        assert_eq!(e.kind(), ErrorKind::MalformedInput);
        assert_eq!(
            DecodeError::MissingField("subject").kind(),
            ErrorKind::UpstreamDataShape
        );
    }
}
