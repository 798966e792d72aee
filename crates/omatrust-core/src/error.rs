//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout the identity core. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Malformed identifiers are always reported with the offending input.
//! - Every error maps onto one [`ErrorKind`] so that API layers can decide
//!   policy (reject, retry, report) without matching on every variant.
//! - Nothing here carries network or storage details.

use thiserror::Error;

/// Coarse classification of every failure the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong shape or charset in caller-supplied input.
    MalformedInput,
    /// DNS or HTTP source unreachable, slow, or refusing.
    NetworkFailure,
    /// A computed digest disagrees with the committed one.
    IntegrityMismatch,
    /// An upstream record could not be decoded.
    UpstreamDataShape,
}

/// Top-level error type for the identity core.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Account identifier failed validation.
    #[error("account identifier error: {0}")]
    AccountId(#[from] AccountIdError),

    /// DID failed validation.
    #[error("did error: {0}")]
    Did(#[from] DidError),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Computed digest disagrees with the expected digest.
    #[error("integrity mismatch: expected {expected}, computed {computed}")]
    IntegrityMismatch {
        /// Digest the caller committed to.
        expected: String,
        /// Digest computed from the fetched content.
        computed: String,
    },
}

impl TrustError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountId(_) | Self::Did(_) => ErrorKind::MalformedInput,
            Self::Canonicalization(_) => ErrorKind::MalformedInput,
            Self::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
        }
    }
}

/// Error while parsing or normalizing a CAIP-10 account identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountIdError {
    /// The identifier did not split into exactly three fields.
    #[error("expected 3 colon-separated fields (namespace:reference:address), found {found}")]
    FieldCount {
        /// Number of fields found.
        found: usize,
    },

    /// One of the three fields is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The namespace is not one of the supported chains.
    #[error("unsupported namespace '{0}' (expected eip155, solana or sui)")]
    UnsupportedNamespace(String),

    /// EVM chain id is not a non-negative integer.
    #[error("invalid eip155 chain id '{0}': must be a non-negative integer")]
    InvalidChainId(String),

    /// Solana network name is not recognised.
    #[error("unknown solana network '{0}' (expected mainnet, devnet or testnet)")]
    UnknownSolanaNetwork(String),

    /// Sui reference contains characters outside the CAIP-2 reference charset.
    #[error("invalid sui reference '{0}'")]
    InvalidSuiReference(String),

    /// EVM address is not `0x` followed by 40 hex characters.
    #[error("invalid EVM address '{0}': expected 0x followed by 40 hex characters")]
    InvalidEvmAddress(String),

    /// Solana address contains characters outside the base58 alphabet.
    #[error("invalid solana address '{0}': not valid base58")]
    InvalidBase58(String),

    /// Solana address decoded to the wrong number of bytes.
    #[error("invalid solana address: must decode to 32 bytes, got {actual}")]
    WrongDecodedLength {
        /// Number of bytes the address decoded to.
        actual: usize,
    },

    /// Sui address is not `0x` followed by 1 to 64 hex characters.
    #[error("invalid sui address '{0}': expected 0x followed by at most 64 hex characters")]
    InvalidSuiAddress(String),
}

impl AccountIdError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

/// Error while parsing or canonicalizing a DID.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DidError {
    /// Not of the form `did:<method>:<method-specific-id>`.
    #[error("invalid DID format: '{0}'")]
    InvalidFormat(String),

    /// A `did:pkh` that is not `did:pkh:<namespace>:<reference>:<address>`.
    #[error("invalid did:pkh format: '{0}' (expected did:pkh:<namespace>:<reference>:<address>)")]
    InvalidPkhFormat(String),
}

impl DidError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Canonical output was not valid UTF-8.
    #[error("canonical output is not valid UTF-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_error_kinds() {
        let e: TrustError = DidError::InvalidFormat("x".into()).into();
        assert_eq!(e.kind(), ErrorKind::MalformedInput);
        let e = TrustError::IntegrityMismatch {
            expected: "0x01".into(),
            computed: "0x02".into(),
        };
        assert_eq!(e.kind(), ErrorKind::IntegrityMismatch);
        assert!(e.to_string().contains("expected 0x01"));
    }

    #[test]
    fn wrong_length_message_mentions_32_bytes() {
        let e = AccountIdError::WrongDecodedLength { actual: 4 };
        assert!(e.to_string().contains("32 bytes"));
    }
}
