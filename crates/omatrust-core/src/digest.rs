//! # Content Digest — Metadata Hash Commitments
//!
//! Defines `HashAlgorithm`, `ContentDigest` and the `canonicalize_for_hash`
//! entry point used to commit to off-chain metadata.
//!
//! ## Security Invariant
//!
//! `ContentDigest` for a document can only be computed from `CanonicalBytes`,
//! so every metadata hash in the system is produced through the JCS
//! pipeline. Keccak-256 is the default because the on-chain registry stores
//! hashes the way Solidity computes them; SHA-256 is the alternate.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, TrustError};

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Keccak-256, as computed by the EVM `keccak256` opcode.
    #[default]
    Keccak256,
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Sha256 => "sha256",
        }
    }

    /// Hash raw bytes with this algorithm.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        match self {
            Self::Keccak256 => keccak256(data),
            Self::Sha256 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&Sha256::digest(data));
                out
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "keccak256" | "keccak" => Ok(Self::Keccak256),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unsupported hash algorithm '{other}'")),
        }
    }
}

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: HashAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Compute the digest of canonical bytes.
    pub fn of(data: &CanonicalBytes, algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            bytes: algorithm.hash(data.as_bytes()),
        }
    }

    /// Render the digest as a lowercase hex string without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Render the digest as `0x`-prefixed lowercase hex.
    pub fn to_prefixed_hex(&self) -> String {
        format!("0x{}", self.to_hex())
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_prefixed_hex())
    }
}

/// Canonical JSON text and its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalizationResult {
    /// JCS text that was hashed.
    pub canonical_json: String,
    /// `0x`-prefixed lowercase hex digest of `canonical_json`.
    pub hash: String,
    /// Algorithm that produced `hash`.
    pub algorithm: HashAlgorithm,
}

impl CanonicalizationResult {
    /// Build the result from canonical bytes.
    pub fn from_canonical(
        canonical: &CanonicalBytes,
        algorithm: HashAlgorithm,
    ) -> Result<Self, CanonicalizationError> {
        Ok(Self {
            canonical_json: canonical.as_str()?.to_string(),
            hash: ContentDigest::of(canonical, algorithm).to_prefixed_hex(),
            algorithm,
        })
    }
}

/// Canonicalize a JSON-compatible value and hash the canonical UTF-8 bytes.
pub fn canonicalize_for_hash(
    value: &impl Serialize,
    algorithm: HashAlgorithm,
) -> Result<CanonicalizationResult, CanonicalizationError> {
    let canonical = CanonicalBytes::new(value)?;
    CanonicalizationResult::from_canonical(&canonical, algorithm)
}

/// Compare two hex digests case-insensitively, with or without `0x`.
pub fn hash_hex_matches(a: &str, b: &str) -> bool {
    let strip = |s: &str| {
        let s = s.trim();
        s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s)
            .to_ascii_lowercase()
    };
    let (a, b) = (strip(a), strip(b));
    !a.is_empty() && a == b
}

/// Fail with [`TrustError::IntegrityMismatch`] unless the digests agree
/// under [`hash_hex_matches`].
pub fn ensure_hash_matches(computed: &str, expected: &str) -> Result<(), TrustError> {
    if hash_hex_matches(computed, expected) {
        Ok(())
    } else {
        Err(TrustError::IntegrityMismatch {
            expected: expected.to_string(),
            computed: computed.to_string(),
        })
    }
}
