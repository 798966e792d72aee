//! # Index Address Derivation
//!
//! Derives the 20-byte address under which the attestation service indexes
//! records about a DID:
//!
//! ```text
//! did_hash      = keccak256(utf8(canonicalize(did)))
//! index_address = keccak256("DID:Solidity:Address:v1:" || did_hash)[12..32]
//! ```
//!
//! The on-chain indexer recomputes the same value in Solidity with
//! `abi.encodePacked`, so the layout here must agree with it bit for bit.

use serde::{Deserialize, Serialize};

use crate::account::AccountIdentifier;
use crate::checksum::{parse_evm_address, to_checksum_address};
use crate::did::canonicalize;
use crate::digest::keccak256;
use crate::error::{DidError, TrustError};

/// Domain-separation prefix hashed in front of the DID hash.
pub const INDEX_ADDRESS_PREFIX: &[u8] = b"DID:Solidity:Address:v1:";

/// Keccak-256 of a canonical DID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DidHash(pub [u8; 32]);

impl DidHash {
    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for DidHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The 20-byte attestation lookup key for a DID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IndexAddress(pub [u8; 20]);

impl IndexAddress {
    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 checksummed rendering.
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }

    /// Lowercase `0x` rendering.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for IndexAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl std::str::FromStr for IndexAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_evm_address(s.trim())
            .map(Self)
            .ok_or_else(|| format!("invalid index address '{s}'"))
    }
}

impl From<IndexAddress> for String {
    fn from(a: IndexAddress) -> Self {
        a.to_checksum()
    }
}

impl TryFrom<String> for IndexAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Canonicalize `did` and hash it.
pub fn compute_did_hash(did: &str) -> Result<DidHash, DidError> {
    let canonical = canonicalize(did)?;
    Ok(DidHash(keccak256(canonical.as_bytes())))
}

/// Derive the index address from a DID hash.
pub fn compute_index_address(did_hash: &DidHash) -> IndexAddress {
    let mut preimage = Vec::with_capacity(INDEX_ADDRESS_PREFIX.len() + 32);
    preimage.extend_from_slice(INDEX_ADDRESS_PREFIX);
    preimage.extend_from_slice(&did_hash.0);
    let hash = keccak256(&preimage);

    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    IndexAddress(out)
}

/// Canonicalize, hash, and derive in one step.
pub fn index_address_for(did: &str) -> Result<IndexAddress, DidError> {
    compute_did_hash(did).map(|h| compute_index_address(&h))
}

/// Index address of the `did:pkh` for a CAIP-10 account identifier.
///
/// The account is normalized first, so `evm:1:0xABC…` and
/// `eip155:1:0xabc…` derive the same address.
pub fn index_address_for_account(account: &str) -> Result<IndexAddress, TrustError> {
    let account = AccountIdentifier::parse(account)?;
    Ok(index_address_for(&format!("did:pkh:{account}"))?)
}

/// True if `candidate` is the index address of `did`.
///
/// Comparison ignores case. Malformed DIDs or candidates yield `false`.
pub fn validate(did: &str, candidate: &str) -> bool {
    match (index_address_for(did), candidate.trim().parse::<IndexAddress>()) {
        (Ok(expected), Ok(actual)) => expected == actual,
        _ => false,
    }
}
