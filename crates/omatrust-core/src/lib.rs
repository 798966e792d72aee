//! # omatrust-core — Identity Primitives for OMATrust
//!
//! This crate holds the pure, I/O-free half of OMATrust identity and
//! trust verification. Every other crate in the workspace depends on
//! `omatrust-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One canonical form per identifier.** CAIP-10 account identifiers,
//!    DIDs, and domains each have a single normalizer. Two spellings of the
//!    same identity always normalize to the same string, and the index
//!    address is derived from that string alone.
//!
//! 2. **`CanonicalBytes` newtype.** Metadata digests are computed over
//!    RFC 8785 (JCS) bytes only. `ContentDigest::of` accepts
//!    `&CanonicalBytes`, never raw JSON.
//!
//! 3. **Bit-exact derivations.** Keccak-256 DID hashes and index addresses
//!    must match what the on-chain indexer computes. Known vectors pin them.
//!
//! ## Crate Policy
//!
//! - No network, file, or clock access.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod account;
pub mod canonical;
pub mod checksum;
pub mod did;
pub mod digest;
pub mod error;
pub mod evidence;
pub mod index;

// Re-export primary types for ergonomic imports.
pub use account::{normalize, AccountIdentifier, Namespace, NormalizeOutcome};
pub use canonical::CanonicalBytes;
pub use checksum::{checksum_address, to_checksum_address};
pub use did::{canonicalize, is_valid_did, normalize_domain, Did, DidMethod};
pub use digest::{
    canonicalize_for_hash, ensure_hash_matches, hash_hex_matches, keccak256, CanonicalizationResult,
    ContentDigest, HashAlgorithm,
};
pub use error::{AccountIdError, CanonicalizationError, DidError, ErrorKind, TrustError};
pub use evidence::{
    controllers_match, extract_address, parse_evidence_record, EvidenceRecord, EvidenceResult,
    EvidenceSource,
};
pub use index::{
    compute_did_hash, compute_index_address, index_address_for, index_address_for_account, DidHash,
    IndexAddress,
};
