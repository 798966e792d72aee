//! # CAIP-10 Account Identifiers
//!
//! Parses, validates and normalizes multi-chain account identifiers of the
//! form `namespace:reference:address`.
//!
//! ## Security Invariant
//!
//! An `AccountIdentifier` can only be obtained through [`AccountIdentifier::parse`]
//! (or [`build_normalized`]), so its `address` is always stored in the
//! namespace's canonical encoding:
//!
//! | Namespace | Reference | Canonical address |
//! |-----------|-----------|-------------------|
//! | `eip155`  | decimal chain id | EIP-55 checksum casing |
//! | `solana`  | `mainnet` / `devnet` / `testnet` | base58, 32 bytes, case unchanged |
//! | `sui`     | CAIP-2 reference | lowercase hex, left-padded to 32 bytes |
//!
//! Two spellings of the same account therefore always render identically,
//! which is what makes identifier comparison and hashing deterministic.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::checksum::{parse_evm_address, to_checksum_address};
use crate::error::AccountIdError;

/// Solana cluster names accepted as a CAIP-10 reference.
pub const SOLANA_NETWORKS: &[&str] = &["mainnet", "devnet", "testnet"];

/// Supported chain namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// EVM-compatible chains.
    Eip155,
    /// Solana clusters.
    Solana,
    /// Sui networks.
    Sui,
}

impl Namespace {
    /// The CAIP-2 namespace string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eip155 => "eip155",
            Self::Solana => "solana",
            Self::Sui => "sui",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eip155" | "evm" => Ok(Self::Eip155),
            "solana" => Ok(Self::Solana),
            "sui" => Ok(Self::Sui),
            _ => Err(AccountIdError::UnsupportedNamespace(s.to_string())),
        }
    }
}

/// A validated CAIP-10 account identifier in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountIdentifier {
    namespace: Namespace,
    reference: String,
    address: String,
}

impl AccountIdentifier {
    /// Parse and normalize `namespace:reference:address`.
    pub fn parse(input: &str) -> Result<Self, AccountIdError> {
        let fields: Vec<&str> = input.trim().split(':').collect();
        if fields.len() != 3 {
            return Err(AccountIdError::FieldCount {
                found: fields.len(),
            });
        }
        Self::from_parts(fields[0], fields[1], fields[2])
    }

    /// Validate and normalize the three fields individually.
    pub fn from_parts(namespace: &str, reference: &str, address: &str) -> Result<Self, AccountIdError> {
        let (namespace, reference, address) = (namespace.trim(), reference.trim(), address.trim());
        if namespace.is_empty() {
            return Err(AccountIdError::EmptyField("namespace"));
        }
        if reference.is_empty() {
            return Err(AccountIdError::EmptyField("reference"));
        }
        if address.is_empty() {
            return Err(AccountIdError::EmptyField("address"));
        }

        let namespace: Namespace = namespace.parse()?;
        let (reference, address) = match namespace {
            Namespace::Eip155 => (normalize_chain_id(reference)?, normalize_evm_address(address)?),
            Namespace::Solana => (
                normalize_solana_network(reference)?,
                normalize_solana_address(address)?,
            ),
            Namespace::Sui => (normalize_sui_reference(reference)?, normalize_sui_address(address)?),
        };

        Ok(Self {
            namespace,
            reference,
            address,
        })
    }

    /// The chain namespace.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The normalized chain reference (chain id or network name).
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The address in canonical encoding.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Decode the canonical address into raw bytes.
    pub fn address_bytes(&self) -> Vec<u8> {
        match self.namespace {
            // Both hex encodings were validated at construction.
            Namespace::Eip155 | Namespace::Sui => {
                hex::decode(&self.address[2..]).unwrap_or_default()
            }
            Namespace::Solana => bs58::decode(&self.address).into_vec().unwrap_or_default(),
        }
    }

    /// Render as a `did:pkh` DID.
    pub fn to_did_pkh(&self) -> String {
        format!("did:pkh:{self}")
    }
}

impl std::fmt::Display for AccountIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.reference, self.address)
    }
}

impl FromStr for AccountIdentifier {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize_chain_id(reference: &str) -> Result<String, AccountIdError> {
    if !reference.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AccountIdError::InvalidChainId(reference.to_string()));
    }
    reference
        .parse::<u64>()
        .map(|id| id.to_string())
        .map_err(|_| AccountIdError::InvalidChainId(reference.to_string()))
}

fn normalize_evm_address(address: &str) -> Result<String, AccountIdError> {
    parse_evm_address(address)
        .map(|bytes| to_checksum_address(&bytes))
        .ok_or_else(|| AccountIdError::InvalidEvmAddress(address.to_string()))
}

fn normalize_solana_network(reference: &str) -> Result<String, AccountIdError> {
    let lower = reference.to_ascii_lowercase();
    if SOLANA_NETWORKS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(AccountIdError::UnknownSolanaNetwork(reference.to_string()))
    }
}

fn normalize_solana_address(address: &str) -> Result<String, AccountIdError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| AccountIdError::InvalidBase58(address.to_string()))?;
    if bytes.len() != 32 {
        return Err(AccountIdError::WrongDecodedLength { actual: bytes.len() });
    }
    Ok(address.to_string())
}

fn normalize_sui_reference(reference: &str) -> Result<String, AccountIdError> {
    let valid = reference.len() <= 32
        && reference
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(reference.to_ascii_lowercase())
    } else {
        Err(AccountIdError::InvalidSuiReference(reference.to_string()))
    }
}

fn normalize_sui_address(address: &str) -> Result<String, AccountIdError> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| AccountIdError::InvalidSuiAddress(address.to_string()))?;
    if digits.is_empty() || digits.len() > 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AccountIdError::InvalidSuiAddress(address.to_string()));
    }
    Ok(format!("0x{:0>64}", digits.to_ascii_lowercase()))
}

/// Structured result of [`normalize`], suitable for returning to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOutcome {
    /// Whether the input is a valid identifier.
    pub valid: bool,
    /// The canonical rendering, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    /// Human-readable reason, when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The parsed identifier, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<AccountIdentifier>,
}

/// Validate and normalize a CAIP-10 identifier without ever failing.
pub fn normalize(input: &str) -> NormalizeOutcome {
    match AccountIdentifier::parse(input) {
        Ok(id) => NormalizeOutcome {
            valid: true,
            normalized: Some(id.to_string()),
            error: None,
            parsed: Some(id),
        },
        Err(e) => NormalizeOutcome {
            valid: false,
            normalized: None,
            error: Some(e.to_string()),
            parsed: None,
        },
    }
}

/// Join the three fields into a CAIP-10 string without validating them.
pub fn build(namespace: &str, reference: &str, address: &str) -> String {
    format!("{}:{}:{}", namespace.trim(), reference.trim(), address.trim())
}

/// Join the three fields and re-validate the result.
pub fn build_normalized(
    namespace: &str,
    reference: &str,
    address: &str,
) -> Result<AccountIdentifier, AccountIdError> {
    AccountIdentifier::parse(&build(namespace, reference, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VITALIK_LOWER: &str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
    const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[test]
    fn evm_lowercase_is_rewritten_to_checksum() {
        let out = normalize(&format!("eip155:1:{VITALIK_LOWER}"));
        assert!(out.valid);
        assert_eq!(out.normalized.as_deref(), Some(format!("eip155:1:{VITALIK}").as_str()));
        let parsed = out.parsed.unwrap();
        assert_eq!(parsed.namespace(), Namespace::Eip155);
        assert_eq!(parsed.reference(), "1");
        assert_eq!(parsed.address_bytes().len(), 20);
    }

    #[test]
    fn evm_alias_namespace_renders_as_eip155() {
        let id = AccountIdentifier::parse(&format!("EVM:137:{VITALIK}")).unwrap();
        assert_eq!(id.to_string(), format!("eip155:137:{VITALIK}"));
    }

    #[test]
    fn evm_chain_id_must_be_non_negative_integer() {
        for bad in ["-1", "abc", "1.5", "+1", "99999999999999999999999"] {
            let err = AccountIdentifier::parse(&format!("eip155:{bad}:{VITALIK}")).unwrap_err();
            assert!(matches!(err, AccountIdError::InvalidChainId(_)), "{bad}");
        }
    }

    #[test]
    fn evm_chain_id_leading_zeros_are_dropped() {
        let id = AccountIdentifier::parse(&format!("eip155:0010:{VITALIK}")).unwrap();
        assert_eq!(id.reference(), "10");
    }

    #[test]
    fn evm_bad_addresses() {
        for bad in ["0x1234", "d8da6bf26964af9d7eed9e03e53415d37aa96045", "0xg8da6bf26964af9d7eed9e03e53415d37aa96045"] {
            let err = AccountIdentifier::parse(&format!("eip155:1:{bad}")).unwrap_err();
            assert!(matches!(err, AccountIdError::InvalidEvmAddress(_)), "{bad}");
        }
    }

    #[test]
    fn field_count_errors() {
        assert_eq!(
            AccountIdentifier::parse("eip155:1").unwrap_err(),
            AccountIdError::FieldCount { found: 2 }
        );
        assert_eq!(
            AccountIdentifier::parse("eip155:1:0xabc:extra").unwrap_err(),
            AccountIdError::FieldCount { found: 4 }
        );
        let out = normalize("nonsense");
        assert!(!out.valid);
        assert!(out.error.unwrap().contains("3 colon-separated fields"));
    }

    #[test]
    fn empty_fields_rejected() {
        assert_eq!(
            AccountIdentifier::parse(":1:0xabc").unwrap_err(),
            AccountIdError::EmptyField("namespace")
        );
        assert_eq!(
            AccountIdentifier::parse("eip155::0xabc").unwrap_err(),
            AccountIdError::EmptyField("reference")
        );
    }

    #[test]
    fn unsupported_namespace() {
        let err = AccountIdentifier::parse("cosmos:cosmoshub-4:cosmos1abc").unwrap_err();
        assert!(matches!(err, AccountIdError::UnsupportedNamespace(_)));
    }

    #[test]
    fn solana_valid_address() {
        let out = normalize("solana:mainnet:4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T");
        assert!(out.valid, "{:?}", out.error);
        assert_eq!(
            out.normalized.as_deref(),
            Some("solana:mainnet:4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T")
        );
    }

    #[test]
    fn solana_network_is_case_insensitive() {
        let id = AccountIdentifier::parse("solana:DevNet:11111111111111111111111111111111").unwrap();
        assert_eq!(id.reference(), "devnet");
        assert_eq!(id.address_bytes(), vec![0u8; 32]);
    }

    #[test]
    fn solana_short_address_mentions_32_bytes() {
        let out = normalize("solana:mainnet:1111");
        assert!(!out.valid);
        assert!(out.error.unwrap().contains("32 bytes"));
    }

    #[test]
    fn solana_rejects_ambiguous_characters() {
        for bad in ["0Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T", "lNd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T"] {
            let err = AccountIdentifier::parse(&format!("solana:mainnet:{bad}")).unwrap_err();
            assert!(matches!(err, AccountIdError::InvalidBase58(_)), "{bad}");
        }
    }

    #[test]
    fn solana_unknown_network() {
        let err = AccountIdentifier::parse("solana:localnet:11111111111111111111111111111111").unwrap_err();
        assert!(matches!(err, AccountIdError::UnknownSolanaNetwork(_)));
    }

    #[test]
    fn sui_address_is_padded_and_lowercased() {
        let id = AccountIdentifier::parse("sui:mainnet:0x2").unwrap();
        assert_eq!(id.address(), format!("0x{}2", "0".repeat(63)));
        let id = AccountIdentifier::parse("sui:Testnet:0xABCDEF").unwrap();
        assert_eq!(id.reference(), "testnet");
        assert!(id.address().ends_with("abcdef"));
        assert_eq!(id.address().len(), 66);
    }

    #[test]
    fn sui_over_length_rejected() {
        let long = format!("0x{}", "a".repeat(65));
        let err = AccountIdentifier::parse(&format!("sui:mainnet:{long}")).unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidSuiAddress(_)));
        let err = AccountIdentifier::parse("sui:mainnet:abcdef").unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidSuiAddress(_)));
    }

    #[test]
    fn builder_round_trips_through_normalization() {
        assert_eq!(build("eip155", "1", VITALIK_LOWER), format!("eip155:1:{VITALIK_LOWER}"));
        let id = build_normalized("eip155", "1", VITALIK_LOWER).unwrap();
        assert_eq!(id.address(), VITALIK);
        assert_eq!(id.to_did_pkh(), format!("did:pkh:eip155:1:{VITALIK}"));
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let json = serde_json::to_value(normalize("bad")).unwrap();
        assert_eq!(json["valid"], false);
        assert!(json.get("normalized").is_none());
        assert!(json.get("parsed").is_none());
    }
}
