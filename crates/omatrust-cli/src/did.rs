//! # DID Subcommand
//!
//! Canonicalization, DID hash, and index-address derivation.

use anyhow::Result;
use clap::{Args, Subcommand};
use omatrust_core::index::{compute_did_hash, compute_index_address, index_address_for_account, validate};
use omatrust_core::{Did, DidError};
use serde::Serialize;

/// Arguments for `omatrust did`.
#[derive(Args, Debug)]
pub struct DidArgs {
    #[command(subcommand)]
    pub command: DidCommand,
}

/// DID subcommands.
#[derive(Subcommand, Debug)]
pub enum DidCommand {
    /// Print the canonical form of a DID.
    Canonicalize { did: String },
    /// Print the keccak-256 hash of the canonical DID.
    Hash { did: String },
    /// Print the index address derived from the DID.
    Index { did: String },
    /// Print the index address of the `did:pkh` for a CAIP-10 account.
    Account { account: String },
    /// Check that an address is the index address of a DID.
    Validate {
        did: String,
        /// Candidate `0x` address (any case).
        address: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DidReport {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    did_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DidReport {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            canonical: None,
            method: None,
            did_hash: None,
            index_address: None,
            valid: None,
            error: None,
        }
    }

    fn failed(input: &str, e: &DidError) -> Self {
        Self {
            error: Some(e.to_string()),
            ..Self::new(input)
        }
    }
}

/// Execute `omatrust did`.
pub fn run_did(args: &DidArgs) -> Result<u8> {
    let report = did_report(&args.command);
    crate::output::emit(&report)?;
    let ok = report.error.is_none() && report.valid != Some(false);
    Ok(crate::output::exit_code(ok))
}

fn did_report(command: &DidCommand) -> DidReport {
    match command {
        DidCommand::Canonicalize { did } => match Did::parse(did) {
            Ok(parsed) => DidReport {
                canonical: Some(parsed.to_string()),
                method: omatrust_core::did::extract_method(parsed.as_str()).map(str::to_string),
                ..DidReport::new(did)
            },
            Err(e) => DidReport::failed(did, &e),
        },
        DidCommand::Hash { did } | DidCommand::Index { did } => {
            let with_index = matches!(command, DidCommand::Index { .. });
            match Did::parse(did).and_then(|d| compute_did_hash(d.as_str()).map(|h| (d, h))) {
                Ok((parsed, hash)) => DidReport {
                    canonical: Some(parsed.to_string()),
                    did_hash: Some(hash.to_hex()),
                    index_address: with_index.then(|| compute_index_address(&hash).to_checksum()),
                    ..DidReport::new(did)
                },
                Err(e) => DidReport::failed(did, &e),
            }
        }
        DidCommand::Account { account } => match index_address_for_account(account) {
            Ok(index) => DidReport {
                index_address: Some(index.to_checksum()),
                ..DidReport::new(account)
            },
            Err(e) => DidReport {
                error: Some(e.to_string()),
                ..DidReport::new(account)
            },
        },
        DidCommand::Validate { did, address } => match Did::parse(did) {
            Ok(parsed) => DidReport {
                canonical: Some(parsed.to_string()),
                valid: Some(validate(did, address)),
                ..DidReport::new(did)
            },
            Err(e) => DidReport::failed(did, &e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_report_for_known_did() {
        let report = did_report(&DidCommand::Index {
            did: "did:web:Example.COM".into(),
        });
        assert_eq!(report.canonical.as_deref(), Some("did:web:example.com"));
        assert_eq!(
            report.index_address.as_deref(),
            Some("0xC35fc7553C18317f5eE1749Cd154fd05242b3DeA")
        );
        assert!(report.error.is_none());
    }

    #[test]
    fn hash_report_omits_index() {
        let report = did_report(&DidCommand::Hash {
            did: "did:web:example.com".into(),
        });
        assert!(report.did_hash.is_some());
        assert!(report.index_address.is_none());
    }

    #[test]
    fn canonicalize_reports_method() {
        let report = did_report(&DidCommand::Canonicalize {
            did: "DID:PKH:eip155:1:0xABC".into(),
        });
        assert_eq!(report.canonical.as_deref(), Some("did:pkh:eip155:1:0xabc"));
        assert_eq!(report.method.as_deref(), Some("pkh"));
    }

    #[test]
    fn account_report_uses_did_pkh_index() {
        let report = did_report(&DidCommand::Account {
            account: "eip155:1:0xd8da6bf26964af9d7eed9e03e53415d37aa96045".into(),
        });
        let expected = did_report(&DidCommand::Index {
            did: "did:pkh:eip155:1:0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".into(),
        });
        assert!(report.error.is_none());
        assert_eq!(report.index_address, expected.index_address);

        let bad = did_report(&DidCommand::Account { account: "solana:mainnet:111".into() });
        assert!(bad.error.unwrap().contains("account identifier error"));
    }

    #[test]
    fn validate_and_errors() {
        let ok = did_report(&DidCommand::Validate {
            did: "did:web:example.com".into(),
            address: "0xc35fc7553c18317f5ee1749cd154fd05242b3dea".into(),
        });
        assert_eq!(ok.valid, Some(true));

        let bad = did_report(&DidCommand::Canonicalize { did: "nope".into() });
        assert!(bad.error.is_some());
        assert_eq!(run_did(&DidArgs { command: DidCommand::Hash { did: "nope".into() } }).unwrap(), 1);
    }
}
