//! # Evidence Subcommand
//!
//! Looks for a controller DID in a domain's `_omatrust` TXT record, its
//! `/.well-known/did.json`, or either.

use anyhow::Result;
use clap::{Args, Subcommand};
use omatrust_client::TrustClient;
use omatrust_core::EvidenceResult;

/// Arguments for `omatrust evidence`.
#[derive(Args, Debug)]
pub struct EvidenceArgs {
    #[command(subcommand)]
    pub command: EvidenceCommand,
}

/// Where to look for the controller.
#[derive(Subcommand, Debug)]
pub enum EvidenceCommand {
    /// Check the `_omatrust.<domain>` TXT record.
    Dns(EvidenceTarget),
    /// Check `https://<domain>/.well-known/did.json`.
    #[command(name = "did-json")]
    DidJson(EvidenceTarget),
    /// Check DNS first, then did.json.
    Any(EvidenceTarget),
}

/// Domain and expected controller shared by every evidence subcommand.
#[derive(Args, Debug, Clone)]
pub struct EvidenceTarget {
    /// Domain (a URL or `host:port` is accepted).
    pub domain: String,
    /// Expected controller: a DID or a bare `0x` address.
    pub controller: String,
}

/// Execute `omatrust evidence`. Exits 1 when no evidence was found.
pub async fn run_evidence(args: &EvidenceArgs, client: &TrustClient) -> Result<u8> {
    let result = lookup(&args.command, client).await;
    crate::output::emit(&result)?;
    Ok(crate::output::exit_code(result.found))
}

async fn lookup(command: &EvidenceCommand, client: &TrustClient) -> EvidenceResult {
    let verifier = client.evidence();
    match command {
        EvidenceCommand::Dns(t) => verifier.find_controller_in_dns_txt(&t.domain, &t.controller).await,
        EvidenceCommand::DidJson(t) => {
            verifier
                .find_controller_in_did_document(&t.domain, &t.controller)
                .await
        }
        EvidenceCommand::Any(t) => verifier.verify_controller(&t.domain, &t.controller).await,
    }
}
