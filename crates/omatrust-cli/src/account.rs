//! # Account Identifier Subcommands
//!
//! `normalize` validates a CAIP-10 string; `build` joins the three fields
//! and validates the result.

use anyhow::Result;
use clap::Args;
use omatrust_core::account::{build, normalize, NormalizeOutcome};

/// Arguments for `omatrust normalize`.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Identifier in `namespace:reference:address` form.
    #[arg(value_name = "ACCOUNT_ID")]
    pub input: String,
}

/// Arguments for `omatrust build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// `eip155` (or `evm`), `solana`, or `sui`.
    pub namespace: String,
    /// Chain id or network name.
    pub reference: String,
    /// Account address.
    pub address: String,
}

/// Execute `omatrust normalize`.
pub fn run_normalize(args: &NormalizeArgs) -> Result<u8> {
    let outcome = normalize(&args.input);
    crate::output::emit(&outcome)?;
    Ok(crate::output::exit_code(outcome.valid))
}

/// Execute `omatrust build`.
pub fn run_build(args: &BuildArgs) -> Result<u8> {
    let outcome = build_outcome(&args.namespace, &args.reference, &args.address);
    crate::output::emit(&outcome)?;
    Ok(crate::output::exit_code(outcome.valid))
}

fn build_outcome(namespace: &str, reference: &str, address: &str) -> NormalizeOutcome {
    normalize(&build(namespace, reference, address))
}
