//! # omatrust CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Network settings come from `OMATRUST_*` environment variables.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use omatrust_cli::account::{run_build, run_normalize, BuildArgs, NormalizeArgs};
use omatrust_cli::did::{run_did, DidArgs};
use omatrust_cli::evidence::{run_evidence, EvidenceArgs};
use omatrust_cli::hash::{run_hash, run_verify, HashArgs, VerifyArgs};
use omatrust_client::{TrustClient, TrustClientConfig};

/// Exit code for configuration, network, and I/O failures.
const EXIT_ERROR: u8 = 2;

/// OMATrust identity and trust verification.
///
/// Normalizes account identifiers, derives DID index addresses, checks
/// controller evidence over DNS and did.json, and verifies metadata hashes.
#[derive(Parser, Debug)]
#[command(name = "omatrust", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and normalize a CAIP-10 account identifier.
    Normalize(NormalizeArgs),

    /// Build a CAIP-10 account identifier from its parts.
    Build(BuildArgs),

    /// DID canonicalization, hashing, and index addresses.
    Did(DidArgs),

    /// Controller evidence over DNS TXT and did.json.
    Evidence(EvidenceArgs),

    /// Canonical JSON digest of a file or URL.
    Hash(HashArgs),

    /// Compare a URL's canonical digest with a committed hash.
    Verify(VerifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "omatrust CLI starting");

    let result = match cli.command {
        Commands::Normalize(args) => run_normalize(&args),
        Commands::Build(args) => run_build(&args),
        Commands::Did(args) => run_did(&args),
        Commands::Evidence(args) => match client() {
            Ok(client) => run_evidence(&args, &client).await,
            Err(e) => Err(e),
        },
        Commands::Hash(args) => match client() {
            Ok(client) => run_hash(&args, &client).await,
            Err(e) => Err(e),
        },
        Commands::Verify(args) => match client() {
            Ok(client) => run_verify(&args, &client).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn client() -> anyhow::Result<TrustClient> {
    let config = TrustClientConfig::from_env()?;
    tracing::debug!(?config, "loaded client configuration");
    Ok(TrustClient::new(config)?)
}
