//! # Hash and Verify Subcommands
//!
//! Canonicalizes JSON (RFC 8785) from a local file or a URL and prints the
//! digest. `verify` compares a URL's digest with a committed hash.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use omatrust_client::{FetchLimits, TrustClient};
use omatrust_core::{canonicalize_for_hash, CanonicalizationResult, HashAlgorithm};

/// Arguments for `omatrust hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    #[command(subcommand)]
    pub command: HashCommand,
}

/// Source of the JSON document.
#[derive(Subcommand, Debug)]
pub enum HashCommand {
    /// Hash a local JSON file.
    File {
        path: PathBuf,
        /// `keccak256` or `sha256`.
        #[arg(long, default_value = "keccak256")]
        algorithm: HashAlgorithm,
    },
    /// Fetch and hash a JSON document over HTTP(S).
    Url {
        url: String,
        #[arg(long, default_value = "keccak256")]
        algorithm: HashAlgorithm,
        /// Override the configured response size limit.
        #[arg(long)]
        max_bytes: Option<usize>,
        /// Override the configured fetch timeout.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

/// Arguments for `omatrust verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// URL of the metadata document.
    pub url: String,
    /// Committed hash, `0x` optional, any case.
    pub expected: String,
    #[arg(long, default_value = "keccak256")]
    pub algorithm: HashAlgorithm,
}

/// Execute `omatrust hash`.
pub async fn run_hash(args: &HashArgs, client: &TrustClient) -> Result<u8> {
    let result = match &args.command {
        HashCommand::File { path, algorithm } => hash_file(path, *algorithm)?,
        HashCommand::Url {
            url,
            algorithm,
            max_bytes,
            timeout_ms,
        } => {
            let defaults = client.integrity().limits();
            let limits = FetchLimits {
                max_bytes: max_bytes.unwrap_or(defaults.max_bytes),
                timeout: timeout_ms.map(Duration::from_millis).unwrap_or(defaults.timeout),
            };
            client
                .integrity()
                .compute_hash_from_url(url, *algorithm, limits)
                .await
                .with_context(|| format!("failed to hash {url}"))?
        }
    };
    crate::output::emit(&result)?;
    Ok(crate::output::EXIT_OK)
}

/// Execute `omatrust verify`. Exits 1 on a mismatch.
pub async fn run_verify(args: &VerifyArgs, client: &TrustClient) -> Result<u8> {
    let verification = client
        .integrity()
        .verify_hash(&args.url, &args.expected, args.algorithm)
        .await
        .with_context(|| format!("failed to verify {}", args.url))?;
    crate::output::emit(&verification)?;
    if let Err(e) = verification.ensure_ok() {
        tracing::warn!(url = %args.url, "{e}");
    }
    Ok(crate::output::exit_code(verification.ok))
}

fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<CanonicalizationResult> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))?;
    let result = canonicalize_for_hash(&value, algorithm)?;
    tracing::debug!(path = %path.display(), hash = %result.hash, "hashed local document");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_hash_is_order_independent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\n  \"b\": 2,\n  \"a\": 1\n}}").unwrap();

        let result = hash_file(file.path(), HashAlgorithm::Keccak256).unwrap();
        assert_eq!(result.canonical_json, r#"{"a":1,"b":2}"#);
        assert_eq!(
            result.hash,
            "0xb8ffb64722137f4b100665a52e3c943f8066e8ab8ba3b427e6f4b404defd82b0"
        );

        let sha = hash_file(file.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            sha.hash,
            "0x43258cff783fe7036d8a43033f830adfc60ec037382473548ac742b888292777"
        );
    }

    #[test]
    fn invalid_json_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = hash_file(file.path(), HashAlgorithm::Keccak256).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(hash_file(&dir.path().join("absent.json"), HashAlgorithm::Keccak256).is_err());
    }
}
