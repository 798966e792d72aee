//! TXT record lookup.
//!
//! [`TxtResolver`] is the seam between the evidence verifier and DNS. The
//! production implementation wraps `trust-dns-resolver`; tests substitute
//! an in-memory table.

use std::time::Duration;

use async_trait::async_trait;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

/// Errors from a TXT lookup.
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// The name exists but has no TXT records, or does not exist.
    #[error("no TXT records at {name}")]
    NoRecords { name: String },
    /// Resolver failure (timeout, SERVFAIL, no upstream).
    #[error("TXT lookup for {name} failed: {reason}")]
    Resolve { name: String, reason: String },
}

/// Resolves TXT records for a fully-qualified name.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// Return each TXT record as one string, with multi-chunk records
    /// concatenated in order.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError>;
}

/// System-configured DNS resolver.
#[derive(Clone)]
pub struct DnsTxtResolver {
    resolver: TokioAsyncResolver,
}

impl std::fmt::Debug for DnsTxtResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsTxtResolver").finish_non_exhaustive()
    }
}

impl DnsTxtResolver {
    /// Build from the host's resolver configuration, falling back to the
    /// library defaults when none can be read. `timeout` bounds each query.
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = match trust_dns_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                tracing::warn!(error = %e, "system resolver config unavailable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl TxtResolver for DnsTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        let lookup = self.resolver.txt_lookup(name).await.map_err(|e| match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => DnsError::NoRecords {
                name: name.to_string(),
            },
            _ => DnsError::Resolve {
                name: name.to_string(),
                reason: e.to_string(),
            },
        })?;

        Ok(lookup
            .iter()
            .map(|txt| {
                let joined: Vec<u8> = txt
                    .txt_data()
                    .iter()
                    .flat_map(|chunk| chunk.iter().copied())
                    .collect();
                String::from_utf8_lossy(&joined).into_owned()
            })
            .collect())
    }
}
