//! # omatrust-client — Network-Bound Trust Verification
//!
//! Async verifiers built on the pure primitives of `omatrust-core`:
//!
//! - **Evidence** via `_omatrust.<domain>` TXT records and
//!   `/.well-known/did.json`
//! - **Integrity** of off-chain metadata against a committed hash
//! - **Attestations** about a subject, read from the attestation service
//!
//! ## Architecture
//!
//! External systems sit behind traits: [`TxtResolver`] for DNS,
//! [`RegistryReader`] for the on-chain registry, and [`AttestationReader`]
//! for the attestation service. HTTP goes through one shared
//! `reqwest::Client`. Nothing in this crate writes to any of them.
//!
//! Every DNS query and HTTP fetch is bounded by a timeout from
//! [`TrustClientConfig`]. Evidence checks degrade to a `found: false`
//! result; fetches and queries return typed errors.

pub mod abi;
pub mod attestations;
pub mod config;
pub mod dns;
pub mod error;
pub mod evidence;
pub mod integrity;
pub mod registry;
pub mod retry;

pub use attestations::{
    calculate_average_rating, deduplicate_reviews, AttestationAggregator, AttestationQueryConfig,
    AttestationReader, AttestationRecord, RatingSummary, SchemaDefinition,
};
pub use config::TrustClientConfig;
pub use dns::{DnsTxtResolver, TxtResolver};
pub use error::{AttestationError, ClientError, DecodeError, IntegrityError, ReadError, RegistryError};
pub use evidence::EvidenceVerifier;
pub use integrity::{FetchLimits, HashVerification, IntegrityChecker};
pub use registry::{RegistryReader, RegistryRecord};
pub use retry::RetryPolicy;

use std::sync::Arc;

/// Top-level client. Holds the verifiers that share one HTTP client.
#[derive(Debug, Clone)]
pub struct TrustClient {
    config: TrustClientConfig,
    evidence: EvidenceVerifier,
    integrity: IntegrityChecker,
}

impl TrustClient {
    /// Build a client that resolves TXT records through the system resolver.
    pub fn new(config: TrustClientConfig) -> Result<Self, ClientError> {
        let resolver = Arc::new(DnsTxtResolver::new(config.dns_timeout()));
        Self::with_resolver(config, resolver)
    }

    /// Build a client with a caller-supplied TXT resolver.
    pub fn with_resolver(config: TrustClientConfig, resolver: Arc<dyn TxtResolver>) -> Result<Self, ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(ClientError::HttpClient)?;

        Ok(Self {
            evidence: EvidenceVerifier::new(resolver, http.clone(), &config),
            integrity: IntegrityChecker::new(http, FetchLimits::from_config(&config)).with_retry(config.retry_policy()),
            config,
        })
    }

    pub fn config(&self) -> &TrustClientConfig {
        &self.config
    }

    /// Controller evidence over DNS and did.json.
    pub fn evidence(&self) -> &EvidenceVerifier {
        &self.evidence
    }

    /// Metadata fetch and hash verification.
    pub fn integrity(&self) -> &IntegrityChecker {
        &self.integrity
    }

    /// An attestation aggregator over `reader`.
    pub fn attestations(
        &self,
        reader: Arc<dyn AttestationReader>,
        config: AttestationQueryConfig,
    ) -> Result<AttestationAggregator, DecodeError> {
        AttestationAggregator::new(reader, config)
    }
}
