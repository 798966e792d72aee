//! Read-only view of the on-chain application registry.
//!
//! The registry is only ever read here, to obtain the metadata URL and
//! the hash committed for a DID.

use async_trait::async_trait;
use omatrust_core::{Did, HashAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// The fields of a registry entry that integrity checks need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    /// The registered DID, canonical.
    pub did: String,
    /// Where the off-chain metadata lives.
    #[serde(default)]
    pub data_url: Option<String>,
    /// Committed digest of the canonical metadata JSON.
    #[serde(default)]
    pub data_hash: Option<String>,
    /// Algorithm that produced `data_hash`.
    #[serde(default)]
    pub data_hash_algorithm: HashAlgorithm,
}

/// Registry read client.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Fetch the record registered for `did`.
    async fn get_record(&self, did: &Did) -> Result<RegistryRecord, RegistryError>;
}
