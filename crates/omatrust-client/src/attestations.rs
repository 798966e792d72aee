//! # Attestation Aggregator
//!
//! Retrieves the attestations issued about a DID, filters them by major
//! version, and derives deduplicated and aggregated views. Records are only
//! ever read.
//!
//! ## Query Pipeline
//!
//! 1. Derive the index address of the subject DID.
//! 2. Scan `Attested` events for that recipient over the last
//!    `block_window` blocks.
//! 3. Process candidates newest-first: fetch, decode against the known
//!    schema, and drop any record whose decoded `subject` is not the
//!    queried DID. The index address match alone is not trusted.
//! 4. Split into version-matched and unversioned records, cap at `limit`,
//!    and backfill with unversioned records when fewer than
//!    `backfill_threshold` matched.
//!
//! A failed event scan is an error. A record that fails to fetch or decode
//! is logged and skipped.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use omatrust_core::{canonicalize, compute_did_hash, compute_index_address, IndexAddress};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::abi::{decode_payload, parse_schema, SchemaField};
use crate::error::{AttestationError, DecodeError, ReadError};

/// Below this many version-matched records, unversioned ones are mixed in.
pub const DEFAULT_BACKFILL_THRESHOLD: usize = 5;

/// Default number of recent blocks scanned for events.
pub const DEFAULT_BLOCK_WINDOW: u64 = 50_000;

/// Schema id of user reviews, the only records deduplicated.
pub const USER_REVIEW_SCHEMA: &str = "user-review";

/// A schema registered with the attestation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Human-readable id (`user-review`).
    pub id: String,
    /// On-chain schema uid, `0x` hex.
    pub uid: String,
    /// Field list, `type name` pairs separated by commas.
    pub schema: String,
}

impl SchemaDefinition {
    pub fn new(id: impl Into<String>, uid: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uid: uid.into(),
            schema: schema.into(),
        }
    }
}

/// Tuning for attestation queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationQueryConfig {
    pub block_window: u64,
    pub backfill_threshold: usize,
    /// Concurrent record fetches; 1 is sequential.
    pub fan_out: usize,
    pub schemas: Vec<SchemaDefinition>,
}

impl Default for AttestationQueryConfig {
    fn default() -> Self {
        Self {
            block_window: DEFAULT_BLOCK_WINDOW,
            backfill_threshold: DEFAULT_BACKFILL_THRESHOLD,
            fan_out: 1,
            schemas: Vec::new(),
        }
    }
}

/// One `Attested` event from the attestation service's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestedEvent {
    pub uid: String,
    pub schema_uid: String,
    pub attester: String,
    pub recipient: String,
    pub block_number: u64,
    pub log_index: u64,
}

/// A full attestation as stored by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttestation {
    pub uid: String,
    pub schema_uid: String,
    pub attester: String,
    pub recipient: String,
    /// Issuance time, unix seconds.
    pub time: u64,
    /// Revocation time, unix seconds; 0 if not revoked.
    pub revocation_time: u64,
    /// Referenced attestation uid; all zeros if none.
    pub ref_uid: String,
    /// ABI-encoded payload.
    pub data: Vec<u8>,
}

/// A decoded attestation about a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    pub id: String,
    /// Schema id (`user-review`).
    pub schema: String,
    pub issuer: String,
    pub subject: String,
    pub data: Map<String, Value>,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    pub block_number: u64,
}

impl AttestationRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// The payload's `version` field, if it is a string.
    pub fn version(&self) -> Option<&str> {
        self.data.get("version").and_then(Value::as_str)
    }

    /// Leading numeric component of `version`.
    pub fn major_version(&self) -> Option<u64> {
        self.version().and_then(major_version)
    }

    /// The payload's `ratingValue`, as a number or a numeric string.
    pub fn rating_value(&self) -> Option<f64> {
        let v = match self.data.get("ratingValue")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }?;
        v.is_finite().then_some(v)
    }
}

/// Parse the major component of a version string: `"v2.1"` is 2,
/// `"10"` is 10, `"beta"` has none.
pub fn major_version(version: &str) -> Option<u64> {
    let v = version.trim();
    let v = v.strip_prefix(['v', 'V']).unwrap_or(v);
    let end = v.find(|c: char| !c.is_ascii_digit()).unwrap_or(v.len());
    v[..end].parse().ok()
}

/// Attestation-service read client.
#[async_trait]
pub trait AttestationReader: Send + Sync {
    /// Current head block.
    async fn latest_block(&self) -> Result<u64, ReadError>;

    /// `Attested` events whose recipient is `recipient`, in
    /// `from_block..=to_block`.
    async fn attested_events(
        &self,
        recipient: &IndexAddress,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<AttestedEvent>, ReadError>;

    /// Full record by uid.
    async fn get_attestation(&self, uid: &str) -> Result<RawAttestation, ReadError>;
}

struct CompiledSchema {
    definition: SchemaDefinition,
    fields: Vec<SchemaField>,
}

/// Queries and aggregates attestations about a subject.
pub struct AttestationAggregator {
    reader: Arc<dyn AttestationReader>,
    config: AttestationQueryConfig,
    schemas: Vec<CompiledSchema>,
}

impl std::fmt::Debug for AttestationAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AttestationAggregator {
    /// Fails if any configured schema string does not parse.
    pub fn new(reader: Arc<dyn AttestationReader>, config: AttestationQueryConfig) -> Result<Self, DecodeError> {
        let schemas = config
            .schemas
            .iter()
            .map(|definition| {
                Ok(CompiledSchema {
                    fields: parse_schema(&definition.schema)?,
                    definition: definition.clone(),
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;
        Ok(Self {
            reader,
            config,
            schemas,
        })
    }

    pub fn config(&self) -> &AttestationQueryConfig {
        &self.config
    }

    /// Newest-first attestations about `did`.
    ///
    /// With `major_version` set, records whose version has that major
    /// component come first; unversioned records backfill when fewer than
    /// `backfill_threshold` matched. Records with another major version are
    /// dropped.
    pub async fn get_attestations_for_subject(
        &self,
        did: &str,
        limit: usize,
        major_version: Option<u64>,
    ) -> Result<Vec<AttestationRecord>, AttestationError> {
        let canonical = canonicalize(did)?;
        let index = compute_index_address(&compute_did_hash(&canonical)?);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let latest = self.reader.latest_block().await?;
        let from = latest.saturating_sub(self.config.block_window);
        let mut events = self.reader.attested_events(&index, from, latest).await?;
        tracing::debug!(did, index = %index, from, to = latest, events = events.len(), "scanned attestation events");

        events.sort_by(|a, b| (b.block_number, b.log_index).cmp(&(a.block_number, a.log_index)));
        let mut seen = HashSet::new();
        events.retain(|e| seen.insert(e.uid.to_ascii_lowercase()));

        let did = did.trim();
        let records = stream::iter(events)
            .map(|event| self.load_record(event, did, &canonical))
            .buffered(self.config.fan_out.max(1));
        let mut records = std::pin::pin!(records);

        let mut matched = Vec::new();
        let mut unversioned = Vec::new();
        while let Some(record) = records.next().await {
            let Some(record) = record else { continue };
            match (major_version, record.major_version()) {
                (None, _) => matched.push(record),
                (Some(want), Some(have)) if want == have => matched.push(record),
                (Some(_), Some(_)) => {}
                (Some(_), None) => unversioned.push(record),
            }
            if matched.len() >= limit {
                break;
            }
        }

        if matched.len() < self.config.backfill_threshold {
            let room = limit.saturating_sub(matched.len());
            matched.extend(unversioned.into_iter().take(room));
        }
        tracing::info!(did, returned = matched.len(), "attestation query complete");
        Ok(matched)
    }

    /// Deduplicated reviews and their average rating.
    pub async fn get_rating_summary(
        &self,
        did: &str,
        limit: usize,
        major_version: Option<u64>,
    ) -> Result<RatingSummary, AttestationError> {
        let records = self.get_attestations_for_subject(did, limit, major_version).await?;
        let reviews: Vec<_> = deduplicate_reviews(&records)
            .into_iter()
            .filter(|r| r.schema == USER_REVIEW_SCHEMA)
            .collect();
        Ok(calculate_average_rating(&reviews))
    }

    async fn load_record(&self, event: AttestedEvent, did: &str, canonical: &str) -> Option<AttestationRecord> {
        let raw = match self.reader.get_attestation(&event.uid).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(uid = %event.uid, error = %e, "skipping attestation: fetch failed");
                return None;
            }
        };
        let Some(schema) = self
            .schemas
            .iter()
            .find(|s| s.definition.uid.eq_ignore_ascii_case(&raw.schema_uid))
        else {
            tracing::debug!(uid = %raw.uid, schema_uid = %raw.schema_uid, "skipping attestation: unknown schema");
            return None;
        };
        let record = match decode_record(&raw, schema, event.block_number) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(uid = %raw.uid, error = %e, "skipping attestation: decode failed");
                return None;
            }
        };
        if record.subject != did && record.subject != canonical {
            tracing::debug!(uid = %raw.uid, subject = %record.subject, "skipping attestation: subject mismatch");
            return None;
        }
        Some(record)
    }
}

fn decode_record(
    raw: &RawAttestation,
    schema: &CompiledSchema,
    block_number: u64,
) -> Result<AttestationRecord, DecodeError> {
    let data = decode_payload(&schema.fields, &raw.data)?;
    let subject = data
        .get("subject")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("subject"))?
        .to_string();
    let issued_at = timestamp(raw.time, "time")?;
    let revoked_at = match raw.revocation_time {
        0 => None,
        t => Some(timestamp(t, "revocationTime")?),
    };
    let ref_hex = raw.ref_uid.trim_start_matches("0x");
    let ref_id = (!ref_hex.is_empty() && ref_hex.bytes().any(|b| b != b'0')).then(|| raw.ref_uid.clone());

    Ok(AttestationRecord {
        id: raw.uid.clone(),
        schema: schema.definition.id.clone(),
        issuer: raw.attester.clone(),
        subject,
        data,
        issued_at,
        revoked_at,
        ref_id,
        block_number,
    })
}

fn timestamp(secs: u64, field: &str) -> Result<DateTime<Utc>, DecodeError> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .ok_or_else(|| DecodeError::OutOfRange {
            field: field.to_string(),
        })
}

/// Keep only the newest user review per `(attester, subject, version)`.
///
/// Input must be newest-first. Records of other schemas pass through.
pub fn deduplicate_reviews(records: &[AttestationRecord]) -> Vec<AttestationRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| {
            r.schema != USER_REVIEW_SCHEMA
                || seen.insert((
                    r.issuer.to_ascii_lowercase(),
                    r.subject.clone(),
                    r.version().unwrap_or_default().to_string(),
                ))
        })
        .cloned()
        .collect()
}

/// Average rating over a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
}

/// Average `ratingValue` over non-revoked records that carry one.
///
/// An empty set yields `average: 0.0, count: 0`.
pub fn calculate_average_rating(records: &[AttestationRecord]) -> RatingSummary {
    let ratings: Vec<f64> = records
        .iter()
        .filter(|r| !r.is_revoked())
        .filter_map(AttestationRecord::rating_value)
        .collect();
    if ratings.is_empty() {
        return RatingSummary { average: 0.0, count: 0 };
    }
    RatingSummary {
        average: ratings.iter().sum::<f64>() / ratings.len() as f64,
        count: ratings.len(),
    }
}
