//! # Canonical Serialization — JCS Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! that are hashed when committing to off-chain metadata.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which serializes through
//! `serde_jcs` (RFC 8785): object keys sorted at every depth, arrays kept in
//! order, compact separators, ECMAScript number formatting.
//!
//! Any function that hashes metadata accepts `&CanonicalBytes`, so two
//! parties holding semantically equal documents with different key order
//! always hash the same bytes.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Object keys are sorted at every nesting level.
/// - No insignificant whitespace.
/// - The bytes are valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (e.g. a map with non-string keys, or a
    /// non-finite float).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Parse raw JSON bytes and canonicalize them.
    ///
    /// Used for fetched documents whose original formatting is irrelevant.
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, CanonicalizationError> {
        let value: serde_json::Value = serde_json::from_slice(raw)?;
        Self::new(&value)
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical JSON text.
    pub fn as_str(&self) -> Result<&str, CanonicalizationError> {
        std::str::from_utf8(&self.0).map_err(|_| CanonicalizationError::InvalidUtf8)
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,20}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(|m| {
                    Value::Object(m.into_iter().collect())
                }),
            ]
        })
    }

    /// Compact rendering with keys sorted explicitly, independent of the
    /// backing map type of `serde_json::Map`.
    fn sorted_compact(v: &Value) -> String {
        match v {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}:{}", Value::String(k.clone()), sorted_compact(&map[k])))
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(sorted_compact).collect();
                format!("[{}]", parts.join(","))
            }
            other => other.to_string(),
        }
    }

    proptest! {
        #[test]
        fn canonical_output_has_no_whitespace_outside_strings(value in json_value()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let text = cb.as_str().unwrap();
            let mut in_string = false;
            let mut escaped = false;
            for c in text.chars() {
                if in_string {
                    if escaped { escaped = false; }
                    else if c == '\\' { escaped = true; }
                    else if c == '"' { in_string = false; }
                } else if c == '"' {
                    in_string = true;
                } else {
                    prop_assert!(!c.is_whitespace(), "whitespace in {}", text);
                }
            }
        }

        #[test]
        fn canonical_output_keys_sorted_at_every_depth(value in json_value()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(cb.as_str().unwrap(), sorted_compact(&value));
        }

        #[test]
        fn canonicalization_is_idempotent(value in json_value()) {
            let once = CanonicalBytes::new(&value).unwrap();
            let twice = CanonicalBytes::from_json_slice(once.as_bytes()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn key_insertion_order_is_irrelevant(
            entries in prop::collection::btree_map("[a-z]{1,6}", any::<i32>(), 1..8)
        ) {
            let forward: Vec<(String, i32)> = entries.clone().into_iter().collect();
            let mut reversed = forward.clone();
            reversed.reverse();
            let a: Vec<String> = forward.iter().map(|(k, v)| format!("\"{k}\":{v}")).collect();
            let b: Vec<String> = reversed.iter().map(|(k, v)| format!("\"{k}\":{v}")).collect();
            let ca = CanonicalBytes::from_json_slice(format!("{{{}}}", a.join(",")).as_bytes()).unwrap();
            let cb = CanonicalBytes::from_json_slice(format!("{{{}}}", b.join(" , ")).as_bytes()).unwrap();
            prop_assert_eq!(ca, cb);
        }
    }
}
