//! # Attestation Payload Decoding
//!
//! Attestation payloads are Solidity ABI-encoded tuples described by the
//! attestation service's schema string, a comma-separated list of
//! `type name` pairs:
//!
//! ```text
//! string subject, string version, uint8 ratingValue, string[] tags
//! ```
//!
//! Type strings are parsed and payloads decoded with the ethers ABI module.
//! This module only checks that the schema stays within the supported types
//! and renders the tokens as a JSON object keyed by field name.
//!
//! Integers that fit 64 bits become JSON numbers, values up to 128 bits
//! become decimal strings, and larger unsigned values become `0x` hex.
//! Addresses are rendered in checksum casing and byte arrays as `0x` hex.

use ethers_core::abi::ethabi::param_type::Reader;
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::U256;
use omatrust_core::to_checksum_address;
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// One `type name` entry of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub ty: ParamType,
}

/// Parse a schema string into its fields.
pub fn parse_schema(schema: &str) -> Result<Vec<SchemaField>, DecodeError> {
    schema
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|field| {
            let parts: Vec<&str> = field.split_whitespace().collect();
            match parts.as_slice() {
                [ty, name] => Ok(SchemaField {
                    name: (*name).to_string(),
                    ty: parse_type(ty)?,
                }),
                _ => Err(DecodeError::InvalidSchema(field.to_string())),
            }
        })
        .collect()
}

/// Parse one Solidity type string, rejecting types the decoder does not render.
pub fn parse_type(ty: &str) -> Result<ParamType, DecodeError> {
    let unsupported = || DecodeError::UnsupportedType(ty.to_string());
    let parsed = Reader::read(ty).map_err(|_| unsupported())?;
    if is_supported(&parsed) {
        Ok(parsed)
    } else {
        Err(unsupported())
    }
}

fn is_supported(ty: &ParamType) -> bool {
    match ty {
        ParamType::String | ParamType::Bytes | ParamType::Address | ParamType::Bool => true,
        ParamType::FixedBytes(n) => (1..=32).contains(n),
        ParamType::Uint(bits) | ParamType::Int(bits) => bits % 8 == 0 && (8..=256).contains(bits),
        ParamType::Array(inner) => is_supported(inner),
        ParamType::FixedArray(..) | ParamType::Tuple(_) => false,
    }
}

/// Decode an ABI-encoded tuple into a JSON object keyed by field name.
pub fn decode_payload(fields: &[SchemaField], data: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    let types: Vec<ParamType> = fields.iter().map(|f| f.ty.clone()).collect();
    let tokens = abi::decode(&types, data).map_err(|e| DecodeError::Abi(e.to_string()))?;

    let mut out = Map::new();
    for (field, token) in fields.iter().zip(tokens) {
        let value = render(&field.ty, token, &field.name)?;
        out.insert(field.name.clone(), value);
    }
    Ok(out)
}

fn render(ty: &ParamType, token: Token, field: &str) -> Result<Value, DecodeError> {
    match (ty, token) {
        (ParamType::String, Token::String(s)) => Ok(Value::String(s)),
        (ParamType::Bool, Token::Bool(b)) => Ok(Value::Bool(b)),
        (ParamType::Address, Token::Address(a)) => Ok(Value::String(to_checksum_address(&a.0))),
        (ParamType::Bytes, Token::Bytes(b)) | (ParamType::FixedBytes(_), Token::FixedBytes(b)) => {
            Ok(Value::String(format!("0x{}", hex::encode(b))))
        }
        (ParamType::Uint(bits), Token::Uint(v)) => render_uint(*bits, v, field),
        (ParamType::Int(bits), Token::Int(v)) => render_int(*bits, v, field),
        (ParamType::Array(inner), Token::Array(items)) => items
            .into_iter()
            .map(|item| render(inner, item, field))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ty, _) => Err(DecodeError::UnsupportedType(ty.to_string())),
    }
}

fn word(v: U256) -> [u8; 32] {
    let mut w = [0u8; 32];
    v.to_big_endian(&mut w);
    w
}

fn render_uint(bits: usize, v: U256, field: &str) -> Result<Value, DecodeError> {
    if v.bits() > bits {
        return Err(out_of_range(field));
    }
    let w = word(v);
    if w[..16].iter().any(|b| *b != 0) {
        return Ok(Value::String(format!("0x{}", hex::encode(w))));
    }
    let v = v.as_u128();
    Ok(u64::try_from(v).map_or_else(|_| Value::String(v.to_string()), Value::from))
}

/// `v` holds the two's-complement word as decoded.
fn render_int(bits: usize, v: U256, field: &str) -> Result<Value, DecodeError> {
    let w = word(v);
    let negative = w[0] & 0x80 != 0;
    let fill = if negative { 0xff } else { 0x00 };
    let unused = 32 - bits / 8;
    if w[..unused].iter().any(|b| *b != fill) || (w[unused] & 0x80 != 0) != negative {
        return Err(out_of_range(field));
    }
    // Values wider than 128 bits are not representable here.
    if w[..16].iter().any(|b| *b != fill) || (w[16] & 0x80 != 0) != negative {
        return Err(out_of_range(field));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&w[16..]);
    let v = i128::from_be_bytes(low);
    Ok(i64::try_from(v).map_or_else(|_| Value::String(v.to_string()), Value::from))
}

fn out_of_range(field: &str) -> DecodeError {
    DecodeError::OutOfRange {
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::abi::encode;
    use ethers_core::types::Address;

    const REVIEW: &str = "string subject, string version, uint8 ratingValue, string[] tags";

    fn string(s: &str) -> Token {
        Token::String(s.to_string())
    }

    #[test]
    fn parses_schema_fields() {
        let fields = parse_schema(REVIEW).unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], SchemaField { name: "subject".into(), ty: ParamType::String });
        assert_eq!(fields[2].ty, ParamType::Uint(8));
        assert_eq!(fields[3].ty, ParamType::Array(Box::new(ParamType::String)));
    }

    #[test]
    fn parses_type_aliases_and_rejects_unsupported() {
        assert_eq!(parse_type("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("int").unwrap(), ParamType::Int(256));
        assert_eq!(parse_type("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert!(parse_type("uint7").is_err());
        assert!(parse_type("bytes33").is_err());
        assert!(parse_type("string[2]").is_err());
        assert!(parse_type("(string,uint8)").is_err());
        assert!(parse_schema("string").is_err());
    }

    #[test]
    fn decodes_review_payload() {
        let fields = parse_schema(REVIEW).unwrap();
        let data = encode(&[
            string("did:web:example.com"),
            string("1.2.0"),
            Token::Uint(U256::from(4u64)),
            Token::Array(vec![
                string("fast"),
                string("a longer tag that spans more than one word"),
            ]),
        ]);
        let decoded = decode_payload(&fields, &data).unwrap();
        assert_eq!(decoded["subject"], "did:web:example.com");
        assert_eq!(decoded["version"], "1.2.0");
        assert_eq!(decoded["ratingValue"], 4);
        assert_eq!(
            decoded["tags"],
            serde_json::json!(["fast", "a longer tag that spans more than one word"])
        );
    }

    #[test]
    fn decodes_static_types() {
        let fields = parse_schema("address owner, bool active, int64 delta, uint128 big, bytes data").unwrap();
        let owner = Address::from_slice(&hex::decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap());
        let data = encode(&[
            Token::Address(owner),
            Token::Bool(true),
            Token::Int(U256::MAX - U256::from(4u64)),
            Token::Uint(U256::from(u128::MAX)),
            Token::Bytes(vec![0xde, 0xad]),
        ]);
        let decoded = decode_payload(&fields, &data).unwrap();
        assert_eq!(decoded["owner"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(decoded["active"], true);
        assert_eq!(decoded["delta"], -5);
        assert_eq!(decoded["big"], u128::MAX.to_string());
        assert_eq!(decoded["data"], "0xdead");
    }

    #[test]
    fn wide_uint256_renders_as_hex() {
        let fields = parse_schema("uint256 total").unwrap();
        let data = encode(&[Token::Uint(U256::MAX)]);
        let decoded = decode_payload(&fields, &data).unwrap();
        assert_eq!(decoded["total"], format!("0x{}", "ff".repeat(32)));
    }

    #[test]
    fn rejects_values_wider_than_declared() {
        let fields = parse_schema("uint8 small").unwrap();
        let data = encode(&[Token::Uint(U256::from(256u64))]);
        assert!(matches!(
            decode_payload(&fields, &data),
            Err(DecodeError::OutOfRange { .. })
        ));

        let fields = parse_schema("int8 small").unwrap();
        let data = encode(&[Token::Int(U256::from(200u64))]);
        assert!(matches!(
            decode_payload(&fields, &data),
            Err(DecodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn truncated_payloads_fail_cleanly() {
        let fields = parse_schema(REVIEW).unwrap();
        let data = encode(&[string("did:web:example.com")]);
        assert!(matches!(
            decode_payload(&fields, &data[..40]),
            Err(DecodeError::Abi(_))
        ));
        assert!(decode_payload(&fields, &[]).is_err());
    }

    #[test]
    fn hostile_lengths_are_rejected() {
        let fields = parse_schema("string[] tags").unwrap();
        let mut data = vec![0u8; 64];
        data[31] = 32; // offset
        data[56..64].copy_from_slice(&u64::MAX.to_be_bytes());
        assert!(decode_payload(&fields, &data).is_err());
    }
}
