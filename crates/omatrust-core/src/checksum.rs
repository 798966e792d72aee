//! # EIP-55 Checksum Casing
//!
//! An EVM address is rendered as mixed-case hex where the case of each
//! letter is taken from the keccak-256 of the lowercase hex string: if the
//! hash nibble at the same position is 8 or higher, the letter is uppercase.

use crate::digest::keccak256;

/// Render 20 address bytes in EIP-55 checksum casing, `0x`-prefixed.
pub fn to_checksum_address(bytes: &[u8; 20]) -> String {
    let lower = hex::encode(bytes);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse `0x` + 40 hex characters (any case) into address bytes.
pub fn parse_evm_address(s: &str) -> Option<[u8; 20]> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; 20];
    hex::decode_to_slice(digits, &mut out).ok()?;
    Some(out)
}

/// Re-case an EVM address string into checksum form.
///
/// Returns `None` if the input is not `0x` + 40 hex characters.
pub fn checksum_address(s: &str) -> Option<String> {
    parse_evm_address(s).map(|b| to_checksum_address(&b))
}

/// True if `s` is a well-formed address already in correct checksum casing.
pub fn is_checksummed(s: &str) -> bool {
    checksum_address(s).is_some_and(|c| c == s)
}
