//! Conversion between `0x`-prefixed hex and the store's `\x` escaped text.
//!
//! The relational store keeps hashes and addresses as text in the escaped
//! form (`\x37cb...`). Clients only ever see the `0x` form.

use crate::domain::types::Row;
use serde_json::Value;

/// Hex columns of the block resource
pub const BLOCK_HEX_FIELDS: &[&str] = &["hash", "miner"];

/// Hex columns of the transaction resource
pub const TRANSACTION_HEX_FIELDS: &[&str] = &["hash", "from_address", "to_address", "input"];

/// `\xAB..` to `0xab..`; anything else is returned unchanged.
pub fn escaped_hex_to_prefixed(value: &str) -> String {
    match value.strip_prefix("\\x") {
        Some(digits) => format!("0x{}", digits.to_ascii_lowercase()),
        None => value.to_string(),
    }
}

/// `0xab..` to `\xab..`, for using a client value as a lookup key.
pub fn prefixed_hex_to_escaped(value: &str) -> String {
    match value.strip_prefix("0x") {
        Some(digits) => format!("\\x{}", digits),
        None => value.to_string(),
    }
}

/// Rewrite the named string fields of every row into `0x` form.
pub fn normalize_hex_fields(rows: &mut [Row], fields: &[&str]) {
    for row in rows.iter_mut() {
        for field in fields {
            if let Some(Value::String(s)) = row.get_mut(*field) {
                *s = escaped_hex_to_prefixed(s);
            }
        }
    }
}
