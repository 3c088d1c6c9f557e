// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic request hashing.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of arbitrary bytes.
pub fn hash_data(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex SHA-256 of a JSON body with object keys sorted at every depth.
///
/// Two bodies that differ only in key order hash identically.
pub fn hash_request(body: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(body, &mut canonical);
    hash_data(canonical.as_bytes())
}

/// Compact JSON with lexicographically sorted object keys.
pub fn canonical_json(body: &Value) -> String {
    let mut out = String::new();
    write_canonical(body, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
