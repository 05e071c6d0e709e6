//! Cache key derivation
//!
//! The key is the SHA-256 of a canonical (key-sorted, whitespace-free) JSON
//! document describing the request.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::models::ExecutionParams;

/// Version of the fingerprint layout, bumped whenever the payload changes shape
pub const FINGERPRINT_SCHEME: &str = "v1";

/// Fixed-length hex digest identifying one request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request
    pub fn compute(
        suite_id: &str,
        test_id: &str,
        model: &str,
        rendered_prompt: &str,
        params: &ExecutionParams,
    ) -> Self {
        let params = serde_json::to_value(params).unwrap_or(Value::Null);
        let payload = json!({
            "scheme": FINGERPRINT_SCHEME,
            "suite_id": suite_id,
            "test_id": test_id,
            "model": model,
            "prompt": rendered_prompt,
            "params": params,
        });

        let mut canonical = String::new();
        write_canonical(&payload, &mut canonical);

        let digest = Sha256::digest(canonical.as_bytes());
        Self(hex::encode(digest))
    }

    /// Accept only strings that look like a digest (used for file names)
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit());
        valid.then(|| Self(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize with object keys sorted at every depth
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
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
