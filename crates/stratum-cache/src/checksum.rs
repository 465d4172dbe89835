// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Payload and definition checksums.
//!
//! Payload checksums are computed over the compact JSON rendering of the
//! payload. Object keys are sorted, so equal payloads always hash equal.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use stratum_payload::Document;
use xxhash_rust::xxh64::xxh64;

/// MD5 and XXHASH64 of one payload, as lowercase hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadChecksums {
    md5: String,
    xxhash64: String,
}

impl PayloadChecksums {
    /// Checksums of the canonical rendering of `payload`.
    pub fn from_payload(payload: &Document) -> Self {
        Self::from_bytes(canonical_json(payload).as_bytes())
    }

    /// Checksums of raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            md5: hex::encode(Md5::digest(bytes)),
            xxhash64: format!("{:016x}", xxh64(bytes, 0)),
        }
    }

    /// Lowercase hex MD5; empty when unknown.
    pub fn md5(&self) -> &str {
        &self.md5
    }

    /// Lowercase hex XXHASH64; empty when unknown.
    pub fn xxhash64(&self) -> &str {
        &self.xxhash64
    }

    /// Returns `true` when neither checksum is known.
    pub fn is_empty(&self) -> bool {
        self.md5.is_empty() && self.xxhash64.is_empty()
    }

    /// Compare checksum by checksum, skipping any the other side does not
    /// know. Two sets with no checksum in common match.
    pub fn matches(&self, other: &Self) -> bool {
        let agree = |a: &str, b: &str| a.is_empty() || b.is_empty() || a == b;
        agree(&self.md5, &other.md5) && agree(&self.xxhash64, &other.xxhash64)
    }
}

/// Compact JSON rendering used for checksums.
pub fn canonical_json(payload: &Document) -> String {
    payload.to_string()
}

/// MD5 of definition source, insensitive to comments, blank lines,
/// surrounding whitespace and `version=` lines.
pub fn definition_md5<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Md5::new();
    for line in lines {
        let line = strip_comment(line.as_ref()).trim();
        if line.is_empty() || line.starts_with("version=") {
            continue;
        }
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_digests_of_empty_input() {
        let sums = PayloadChecksums::from_bytes(b"");
        assert_eq!(sums.md5(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(sums.xxhash64(), "ef46db3751d8e999");
    }

    #[test]
    fn payload_checksums_ignore_construction_order() {
        let a = json!({"a": 1, "b": {"c": "x"}});
        let mut b = json!({});
        b["b"] = json!({"c": "x"});
        b["a"] = json!(1);
        assert_eq!(PayloadChecksums::from_payload(&a), PayloadChecksums::from_payload(&b));
        assert_ne!(
            PayloadChecksums::from_payload(&a),
            PayloadChecksums::from_payload(&json!({"a": 2}))
        );
    }

    #[test]
    fn matches_skips_unknown_checksums() {
        let full = PayloadChecksums::from_bytes(b"x");
        let md5_only = PayloadChecksums {
            md5: full.md5().to_owned(),
            xxhash64: String::new(),
        };
        let other = PayloadChecksums::from_bytes(b"y");
        assert!(full.matches(&md5_only));
        assert!(!full.matches(&other));
        assert!(PayloadChecksums::default().matches(&other));
        assert!(PayloadChecksums::default().is_empty());
    }

    #[test]
    fn definition_md5_normalizes_source() {
        let a = definition_md5(["namespace=x", "version=1", "a int # note", "", "b string"]);
        let b = definition_md5(["  namespace=x", "# header", "a int", "version=7", "b string  "]);
        assert_eq!(a, b);
        assert_ne!(a, definition_md5(["namespace=x", "a int", "b int"]));
        assert_ne!(
            definition_md5([r##"s string default="#1""##]),
            definition_md5(["s string default=\""])
        );
    }
}
