// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Flat line-oriented text encoding of a document against its schema.
//!
//! Each declared leaf present in the document becomes one `path value` line,
//! visited in schema declaration order. Map entries are visited in key
//! order, so the output is fully determined by the input.
//!
//! ```text
//! simple.name "myname"
//! stringarr[0] "a"
//! nestedarr[1].foo 3
//! innermap{"bar"}.foo 7
//! ```

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stratum_schema::{ConfigDefinition, FieldDef, LeafKind, LeafSpec, ValueError};
use thiserror::Error;

use crate::document::leaf_text;
use crate::Document;

/// Encoder knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Check non-string leaves against their declared kind, range and enum
    /// values instead of passing literals through verbatim.
    pub strict_types: bool,
}

/// Failure while encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The output sink failed.
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
    /// A leaf literal failed its declared type (strict mode only).
    #[error("invalid {kind} value '{value}' at '{path}': {reason}")]
    TypeMismatch {
        /// Encoded path of the offending leaf.
        path: String,
        /// Declared leaf kind.
        kind: LeafKind,
        /// Rejected literal.
        value: String,
        /// Constraint that failed.
        #[source]
        reason: ValueError,
    },
}

/// Encodes documents for one schema.
#[derive(Debug, Clone, Copy)]
pub struct TextEncoder<'a> {
    schema: &'a ConfigDefinition,
    options: EncoderOptions,
}

impl<'a> TextEncoder<'a> {
    /// Relaxed encoder for `schema`.
    pub fn new(schema: &'a ConfigDefinition) -> Self {
        Self::with_options(schema, EncoderOptions::default())
    }

    /// Encoder for `schema` with explicit options.
    pub const fn with_options(schema: &'a ConfigDefinition, options: EncoderOptions) -> Self {
        Self { schema, options }
    }

    /// Encoded lines, without trailing newlines.
    pub fn lines(&self, doc: &Document) -> Result<Vec<String>, EncodeError> {
        let mut out = Vec::new();
        if let Value::Object(map) = doc {
            self.walk(self.schema, map, "", &mut out)?;
        }
        Ok(out)
    }

    /// Write every line, each terminated by `\n`, to `sink`.
    pub fn encode_into<W: Write>(&self, doc: &Document, sink: &mut W) -> Result<(), EncodeError> {
        for line in self.lines(doc)? {
            sink.write_all(line.as_bytes())?;
            sink.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Encoded text as one string.
    pub fn encode_to_string(&self, doc: &Document) -> Result<String, EncodeError> {
        let mut text = String::new();
        for line in self.lines(doc)? {
            text.push_str(&line);
            text.push('\n');
        }
        Ok(text)
    }

    fn walk(
        &self,
        schema: &ConfigDefinition,
        map: &Map<String, Value>,
        prefix: &str,
        out: &mut Vec<String>,
    ) -> Result<(), EncodeError> {
        for (name, field) in schema.fields() {
            let Some(value) = map.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            let path = format!("{prefix}{name}");
            match field {
                FieldDef::Leaf(spec) => self.push_leaf(spec, value, &path, out)?,
                FieldDef::Struct(child) => {
                    if let Value::Object(inner) = value {
                        self.walk(child, inner, &format!("{path}."), out)?;
                    }
                }
                FieldDef::Array(spec) => {
                    if let Value::Array(items) = value {
                        for (index, item) in items.iter().enumerate() {
                            self.push_leaf(spec, item, &format!("{path}[{index}]"), out)?;
                        }
                    }
                }
                FieldDef::InnerArray(child) => {
                    if let Value::Array(items) = value {
                        for (index, item) in items.iter().enumerate() {
                            if let Value::Object(inner) = item {
                                self.walk(child, inner, &format!("{path}[{index}]."), out)?;
                            }
                        }
                    }
                }
                FieldDef::LeafMap(spec) => {
                    if let Value::Object(entries) = value {
                        for (key, item) in entries {
                            let entry = format!("{path}{{{}}}", quote(key));
                            self.push_leaf(spec, item, &entry, out)?;
                        }
                    }
                }
                FieldDef::StructMap(child) => {
                    if let Value::Object(entries) = value {
                        for (key, item) in entries {
                            if let Value::Object(inner) = item {
                                let entry = format!("{path}{{{}}}.", quote(key));
                                self.walk(child, inner, &entry, out)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn push_leaf(
        &self,
        spec: &LeafSpec,
        value: &Value,
        path: &str,
        out: &mut Vec<String>,
    ) -> Result<(), EncodeError> {
        let Some(raw) = leaf_text(value) else {
            return Ok(());
        };
        if self.options.strict_types && spec.kind() != LeafKind::String {
            spec.check(&raw).map_err(|reason| EncodeError::TypeMismatch {
                path: path.to_owned(),
                kind: spec.kind(),
                value: raw.clone(),
                reason,
            })?;
        }
        let text = match spec.kind() {
            LeafKind::String => quote(&raw),
            LeafKind::Bool => bool_literal(&raw).to_owned(),
            _ => raw,
        };
        out.push(format!("{path} {text}"));
        Ok(())
    }
}

/// Booleans that are not `true` (any case) encode as `false`.
fn bool_literal(raw: &str) -> &'static str {
    if raw.eq_ignore_ascii_case("true") {
        "true"
    } else {
        "false"
    }
}

/// Double-quote `raw`, escaping backslashes, quotes and newlines.
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratum_schema::parse_definition;

    fn schema() -> ConfigDefinition {
        parse_definition(
            "enc",
            "\
stringval string
boolval bool
intval int range=[0,10]
simple.name string
stringarr[] string
nestedarr[].foo int
leafmap{} long
innermap{}.foo int
",
        )
        .unwrap()
    }

    #[test]
    fn encodes_paths_in_declaration_order() {
        let doc = json!({
            "innermap": {"bar": {"foo": 7}, "a\"b": {"foo": 1}},
            "leafmap": {"k": 9},
            "nestedarr": [{"foo": 1}, {"foo": "3"}],
            "stringarr": ["a", "b"],
            "simple": {"name": "myname"},
            "intval": 5,
            "boolval": true,
            "stringval": "s",
        });
        let lines = TextEncoder::new(&schema()).lines(&doc).unwrap();
        assert_eq!(
            lines,
            vec![
                r#"stringval "s""#,
                "boolval true",
                "intval 5",
                r#"simple.name "myname""#,
                r#"stringarr[0] "a""#,
                r#"stringarr[1] "b""#,
                "nestedarr[0].foo 1",
                "nestedarr[1].foo 3",
                r#"leafmap{"k"} 9"#,
                r#"innermap{"a\"b"}.foo 1"#,
                r#"innermap{"bar"}.foo 7"#,
            ]
        );
    }

    #[test]
    fn unknown_fields_and_absent_fields_produce_nothing() {
        let def = schema();
        let enc = TextEncoder::new(&def);
        assert!(enc.lines(&json!({"unknown": "x"})).unwrap().is_empty());
        assert!(enc.lines(&json!({"simple": {}})).unwrap().is_empty());
        assert!(enc.lines(&json!({"stringval": null})).unwrap().is_empty());
    }

    #[test]
    fn relaxed_mode_passes_literals_through() {
        let def = schema();
        let doc = json!({"intval": "notanumber", "boolval": "yes"});
        let text = TextEncoder::new(&def).encode_to_string(&doc).unwrap();
        assert_eq!(text, "boolval false\nintval notanumber\n");
    }

    #[test]
    fn strict_mode_rejects_bad_literals() {
        let def = schema();
        let strict = TextEncoder::with_options(&def, EncoderOptions { strict_types: true });
        let err = strict.lines(&json!({"intval": 11})).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::TypeMismatch { ref path, .. } if path == "intval"
        ));
        assert!(strict.lines(&json!({"intval": 10, "stringval": "any"})).is_ok());
    }

    #[test]
    fn encode_into_writes_newline_terminated_lines() {
        let def = schema();
        let mut sink = Vec::new();
        TextEncoder::new(&def)
            .encode_into(&json!({"simple": {"name": "myname"}}), &mut sink)
            .unwrap();
        assert_eq!(sink, b"simple.name \"myname\"\n");
    }

    #[test]
    fn quote_escapes_backslash_and_quote() {
        assert_eq!(quote(r#"some"quotes\"instring"#), r#""some\"quotes\\\"instring""#);
        assert_eq!(quote("two\nlines"), r#""two\nlines""#);
    }
}
