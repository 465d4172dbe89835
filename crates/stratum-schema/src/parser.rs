// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parser for `.def` definition source.
//!
//! Grammar, one declaration per line:
//!
//! ```text
//! namespace=my.ns
//! version=2-1
//! # comment
//! stringval string default="foo"
//! intval int default=0 range=[0,100]
//! enumval enum { A, B, C } default=A
//! simple.name string
//! stringarr[] string
//! nestedarr[].foo int default=3
//! leafmap{} long
//! innermap{}.foo int default=1
//! ```
//!
//! Path segments before the last name structs (`a.`), inner arrays (`a[].`)
//! or struct maps (`a{}.`); the last segment names a leaf, a leaf array
//! (`a[]`) or a leaf map (`a{}`). Options are `default=` and `range=[min,max]`;
//! `restart` is accepted and ignored.

use crate::definition::ConfigDefinition;
use crate::error::SchemaError;
use crate::leaf::{LeafKind, LeafSpec};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Plain,
    Array,
    Map,
}

/// Parse `.def` source into a definition named `name`.
pub fn parse_definition(name: &str, source: &str) -> Result<ConfigDefinition, SchemaError> {
    let mut def = ConfigDefinition::new(name);
    let mut namespace_seen = false;
    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let err = |message: String| SchemaError::Parse {
            line: line_no,
            message,
        };
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(ns) = line
            .strip_prefix("namespace=")
            .or_else(|| line.strip_prefix("package="))
        {
            if def.field_count() > 0 {
                return Err(err("namespace must precede field declarations".into()));
            }
            if namespace_seen {
                return Err(err("namespace declared twice".into()));
            }
            namespace_seen = true;
            def.set_namespace(ns.trim());
            continue;
        }
        if let Some(version) = line.strip_prefix("version=") {
            def.set_version(version.trim());
            continue;
        }
        parse_field(&mut def, line).map_err(|e| match e {
            SchemaError::Parse { message, .. } => err(message),
            other => err(other.to_string()),
        })?;
    }
    Ok(def)
}

fn parse_field(def: &mut ConfigDefinition, line: &str) -> Result<(), SchemaError> {
    let syntax = |message: String| SchemaError::Parse { line: 0, message };
    let (path, rest) = split_token(line);
    let (type_word, mut rest) = split_token(rest);
    if type_word.is_empty() {
        return Err(syntax(format!("missing type for '{path}'")));
    }
    let kind: LeafKind = type_word.parse().map_err(syntax)?;

    let mut spec = if kind == LeafKind::Enum {
        let body = rest
            .strip_prefix('{')
            .ok_or_else(|| syntax("enum values must be enclosed in { }".into()))?;
        let close = body
            .find('}')
            .ok_or_else(|| syntax("unterminated enum value list".into()))?;
        let values: Vec<&str> = body[..close]
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if let Some(bad) = values.iter().find(|v| !is_identifier(v)) {
            return Err(syntax(format!("invalid enum value '{bad}'")));
        }
        rest = body[close + 1..].trim_start();
        LeafSpec::enumeration(values)
    } else {
        LeafSpec::new(kind)
    };

    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(syntax("empty field path".into()));
    };
    let (leaf_name, leaf_shape) = split_shape(last).map_err(syntax)?;

    for option in tokenize_options(rest).map_err(syntax)? {
        if option == "restart" {
            continue;
        }
        if let Some(value) = option.strip_prefix("default=") {
            spec = spec.with_default(unquote(value));
        } else if let Some(range) = option.strip_prefix("range=") {
            let inner = range
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .ok_or_else(|| syntax(format!("malformed range '{range}'")))?;
            let (min, max) = inner
                .split_once(',')
                .ok_or_else(|| syntax(format!("malformed range '{range}'")))?;
            spec = spec.with_range_literals(leaf_name, bound(min), bound(max))?;
        } else {
            return Err(syntax(format!("unknown option '{option}'")));
        }
    }

    let mut node = def;
    for parent in parents {
        let (name, shape) = split_shape(parent).map_err(syntax)?;
        node = match shape {
            Shape::Plain => node.struct_entry(name)?,
            Shape::Array => node.inner_array_entry(name)?,
            Shape::Map => node.struct_map_entry(name)?,
        };
    }
    match leaf_shape {
        Shape::Plain => node.add_leaf(leaf_name, spec)?,
        Shape::Array => node.add_array(leaf_name, spec)?,
        Shape::Map => node.add_leaf_map(leaf_name, spec)?,
    };
    Ok(())
}

fn bound(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

fn split_shape(segment: &str) -> Result<(&str, Shape), String> {
    let (name, shape) = if let Some(n) = segment.strip_suffix("[]") {
        (n, Shape::Array)
    } else if let Some(n) = segment.strip_suffix("{}") {
        (n, Shape::Map)
    } else {
        (segment, Shape::Plain)
    };
    if is_identifier(name) {
        Ok((name, shape))
    } else {
        Err(format!("invalid field name '{segment}'"))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Split option text on whitespace, keeping quoted strings intact.
fn tokenize_options(s: &str) -> Result<Vec<&str>, String> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i == bytes.len() {
            break;
        }
        let start = i;
        let mut quoted = false;
        while i < bytes.len() && (quoted || !bytes[i].is_ascii_whitespace()) {
            match bytes[i] {
                b'\\' if quoted => i += 1,
                b'"' => quoted = !quoted,
                _ => {}
            }
            i += 1;
        }
        if quoted {
            return Err("unterminated string literal".into());
        }
        out.push(&s[start..i.min(bytes.len())]);
    }
    Ok(out)
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_owned();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
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
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::definition::FieldDef;
    use crate::leaf::NumericRange;

    #[test]
    fn parses_header_and_leaves() {
        let src = r#"
namespace=foo.bar
version=3-1
# a comment
stringval string default="with # hash and \"quotes\""
intval int default=0 range=[0,100]
flag bool default=true restart
"#;
        let def = parse_definition("simple", src).unwrap();
        assert_eq!(def.namespace(), "foo.bar");
        assert_eq!(def.version(), Some("3-1"));
        assert_eq!(
            def.leaf("stringval").unwrap().default_value(),
            Some(r#"with # hash and "quotes""#)
        );
        assert_eq!(
            def.leaf("intval").unwrap().range(),
            Some(NumericRange::Int { min: 0, max: 100 })
        );
        assert_eq!(def.leaf("flag").unwrap().default_value(), Some("true"));
    }

    #[test]
    fn parses_enums() {
        let def = parse_definition("e", "mode enum { FAST, SAFE } default=SAFE").unwrap();
        let spec = def.leaf("mode").unwrap();
        assert_eq!(spec.enum_values(), ["FAST", "SAFE"]);
        assert_eq!(spec.default_value(), Some("SAFE"));
        assert!(parse_definition("e", "mode enum { A } default=B").is_err());
    }

    #[test]
    fn parses_nested_shapes() {
        let src = "\
simple.name string
stringarr[] string
nestedarr[].foo string
nestedarr[].bar int default=3
leafmap{} long
innermap{}.foo int default=1
";
        let def = parse_definition("nested", src).unwrap();
        assert!(def.struct_def("simple").unwrap().leaf("name").is_some());
        assert!(def.array("stringarr").is_some());
        let inner = def.inner_array("nestedarr").unwrap();
        assert_eq!(inner.field_count(), 2);
        assert!(matches!(def.field("leafmap"), Some(FieldDef::LeafMap(_))));
        assert!(def.struct_map("innermap").unwrap().leaf("foo").is_some());
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse_definition("bad", "a int\nb nosuchtype\n").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 2, .. }));
        let dup = parse_definition("bad", "a int\na string\n").unwrap_err();
        assert!(matches!(dup, SchemaError::Parse { line: 2, .. }));
        let clash = parse_definition("bad", "s.x int\ns[].y int\n").unwrap_err();
        assert!(matches!(clash, SchemaError::Parse { line: 2, .. }));
    }

    #[test]
    fn rejects_unterminated_strings() {
        assert!(parse_definition("bad", r#"s string default="open"#).is_err());
    }
}
