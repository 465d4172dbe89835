// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Leaf type specifications and literal verification.
//!
//! A [`LeafSpec`] describes one scalar slot: its kind, optional default
//! literal, numeric range, and (for enums) the ordered set of legal values.
//! Verification works on the *string* form of a value because that is what
//! the payload builder stores and what the text wire format carries.

use std::str::FromStr;

use crate::error::{SchemaError, ValueError};

/// Scalar kinds a leaf may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// `true` / `false`.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// IEEE-754 double.
    Double,
    /// UTF-8 string.
    String,
    /// One of a declared set of identifiers.
    Enum,
    /// Config id of another configuration.
    Reference,
    /// File reference distributed alongside the config.
    File,
}

impl LeafKind {
    /// Keyword used in `.def` source.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Reference => "reference",
            Self::File => "file",
        }
    }

    /// Returns `true` for int, long and double.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Double)
    }
}

impl std::fmt::Display for LeafKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for LeafKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "long" => Self::Long,
            "double" => Self::Double,
            "string" => Self::String,
            "enum" => Self::Enum,
            "reference" => Self::Reference,
            "file" => Self::File,
            other => return Err(format!("unknown type '{other}'")),
        })
    }
}

/// Inclusive numeric bounds for int, long and double leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericRange {
    /// Bounds of an int leaf.
    Int {
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },
    /// Bounds of a long leaf.
    Long {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Bounds of a double leaf.
    Double {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

impl NumericRange {
    /// Full range of the given numeric kind, `None` for other kinds.
    pub const fn full(kind: LeafKind) -> Option<Self> {
        match kind {
            LeafKind::Int => Some(Self::Int {
                min: i32::MIN,
                max: i32::MAX,
            }),
            LeafKind::Long => Some(Self::Long {
                min: i64::MIN,
                max: i64::MAX,
            }),
            LeafKind::Double => Some(Self::Double {
                min: f64::NEG_INFINITY,
                max: f64::INFINITY,
            }),
            _ => None,
        }
    }

    fn bounds_text(&self) -> (String, String) {
        match *self {
            Self::Int { min, max } => (min.to_string(), max.to_string()),
            Self::Long { min, max } => (min.to_string(), max.to_string()),
            Self::Double { min, max } => (format_double(min), format_double(max)),
        }
    }

    fn out_of_range(&self) -> ValueError {
        let (min, max) = self.bounds_text();
        ValueError::OutOfRange { min, max }
    }
}

/// Specification of a single scalar slot (a leaf field, or the element type
/// of a leaf array / leaf map).
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSpec {
    kind: LeafKind,
    default: Option<String>,
    range: Option<NumericRange>,
    enum_values: Vec<String>,
}

impl LeafSpec {
    /// Spec of the given kind with no default and full numeric range.
    pub fn new(kind: LeafKind) -> Self {
        Self {
            kind,
            default: None,
            range: NumericRange::full(kind),
            enum_values: Vec::new(),
        }
    }

    /// `bool` leaf.
    pub fn bool() -> Self {
        Self::new(LeafKind::Bool)
    }

    /// `int` leaf.
    pub fn int() -> Self {
        Self::new(LeafKind::Int)
    }

    /// `long` leaf.
    pub fn long() -> Self {
        Self::new(LeafKind::Long)
    }

    /// `double` leaf.
    pub fn double() -> Self {
        Self::new(LeafKind::Double)
    }

    /// `string` leaf.
    pub fn string() -> Self {
        Self::new(LeafKind::String)
    }

    /// `reference` leaf.
    pub fn reference() -> Self {
        Self::new(LeafKind::Reference)
    }

    /// `file` leaf.
    pub fn file() -> Self {
        Self::new(LeafKind::File)
    }

    /// `enum` leaf with the given ordered values.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_values: values.into_iter().map(Into::into).collect(),
            ..Self::new(LeafKind::Enum)
        }
    }

    /// Attach a default literal (checked when the spec is added to a definition).
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    /// Narrow an int leaf's range.
    pub fn with_int_range(mut self, min: i32, max: i32) -> Self {
        self.range = Some(NumericRange::Int { min, max });
        self
    }

    /// Narrow a long leaf's range.
    pub fn with_long_range(mut self, min: i64, max: i64) -> Self {
        self.range = Some(NumericRange::Long { min, max });
        self
    }

    /// Narrow a double leaf's range.
    pub fn with_double_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(NumericRange::Double { min, max });
        self
    }

    /// Narrow the range from literal bounds; an absent bound keeps the full
    /// range on that side.
    pub fn with_range_literals(
        self,
        field: &str,
        min: Option<&str>,
        max: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let bad = |message: String| SchemaError::InvalidRange {
            field: field.to_owned(),
            message,
        };
        match self.range {
            Some(NumericRange::Int { min: lo, max: hi }) => {
                let lo = parse_bound::<i32>(min, lo).map_err(bad)?;
                let hi = parse_bound::<i32>(max, hi).map_err(bad)?;
                Ok(self.with_int_range(lo, hi))
            }
            Some(NumericRange::Long { min: lo, max: hi }) => {
                let lo = parse_bound::<i64>(min, lo).map_err(bad)?;
                let hi = parse_bound::<i64>(max, hi).map_err(bad)?;
                Ok(self.with_long_range(lo, hi))
            }
            Some(NumericRange::Double { min: lo, max: hi }) => {
                let lo = match min {
                    Some(text) => parse_double(text).map_err(|_| bad(format!("bad bound '{text}'")))?,
                    None => lo,
                };
                let hi = match max {
                    Some(text) => parse_double(text).map_err(|_| bad(format!("bad bound '{text}'")))?,
                    None => hi,
                };
                Ok(self.with_double_range(lo, hi))
            }
            None => Err(bad(format!("{} leaves take no range", self.kind))),
        }
    }

    /// Declared kind.
    pub fn kind(&self) -> LeafKind {
        self.kind
    }

    /// Default literal, if declared.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Effective numeric range (full range unless narrowed); `None` for
    /// non-numeric kinds.
    pub fn range(&self) -> Option<NumericRange> {
        self.range
    }

    /// Declared enum values in declaration order.
    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }

    /// Check a literal against this spec's kind, range and enum constraints.
    pub fn check(&self, literal: &str) -> Result<(), ValueError> {
        match self.kind {
            LeafKind::Bool => match literal {
                "true" | "false" => Ok(()),
                _ => Err(ValueError::NotBool),
            },
            LeafKind::Int | LeafKind::Long => {
                let value: i128 = parse_integer(literal)?;
                let inside = match self.range {
                    Some(NumericRange::Int { min, max }) => {
                        (i128::from(min)..=i128::from(max)).contains(&value)
                    }
                    Some(NumericRange::Long { min, max }) => {
                        (i128::from(min)..=i128::from(max)).contains(&value)
                    }
                    _ => true,
                };
                self.in_range(inside)
            }
            LeafKind::Double => {
                let value = parse_double(literal)?;
                let inside = match self.range {
                    Some(NumericRange::Double { min, max }) => value >= min && value <= max,
                    _ => true,
                };
                self.in_range(inside)
            }
            LeafKind::Enum => {
                if self.enum_values.iter().any(|v| v == literal) {
                    Ok(())
                } else {
                    Err(ValueError::NotEnumMember)
                }
            }
            LeafKind::String | LeafKind::Reference | LeafKind::File => Ok(()),
        }
    }

    fn in_range(&self, inside: bool) -> Result<(), ValueError> {
        match self.range {
            Some(range) if !inside => Err(range.out_of_range()),
            _ => Ok(()),
        }
    }

    /// Validate the spec itself: enum values present, range ordered, default legal.
    pub(crate) fn validate(&self, field: &str) -> Result<(), SchemaError> {
        if self.kind == LeafKind::Enum && self.enum_values.is_empty() {
            return Err(SchemaError::EmptyEnum(field.to_owned()));
        }
        let inverted = match self.range {
            Some(NumericRange::Int { min, max }) => min > max,
            Some(NumericRange::Long { min, max }) => min > max,
            Some(NumericRange::Double { min, max }) => min > max || min.is_nan() || max.is_nan(),
            None => false,
        };
        if inverted {
            return Err(SchemaError::InvalidRange {
                field: field.to_owned(),
                message: "min exceeds max".to_owned(),
            });
        }
        if let Some(default) = &self.default {
            self.check(default)
                .map_err(|reason| SchemaError::InvalidDefault {
                    field: field.to_owned(),
                    reason,
                })?;
        }
        Ok(())
    }
}

fn parse_bound<T>(text: Option<&str>, fallback: T) -> Result<T, String>
where
    T: FromStr,
{
    match text {
        Some(t) => t.parse().map_err(|_| format!("bad bound '{t}'")),
        None => Ok(fallback),
    }
}

fn parse_integer(literal: &str) -> Result<i128, ValueError> {
    let digits = literal.strip_prefix(['-', '+']).unwrap_or(literal);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueError::NotInteger);
    }
    literal.parse().map_err(|_| ValueError::NotInteger)
}

/// Strict double parse: decimal/exponent syntax only, plus the literals
/// `Infinity` and `-Infinity`.
pub fn parse_double(literal: &str) -> Result<f64, ValueError> {
    match literal {
        "Infinity" => return Ok(f64::INFINITY),
        "-Infinity" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    let legal = !literal.is_empty()
        && literal
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && literal.bytes().any(|b| b.is_ascii_digit());
    if !legal {
        return Err(ValueError::NotDouble);
    }
    literal.parse().map_err(|_| ValueError::NotDouble)
}

/// Render a double the way the wire format spells it (`Infinity`, `-Infinity`).
pub fn format_double(value: f64) -> String {
    if value == f64::INFINITY {
        "Infinity".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        value.to_string()
    }
}
