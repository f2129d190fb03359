/// Restricted literal evaluation over tree-sitter Python expression nodes
///
/// Only nodes that can be read without executing code are accepted: numbers,
/// strings, booleans, `None` and list/tuple/set/dict displays built from them.
/// A sign applied directly to a number counts as part of the number.
use super::helpers::{node_text, value_children};
use super::strings::{decode_string_literal, StringLiteral};
use crate::errors::LiteralError;
use serde::Serialize;
use std::fmt;
use tree_sitter::Node;

/// A value readable straight from source syntax
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<LiteralValue>),
    Tuple(Vec<LiteralValue>),
    Set(Vec<LiteralValue>),
    /// Key/value pairs in insertion order
    Dict(Vec<(LiteralValue, LiteralValue)>),
}

impl LiteralValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LiteralValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LiteralValue::Float(f) => Some(*f),
            LiteralValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LiteralValue::None)
    }

    /// Name of the Python type this literal evaluates to
    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralValue::None => "NoneType",
            LiteralValue::Bool(_) => "bool",
            LiteralValue::Int(_) => "int",
            LiteralValue::Float(_) => "float",
            LiteralValue::Str(_) => "str",
            LiteralValue::Bytes(_) => "bytes",
            LiteralValue::List(_) => "list",
            LiteralValue::Tuple(_) => "tuple",
            LiteralValue::Set(_) => "set",
            LiteralValue::Dict(_) => "dict",
        }
    }
}

/// Python-style rendering (`True`, `None`, `(1,)`, `set()`), used in logs
impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::None => write!(f, "None"),
            LiteralValue::Bool(true) => write!(f, "True"),
            LiteralValue::Bool(false) => write!(f, "False"),
            LiteralValue::Int(i) => write!(f, "{}", i),
            LiteralValue::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            LiteralValue::Str(s) => {
                write!(f, "'")?;
                for c in s.chars() {
                    match c {
                        '\\' => write!(f, "\\\\")?,
                        '\'' => write!(f, "\\'")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "'")
            }
            LiteralValue::Bytes(bytes) => {
                write!(f, "b'")?;
                for &b in bytes {
                    match b {
                        b'\\' => write!(f, "\\\\")?,
                        b'\'' => write!(f, "\\'")?,
                        b'\n' => write!(f, "\\n")?,
                        b'\r' => write!(f, "\\r")?,
                        b'\t' => write!(f, "\\t")?,
                        0x20..=0x7e => write!(f, "{}", b as char)?,
                        _ => write!(f, "\\x{:02x}", b)?,
                    }
                }
                write!(f, "'")
            }
            LiteralValue::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            LiteralValue::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            LiteralValue::Set(items) if items.is_empty() => write!(f, "set()"),
            LiteralValue::Set(items) => {
                write!(f, "{{")?;
                write_items(f, items)?;
                write!(f, "}}")
            }
            LiteralValue::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[LiteralValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Evaluate an expression node as a literal, refusing anything that would need execution
pub(crate) fn eval_literal(node: Node, source: &str) -> Result<LiteralValue, LiteralError> {
    match node.kind() {
        "integer" => parse_integer(node_text(&node, source), false),
        "float" => parse_float(node_text(&node, source), false),
        "true" => Ok(LiteralValue::Bool(true)),
        "false" => Ok(LiteralValue::Bool(false)),
        "none" => Ok(LiteralValue::None),
        "string" => Ok(string_value(decode_string_literal(node_text(&node, source))?)),
        "concatenated_string" => {
            let mut joined: Option<StringLiteral> = None;
            for part in value_children(node) {
                if part.kind() != "string" {
                    return Err(not_literal(&part));
                }
                let decoded = decode_string_literal(node_text(&part, source))?;
                joined = Some(match joined {
                    Some(prev) => prev.concat(decoded)?,
                    None => decoded,
                });
            }
            joined
                .map(string_value)
                .ok_or_else(|| not_literal(&node))
        }
        "parenthesized_expression" => {
            let mut inner = value_children(node);
            match (inner.next(), inner.next()) {
                (Some(expr), None) => eval_literal(expr, source),
                _ => Err(not_literal(&node)),
            }
        }
        "list" => Ok(LiteralValue::List(eval_items(node, source)?)),
        // Bare `1, 2` on the right of an assignment is a tuple too
        "tuple" | "expression_list" => Ok(LiteralValue::Tuple(eval_items(node, source)?)),
        "set" => {
            let mut unique: Vec<LiteralValue> = Vec::new();
            for item in eval_items(node, source)? {
                check_hashable(&item)?;
                // `{1, True, 1.0}` keeps only the first of the equal members
                if !unique.iter().any(|member| hash_eq(member, &item)) {
                    unique.push(item);
                }
            }
            Ok(LiteralValue::Set(unique))
        }
        "dictionary" => eval_dict(node, source),
        "unary_operator" => eval_signed_number(node, source),
        _ => Err(not_literal(&node)),
    }
}

fn not_literal(node: &Node) -> LiteralError {
    LiteralError::NotLiteral {
        kind: node.kind().to_string(),
    }
}

fn string_value(decoded: StringLiteral) -> LiteralValue {
    match decoded {
        StringLiteral::Text(s) => LiteralValue::Str(s),
        StringLiteral::Bytes(b) => LiteralValue::Bytes(b),
    }
}

fn eval_items(node: Node, source: &str) -> Result<Vec<LiteralValue>, LiteralError> {
    value_children(node)
        .map(|item| eval_literal(item, source))
        .collect()
}

fn eval_dict(node: Node, source: &str) -> Result<LiteralValue, LiteralError> {
    let mut pairs: Vec<(LiteralValue, LiteralValue)> = Vec::new();

    for entry in value_children(node) {
        if entry.kind() != "pair" {
            // `**other` and friends
            return Err(not_literal(&entry));
        }
        let (Some(key_node), Some(value_node)) = (
            entry.child_by_field_name("key"),
            entry.child_by_field_name("value"),
        ) else {
            return Err(not_literal(&entry));
        };
        let key = eval_literal(key_node, source)?;
        check_hashable(&key)?;
        let value = eval_literal(value_node, source)?;

        // Repeated keys keep their first spelling and position and take the last value
        match pairs.iter_mut().find(|(k, _)| hash_eq(k, &key)) {
            Some(existing) => existing.1 = value,
            None => pairs.push((key, value)),
        }
    }

    Ok(LiteralValue::Dict(pairs))
}

/// Set members and dict keys must be hashable: no lists, sets or dicts, even inside tuples
fn check_hashable(value: &LiteralValue) -> Result<(), LiteralError> {
    match value {
        LiteralValue::List(_) | LiteralValue::Set(_) | LiteralValue::Dict(_) => {
            Err(LiteralError::Unhashable {
                kind: value.type_name().to_string(),
            })
        }
        LiteralValue::Tuple(items) => items.iter().try_for_each(check_hashable),
        _ => Ok(()),
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

fn as_number(value: &LiteralValue) -> Option<Number> {
    match value {
        LiteralValue::Bool(b) => Some(Number::Int(i64::from(*b))),
        LiteralValue::Int(i) => Some(Number::Int(*i)),
        LiteralValue::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn int_equals_float(i: i64, f: f64) -> bool {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 && f as i64 == i
}

/// Equality the way Python hashes set members and dict keys, where `1 == 1.0 == True`
fn hash_eq(a: &LiteralValue, b: &LiteralValue) -> bool {
    if let (LiteralValue::Tuple(left), LiteralValue::Tuple(right)) = (a, b) {
        return left.len() == right.len()
            && left.iter().zip(right).all(|(x, y)| hash_eq(x, y));
    }

    match (as_number(a), as_number(b)) {
        (Some(Number::Int(x)), Some(Number::Int(y))) => x == y,
        (Some(Number::Float(x)), Some(Number::Float(y))) => x == y,
        (Some(Number::Int(i)), Some(Number::Float(f)))
        | (Some(Number::Float(f)), Some(Number::Int(i))) => int_equals_float(i, f),
        (None, None) => a == b,
        _ => false,
    }
}

fn eval_signed_number(node: Node, source: &str) -> Result<LiteralValue, LiteralError> {
    let operator = node
        .child_by_field_name("operator")
        .map(|op| node_text(&op, source))
        .unwrap_or_default();
    let negative = match operator {
        "-" => true,
        "+" => false,
        _ => return Err(not_literal(&node)),
    };

    let mut argument = node
        .child_by_field_name("argument")
        .ok_or_else(|| not_literal(&node))?;
    while argument.kind() == "parenthesized_expression" {
        let mut inner = value_children(argument);
        argument = match (inner.next(), inner.next()) {
            (Some(expr), None) => expr,
            _ => return Err(not_literal(&argument)),
        };
    }

    match argument.kind() {
        "integer" => parse_integer(node_text(&argument, source), negative),
        "float" => parse_float(node_text(&argument, source), negative),
        _ => Err(not_literal(&node)),
    }
}

fn is_complex(text: &str) -> bool {
    text.ends_with('j') || text.ends_with('J')
}

pub(crate) fn parse_integer(text: &str, negative: bool) -> Result<LiteralValue, LiteralError> {
    if is_complex(text) {
        return Err(LiteralError::NotLiteral {
            kind: "complex".to_string(),
        });
    }

    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    // Python 2 long suffix
    let cleaned = cleaned.trim_end_matches(['l', 'L']);
    let lower = cleaned.to_ascii_lowercase();

    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if lower.len() > 1 && lower.starts_with('0') && lower.bytes().any(|b| b != b'0') {
        // Python 2 octal (`0755`)
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    let magnitude = u64::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => LiteralError::IntegerOutOfRange {
            text: text.to_string(),
        },
        _ => LiteralError::InvalidNumber {
            text: text.to_string(),
        },
    })?;

    let signed = if negative {
        -(magnitude as i128)
    } else {
        magnitude as i128
    };
    i64::try_from(signed)
        .map(LiteralValue::Int)
        .map_err(|_| LiteralError::IntegerOutOfRange {
            text: text.to_string(),
        })
}

pub(crate) fn parse_float(text: &str, negative: bool) -> Result<LiteralValue, LiteralError> {
    if is_complex(text) {
        return Err(LiteralError::NotLiteral {
            kind: "complex".to_string(),
        });
    }

    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let value: f64 = cleaned.parse().map_err(|_| LiteralError::InvalidNumber {
        text: text.to_string(),
    })?;
    Ok(LiteralValue::Float(if negative { -value } else { value }))
}
