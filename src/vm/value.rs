//! Runtime value representation for IPPcode19
//!
//! `Value` is the tagged cell every variable slot, operand and data-stack
//! entry holds. `Uninitialized` is kept as its own variant (rather than
//! wrapping `Value` in an `Option`) so that `TYPE` can report `""` for it
//! without special-casing a missing slot differently from a present-but-
//! unassigned one.

use std::fmt;

/// A dynamically-typed IPPcode19 value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer, at least 64 bits wide.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Unicode text. The empty string is a valid value.
    String(String),
    /// The sole inhabitant of type `nil`.
    Nil,
    /// A declared but never-assigned variable slot.
    Uninitialized,
}

impl Value {
    /// The type tag exposed by the `TYPE` opcode.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Nil => "nil",
            Value::Uninitialized => "",
        }
    }

    /// Whether two values are of the same "comparable" family (`Int`,
    /// `Bool` or `String`), i.e. not `Nil` and not `Uninitialized`.
    pub fn is_orderable(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Bool(_) | Value::String(_))
    }
}

/// Renders a value the way `WRITE` does: no trailing newline, `Bool` as
/// `true`/`false`, `Nil` as the empty string, `Int` as a plain decimal.
impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(true) => write!(f, "true"),
            Value::Bool(false) => write!(f, "false"),
            Value::String(s) => write!(f, "{s}"),
            Value::Nil => write!(f, ""),
            Value::Uninitialized => write!(f, ""),
        }
    }
}

/// Partial order used by `LT`/`GT`. `false < true`; strings compare by
/// Unicode code point. Returns `None` for mismatched or non-orderable
/// pairs (including any pair involving `Nil`).
pub fn compare(
    a: &Value,
    b: &Value,
) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality used by `EQ`/`JUMPIFEQ`/`JUMPIFNEQ`. `Nil` equals only
/// `Nil`. Returns `None` if the operand types are mismatched and neither
/// side is `Nil` (a type error at the call site).
pub fn equal(
    a: &Value,
    b: &Value,
) -> Option<bool> {
    match (a, b) {
        (Value::Nil, Value::Nil) => Some(true),
        (Value::Nil, other) | (other, Value::Nil) => {
            if matches!(other, Value::Uninitialized) {
                None
            } else {
                Some(false)
            }
        }
        (Value::Int(x), Value::Int(y)) => Some(x == y),
        (Value::Bool(x), Value::Bool(y)) => Some(x == y),
        (Value::String(x), Value::String(y)) => Some(x == y),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_matches_catalogue() {
        assert_eq!(Value::Int(5).type_name(), "int");
        assert_eq!(Value::Bool(false).type_name(), "bool");
        assert_eq!(Value::String("x".into()).type_name(), "string");
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Uninitialized.type_name(), "");
    }

    #[test]
    fn bool_ordering_is_false_before_true() {
        assert_eq!(
            compare(&Value::Bool(false), &Value::Bool(true)),
            Some(std::cmp::Ordering::Less)
        );
    }

    #[test]
    fn nil_equals_only_nil() {
        assert_eq!(equal(&Value::Nil, &Value::Nil), Some(true));
        assert_eq!(equal(&Value::Nil, &Value::Int(0)), Some(false));
        assert_eq!(equal(&Value::Int(1), &Value::Bool(true)), None);
    }

    #[test]
    fn display_matches_write_contract() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(Value::Int(-5).to_string(), "-5");
    }
}
