//! Raw string to typed value coercion
//!
//! Each [`ValueKind`] owns its parsing rule. The binder only calls
//! [`ValueKind::coerce`], so a new primitive kind is added here and in the
//! slot impls of `descriptor.rs` without touching the binding loop.

use std::fmt;

/// Default separator for list kinds
pub const DEFAULT_LIST_DELIMITER: char = ',';

/// Target kind of a bound field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
    List { delimiter: char },
}

/// A coerced value, before it is moved into its storage slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    List(Vec<String>),
}

impl Value {
    /// Whether the value binds to nothing (empty string or empty list)
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Integer(_) | Value::Boolean(_) => false,
        }
    }
}

impl ValueKind {
    /// Short human name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::List { .. } => "list",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ValueKind::List { .. })
    }

    /// Convert a raw environment value.
    ///
    /// On failure the returned error carries the kind name; the caller
    /// attaches the key.
    pub fn coerce(&self, raw: &str) -> Result<Value, CoercionError> {
        let value = match self {
            ValueKind::String => Some(Value::String(raw.to_string())),
            ValueKind::Integer => raw.parse::<i64>().ok().map(Value::Integer),
            ValueKind::Boolean => parse_boolean(raw).map(Value::Boolean),
            ValueKind::List { delimiter } => Some(Value::List(split_list(raw, *delimiter))),
        };
        value.ok_or(CoercionError {
            expected: self.name(),
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::List { delimiter } => write!(f, "list separated by {:?}", delimiter),
            other => f.write_str(other.name()),
        }
    }
}

/// A raw value that does not fit its declared kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionError {
    pub expected: &'static str,
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split on `delimiter`, trim each element and drop the empty ones
pub fn split_list(raw: &str, delimiter: char) -> Vec<String> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
