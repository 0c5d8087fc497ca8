use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a runtime script failure. Reports end with `<kind name>: <message>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DivisionByZero,
    UndefinedName,
    UndefinedFunction,
    ArityMismatch,
    TypeMismatch,
    IndexOutOfBounds,
    UnknownField,
    /// Call depth exceeded the interpreter's recursion limit.
    RecursionLimit,
    /// Raised explicitly by the `fail(message)` builtin.
    Explicit,
}

impl ErrorKind {
    pub fn as_name(self) -> &'static str {
        match self {
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::UndefinedName => "UndefinedName",
            ErrorKind::UndefinedFunction => "UndefinedFunction",
            ErrorKind::ArityMismatch => "ArityMismatch",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::IndexOutOfBounds => "IndexOutOfBounds",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::RecursionLimit => "RecursionLimit",
            ErrorKind::Explicit => "Explicit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_name())
    }
}

/// A script runtime value.
///
/// `Record` keys are ordered (`BTreeMap`) so that rendered previews are
/// deterministic, which the report renderer contract requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Truthiness for conditions and short-circuit operators: `false`, `null`,
    /// `0`, empty text, and empty collections are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Record(fields) => !fields.is_empty(),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
