//! Dynamic runtime value model for the weft toolkit.
//!
//! This crate defines the concrete values that traced computations operate
//! on, together with the builtin operator library that call targets resolve
//! against.
//!
//! # Module Organization
//!
//! - [`ops`] - Builtin free functions (arithmetic, comparison, indexing)
//! - [`methods`] - Builtin method dispatch on [`Value`]
//! - [`error`] - Error types and result handling

pub mod error;
pub mod methods;
pub mod ops;


use std::collections::BTreeMap;

pub use error::{Error, Result};

/// Shape of every free function callable through the operator library.
///
/// Arguments are positional; functions that need keyword arguments are
/// modelled as methods instead (see [`Value::call_method`]).
pub type NativeFn = fn(&[Value]) -> Result<Value>;

/// Keyword arguments for method dispatch, in deterministic order.
pub type Kwargs = BTreeMap<String, Value>;

/// A concrete runtime value.
///
/// `Value` is the closed set of data a traced computation can consume or
/// produce. Aggregates are represented with [`Value::List`]; there is no
/// user-extensible variant, which keeps the codegen and interpreter
/// dispatch exhaustively matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The empty value, produced by computations with no result.
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

/// The kind of a [`Value`], used as the optional node type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl Value {
    /// Get the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Unit => ValueKind::Unit,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Extract a boolean, failing on any other kind.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => error::KindMismatchSnafu { expected: ValueKind::Bool, actual: other.kind() }.fail(),
        }
    }

    /// Extract an integer, failing on any other kind.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => error::KindMismatchSnafu { expected: ValueKind::Int, actual: other.kind() }.fail(),
        }
    }

    /// Extract a float, promoting integers.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => error::KindMismatchSnafu { expected: ValueKind::Float, actual: other.kind() }.fail(),
        }
    }

    /// Length of a list or string.
    pub fn length(&self) -> Result<usize> {
        match self {
            Value::List(items) => Ok(items.len()),
            Value::Str(s) => Ok(s.len()),
            other => error::NoLengthSnafu { kind: other.kind() }.fail(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => {
                // Keep a trailing ".0" so integral floats stay recognizable
                // in rendered code and graph dumps.
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}
