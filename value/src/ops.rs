//! Builtin free functions.
//!
//! Every operator a traced computation can record resolves to one of these
//! by name. The table returned by [`builtins`] seeds every function
//! registry; user code extends the registry rather than this module.

use snafu::ensure;

use crate::error::{self, Result};
use crate::{NativeFn, Value};

/// The builtin operator table: `(name, implementation)` pairs.
pub fn builtins() -> &'static [(&'static str, NativeFn)] {
    &[
        ("add", add),
        ("sub", sub),
        ("mul", mul),
        ("div", div),
        ("rem", rem),
        ("neg", neg),
        ("eq", eq),
        ("ne", ne),
        ("lt", lt),
        ("le", le),
        ("gt", gt),
        ("ge", ge),
        ("getitem", getitem),
        ("len", len),
        ("tuple", tuple),
    ]
}

fn expect_arity(name: &'static str, args: &[Value], expected: usize) -> Result<()> {
    ensure!(
        args.len() == expected,
        error::ArityMismatchSnafu { name, expected, got: args.len() }
    );
    Ok(())
}

/// Numeric binary operation with int/float promotion.
fn numeric(
    op: &'static str,
    args: &[Value],
    int_op: fn(i64, i64) -> Result<Value>,
    float_op: fn(f64, f64) -> Result<Value>,
) -> Result<Value> {
    expect_arity(op, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b),
        (Value::Int(a), Value::Float(b)) => float_op(*a as f64, *b),
        (Value::Float(a), Value::Int(b)) => float_op(*a, *b as f64),
        (Value::Float(a), Value::Float(b)) => float_op(*a, *b),
        (lhs, rhs) => error::TypeMismatchSnafu { op, lhs: lhs.kind(), rhs: rhs.kind() }.fail(),
    }
}

/// Numeric comparison with int/float promotion; strings compare lexically.
fn compare(op: &'static str, args: &[Value], cmp: fn(std::cmp::Ordering) -> bool) -> Result<Value> {
    expect_arity(op, args, 2)?;
    let ord = match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (lhs, rhs) => {
            let (a, b) = match (lhs, rhs) {
                (Value::Int(a), Value::Float(b)) => (*a as f64, *b),
                (Value::Float(a), Value::Int(b)) => (*a, *b as f64),
                (Value::Float(a), Value::Float(b)) => (*a, *b),
                _ => return error::TypeMismatchSnafu { op, lhs: lhs.kind(), rhs: rhs.kind() }.fail(),
            };
            a.partial_cmp(&b)
                .ok_or_else(|| error::TypeMismatchSnafu { op, lhs: lhs.kind(), rhs: rhs.kind() }.build())?
        }
    };
    Ok(Value::Bool(cmp(ord)))
}

pub fn add(args: &[Value]) -> Result<Value> {
    expect_arity("add", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::List(out))
        }
        _ => numeric(
            "add",
            args,
            |a, b| Ok(Value::Int(a.wrapping_add(b))),
            |a, b| Ok(Value::Float(a + b)),
        ),
    }
}

pub fn sub(args: &[Value]) -> Result<Value> {
    numeric("sub", args, |a, b| Ok(Value::Int(a.wrapping_sub(b))), |a, b| Ok(Value::Float(a - b)))
}

pub fn mul(args: &[Value]) -> Result<Value> {
    numeric("mul", args, |a, b| Ok(Value::Int(a.wrapping_mul(b))), |a, b| Ok(Value::Float(a * b)))
}

pub fn div(args: &[Value]) -> Result<Value> {
    numeric(
        "div",
        args,
        |a, b| {
            ensure!(b != 0, error::DivisionByZeroSnafu);
            Ok(Value::Int(a.wrapping_div(b)))
        },
        |a, b| Ok(Value::Float(a / b)),
    )
}

pub fn rem(args: &[Value]) -> Result<Value> {
    numeric(
        "rem",
        args,
        |a, b| {
            ensure!(b != 0, error::DivisionByZeroSnafu);
            Ok(Value::Int(a.wrapping_rem(b)))
        },
        |a, b| Ok(Value::Float(a % b)),
    )
}

pub fn neg(args: &[Value]) -> Result<Value> {
    expect_arity("neg", args, 1)?;
    match &args[0] {
        Value::Int(a) => Ok(Value::Int(a.wrapping_neg())),
        Value::Float(a) => Ok(Value::Float(-a)),
        other => error::UnaryTypeMismatchSnafu { op: "neg", operand: other.kind() }.fail(),
    }
}

pub fn eq(args: &[Value]) -> Result<Value> {
    expect_arity("eq", args, 2)?;
    Ok(Value::Bool(loose_eq(&args[0], &args[1])))
}

pub fn ne(args: &[Value]) -> Result<Value> {
    expect_arity("ne", args, 2)?;
    Ok(Value::Bool(!loose_eq(&args[0], &args[1])))
}

/// Equality with int/float promotion; all other kind pairs are unequal.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => lhs == rhs,
    }
}

pub fn lt(args: &[Value]) -> Result<Value> {
    compare("lt", args, std::cmp::Ordering::is_lt)
}

pub fn le(args: &[Value]) -> Result<Value> {
    compare("le", args, std::cmp::Ordering::is_le)
}

pub fn gt(args: &[Value]) -> Result<Value> {
    compare("gt", args, std::cmp::Ordering::is_gt)
}

pub fn ge(args: &[Value]) -> Result<Value> {
    compare("ge", args, std::cmp::Ordering::is_ge)
}

/// Index into a list. Negative indices count from the end.
pub fn getitem(args: &[Value]) -> Result<Value> {
    expect_arity("getitem", args, 2)?;
    let index = args[1].as_int()?;
    match &args[0] {
        Value::List(items) => {
            let resolved = resolve_index(index, items.len())?;
            Ok(items[resolved].clone())
        }
        other => error::UnaryTypeMismatchSnafu { op: "getitem", operand: other.kind() }.fail(),
    }
}

fn resolve_index(index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    ensure!(
        resolved >= 0 && (resolved as usize) < len,
        error::IndexOutOfBoundsSnafu { index, len }
    );
    Ok(resolved as usize)
}

pub fn len(args: &[Value]) -> Result<Value> {
    expect_arity("len", args, 1)?;
    Ok(Value::Int(args[0].length()? as i64))
}

/// Collect all arguments into a list. Used to aggregate multi-value results.
pub fn tuple(args: &[Value]) -> Result<Value> {
    Ok(Value::List(args.to_vec()))
}
