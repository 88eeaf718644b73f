//! Builtin method dispatch on [`Value`].
//!
//! Methods are the keyword-argument-capable half of the call surface; free
//! functions stay positional. The method set is closed: unknown names are
//! an error, never a silent no-op.

use snafu::ensure;

use crate::error::{self, Result};
use crate::{Kwargs, Value};

impl Value {
    /// Invoke a builtin method on this value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`](crate::Error::UnknownMethod) if the
    /// receiver's kind does not define `name`, and
    /// [`Error::UnknownKeyword`](crate::Error::UnknownKeyword) for
    /// unrecognized keyword arguments.
    pub fn call_method(&self, name: &str, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        match name {
            "abs" => {
                reject_kwargs(name, kwargs)?;
                expect_method_arity(name, args, 0)?;
                match self {
                    Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    other => error::UnknownMethodSnafu { name, kind: other.kind() }.fail(),
                }
            }
            "clamp" => {
                expect_method_arity(name, args, 0)?;
                let mut lo = None;
                let mut hi = None;
                for (key, value) in kwargs {
                    match key.as_str() {
                        "min" => lo = Some(value.as_float()?),
                        "max" => hi = Some(value.as_float()?),
                        other => return error::UnknownKeywordSnafu { name, keyword: other }.fail(),
                    }
                }
                let mut v = self.as_float()?;
                if let Some(lo) = lo {
                    v = v.max(lo);
                }
                if let Some(hi) = hi {
                    v = v.min(hi);
                }
                // Integer receivers stay integers when the bounds allow it.
                match self {
                    Value::Int(_) if v.fract() == 0.0 => Ok(Value::Int(v as i64)),
                    _ => Ok(Value::Float(v)),
                }
            }
            "push" => {
                reject_kwargs(name, kwargs)?;
                expect_method_arity(name, args, 1)?;
                match self {
                    Value::List(items) => {
                        let mut items = items.clone();
                        items.push(args[0].clone());
                        Ok(Value::List(items))
                    }
                    other => error::UnknownMethodSnafu { name, kind: other.kind() }.fail(),
                }
            }
            "get" => {
                reject_kwargs(name, kwargs)?;
                expect_method_arity(name, args, 2)?;
                let index = args[0].as_int()?;
                match self {
                    Value::List(items) => {
                        let resolved = if index < 0 { index + items.len() as i64 } else { index };
                        if resolved >= 0 && (resolved as usize) < items.len() {
                            Ok(items[resolved as usize].clone())
                        } else {
                            Ok(args[1].clone())
                        }
                    }
                    other => error::UnknownMethodSnafu { name, kind: other.kind() }.fail(),
                }
            }
            other => error::UnknownMethodSnafu { name: other, kind: self.kind() }.fail(),
        }
    }
}

fn expect_method_arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    ensure!(
        args.len() == expected,
        error::ArityMismatchSnafu { name, expected, got: args.len() }
    );
    Ok(())
}

fn reject_kwargs(name: &str, kwargs: &Kwargs) -> Result<()> {
    if let Some(key) = kwargs.keys().next() {
        return error::UnknownKeywordSnafu { name, keyword: key.clone() }.fail();
    }
    Ok(())
}
