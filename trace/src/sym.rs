//! The symbolic value and its interception surface.
//!
//! A [`Sym`] is either a concrete [`Value`] or a reference to a node in a
//! graph under construction. Every operation dispatches on that split:
//! with at least one symbolic operand a node is recorded and a new
//! symbolic `Sym` comes back; all-concrete operands compute immediately
//! through the operator library.
//!
//! Capability surface instead of ambient overloading: symbolic-capable
//! code calls the named fallible methods below (`add`, `lt`, `getitem`,
//! `call_method`, ...), which the tracer can intercept uniformly.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use weft_ir::{Arg, NodeId};
use weft_value::Value;

use crate::error::{self, Result};
use crate::registry;
use crate::tracer::{Recorder, active_recorder};

/// A symbolic or concrete value flowing through a traced computation.
#[derive(Clone)]
pub struct Sym {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Concrete(Value),
    Traced { node: NodeId, rec: Rc<RefCell<Recorder>> },
}

impl std::fmt::Debug for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep this non-recursive: a traced Sym prints its node id only.
        match &self.repr {
            Repr::Concrete(v) => write!(f, "Sym({v})"),
            Repr::Traced { node, .. } => write!(f, "Sym(traced {node:?})"),
        }
    }
}

impl Sym {
    /// A concrete value.
    pub fn lit(v: impl Into<Value>) -> Self {
        Self { repr: Repr::Concrete(v.into()) }
    }

    pub(crate) fn traced(node: NodeId, rec: Rc<RefCell<Recorder>>) -> Self {
        Self { repr: Repr::Traced { node, rec } }
    }

    /// The concrete value, if this Sym is not symbolic.
    pub fn value(&self) -> Option<&Value> {
        match &self.repr {
            Repr::Concrete(v) => Some(v),
            Repr::Traced { .. } => None,
        }
    }

    /// The recorded node, if this Sym is symbolic.
    pub fn node(&self) -> Option<NodeId> {
        match &self.repr {
            Repr::Traced { node, .. } => Some(*node),
            Repr::Concrete(_) => None,
        }
    }

    pub fn is_traced(&self) -> bool {
        matches!(self.repr, Repr::Traced { .. })
    }

    pub(crate) fn recorder(&self) -> Option<Rc<RefCell<Recorder>>> {
        match &self.repr {
            Repr::Traced { rec, .. } => Some(rec.clone()),
            Repr::Concrete(_) => None,
        }
    }

    /// Convert to an argument reference for graph insertion.
    pub(crate) fn to_arg(&self) -> Arg {
        match &self.repr {
            Repr::Traced { node, .. } => Arg::Node(*node),
            Repr::Concrete(v) => Arg::Lit(v.clone()),
        }
    }

    fn display_name(&self) -> String {
        match &self.repr {
            Repr::Concrete(v) => v.to_string(),
            Repr::Traced { node, rec } => rec
                .borrow()
                .graph
                .get(*node)
                .map(|n| n.name().to_owned())
                .unwrap_or_else(|| format!("{node:?}")),
        }
    }

    // ===== Coercions that tracing must refuse =====

    /// Coerce to a boolean for use in a conditional.
    ///
    /// # Errors
    ///
    /// [`Error::DataDependentBranch`](crate::Error::DataDependentBranch)
    /// for symbolic values: the branch outcome would depend on runtime
    /// data the trace cannot represent.
    pub fn as_bool(&self) -> Result<bool> {
        match &self.repr {
            Repr::Concrete(v) => Ok(v.as_bool()?),
            Repr::Traced { .. } => {
                error::DataDependentBranchSnafu { name: self.display_name() }.fail()
            }
        }
    }

    /// Query the length of this value.
    ///
    /// Concrete values answer directly. Symbolic values are refused
    /// unless `len` has been registered with [`wrap`](crate::wrap), in
    /// which case an opaque `len` call is recorded instead.
    pub fn length(&self) -> Result<Sym> {
        match &self.repr {
            Repr::Concrete(v) => Ok(Sym::lit(v.length()? as i64)),
            Repr::Traced { rec, .. } => {
                if rec.borrow().registry.is_wrapped("len") {
                    Sym::apply_function("len", std::slice::from_ref(self), &BTreeMap::new())
                } else {
                    error::DataDependentLenSnafu { name: self.display_name() }.fail()
                }
            }
        }
    }

    // ===== Call dispatch =====

    /// Apply a free function to symbolic or concrete arguments.
    ///
    /// With a symbolic operand the call is recorded; with all-concrete
    /// operands it is recorded only when `name` is wrapped and a trace is
    /// active, and executed natively otherwise. A native call made
    /// mid-trace bakes its single result into the graph as a constant --
    /// for nondeterministic functions that freezes one draw, a known
    /// hazard of deterministic embedding; wrap such functions instead.
    pub(crate) fn apply_function(
        name: &str,
        args: &[Sym],
        kwargs: &BTreeMap<String, Sym>,
    ) -> Result<Sym> {
        let operands = || args.iter().chain(kwargs.values());
        if let Some(rec) = shared_recorder(operands())? {
            let id = {
                let mut r = rec.borrow_mut();
                r.graph.call_function(name, to_args(args), to_kwargs(kwargs))?
            };
            return Ok(Sym::traced(id, rec));
        }

        // All-concrete arguments: wrapped names still record while a
        // trace is active, everything else executes natively.
        if let Some(rec) = active_recorder() {
            if rec.borrow().registry.is_wrapped(name) {
                let id = {
                    let mut r = rec.borrow_mut();
                    r.graph.call_function(name, to_args(args), to_kwargs(kwargs))?
                };
                return Ok(Sym::traced(id, rec));
            }
        }

        snafu::ensure!(kwargs.is_empty(), error::FunctionKwargsSnafu { name });
        let f = lookup(name)?;
        let vals: Vec<Value> = args.iter().filter_map(|s| s.value().cloned()).collect();
        Ok(Sym::lit(f(&vals)?))
    }

    /// Invoke a method on this value, recording when anything is symbolic.
    pub fn call_method(&self, name: &str, args: &[Sym]) -> Result<Sym> {
        self.call_method_kw(name, args, &BTreeMap::new())
    }

    /// Invoke a method with keyword arguments.
    pub fn call_method_kw(
        &self,
        name: &str,
        args: &[Sym],
        kwargs: &BTreeMap<String, Sym>,
    ) -> Result<Sym> {
        let operands = || std::iter::once(self).chain(args).chain(kwargs.values());
        if let Some(rec) = shared_recorder(operands())? {
            let mut all = Vec::with_capacity(args.len() + 1);
            all.push(self.to_arg());
            all.extend(args.iter().map(Sym::to_arg));
            let id = {
                let mut r = rec.borrow_mut();
                r.graph.call_method(name, all, to_kwargs(kwargs))?
            };
            return Ok(Sym::traced(id, rec));
        }

        let receiver = self.value().cloned().unwrap_or(Value::Unit);
        let vals: Vec<Value> = args.iter().filter_map(|s| s.value().cloned()).collect();
        let kw: weft_value::Kwargs = kwargs
            .iter()
            .filter_map(|(k, s)| s.value().cloned().map(|v| (k.clone(), v)))
            .collect();
        Ok(Sym::lit(receiver.call_method(name, &vals, &kw)?))
    }

    /// Index into this value.
    pub fn getitem(&self, index: &Sym) -> Result<Sym> {
        Sym::apply_function("getitem", &[self.clone(), index.clone()], &BTreeMap::new())
    }

    /// Negate this value.
    pub fn neg(&self) -> Result<Sym> {
        Sym::apply_function("neg", std::slice::from_ref(self), &BTreeMap::new())
    }
}

macro_rules! sym_binary_ops {
    ($(($method:ident, $name:literal, $desc:expr)),+ $(,)?) => {
        impl Sym {
            $(
                #[doc = concat!($desc, " Records a `", $name, "` node when either operand is symbolic.")]
                pub fn $method(&self, rhs: &Sym) -> Result<Sym> {
                    Sym::apply_function($name, &[self.clone(), rhs.clone()], &BTreeMap::new())
                }
            )+
        }
    };
}

sym_binary_ops!(
    (add, "add", "Addition of two values."),
    (sub, "sub", "Subtraction of two values."),
    (mul, "mul", "Multiplication of two values."),
    (div, "div", "Division of two values."),
    (rem, "rem", "Remainder of two values."),
    (eq_, "eq", "Equality comparison."),
    (ne_, "ne", "Inequality comparison."),
    (lt, "lt", "Less-than comparison."),
    (le, "le", "Less-or-equal comparison."),
    (gt, "gt", "Greater-than comparison."),
    (ge, "ge", "Greater-or-equal comparison."),
);

/// Call a free function by name on symbolic or concrete arguments.
///
/// This is the call surface for functions registered with
/// [`wrap`](crate::wrap): during a trace the call is recorded as an
/// opaque `call_function` node; outside a trace it executes natively.
pub fn call(name: &str, args: &[Sym]) -> Result<Sym> {
    Sym::apply_function(name, args, &BTreeMap::new())
}

/// The single recorder shared by all symbolic operands, if any.
///
/// # Errors
///
/// [`Error::RecorderMismatch`](crate::Error::RecorderMismatch) when
/// symbolic operands belong to different traces.
fn shared_recorder<'a>(
    operands: impl Iterator<Item = &'a Sym>,
) -> Result<Option<Rc<RefCell<Recorder>>>> {
    let mut found: Option<Rc<RefCell<Recorder>>> = None;
    for sym in operands {
        if let Some(rec) = sym.recorder() {
            match &found {
                Some(existing) if !Rc::ptr_eq(existing, &rec) => {
                    return error::RecorderMismatchSnafu.fail();
                }
                Some(_) => {}
                None => found = Some(rec),
            }
        }
    }
    Ok(found)
}

fn to_args(args: &[Sym]) -> Vec<Arg> {
    args.iter().map(Sym::to_arg).collect()
}

fn to_kwargs(kwargs: &BTreeMap<String, Sym>) -> BTreeMap<String, Arg> {
    kwargs.iter().map(|(k, s)| (k.clone(), s.to_arg())).collect()
}

fn lookup(name: &str) -> Result<weft_value::NativeFn> {
    let from_active = active_recorder().and_then(|rec| rec.borrow().registry.get(name));
    from_active
        .or_else(|| registry::global_get(name))
        .ok_or_else(|| error::UnknownFunctionSnafu { name }.build())
}
