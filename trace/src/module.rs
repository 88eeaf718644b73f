//! The traced callable-object abstraction.
//!
//! A [`Module`] is anything with a `forward` computation, optional stored
//! state (attributes) and optional nested callables (children). `forward`
//! is written against the [`Sym`] capability surface and receives a
//! [`Ctx`], the interception point for attribute reads and child calls:
//! under tracing those record `get_attr` / `call_module` nodes, under
//! evaluation they resolve concretely. The same `forward` therefore
//! serves both execution and capture.

use std::cell::RefCell;
use std::rc::Rc;

use snafu::ResultExt;
use weft_value::{Value, ValueKind};

use crate::error::{self, Result};
use crate::sym::Sym;
use crate::tracer::{Recorder, Tracer};

/// Name and optional annotation of one formal parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: Option<ValueKind>,
}

impl ParamSpec {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), ty: None }
    }

    pub fn with_ty(name: &str, ty: ValueKind) -> Self {
        Self { name: name.to_owned(), ty: Some(ty) }
    }
}

/// A callable object with stored state and nested callables.
pub trait Module {
    /// The computation. Attribute reads and child calls must go through
    /// `cx` so that tracing can intercept them.
    fn forward(&self, cx: &mut Ctx<'_>, args: &[Sym]) -> Result<Sym>;

    /// Stored external state by simple name.
    fn attr(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Nested callable by simple name.
    fn child(&self, _name: &str) -> Option<&dyn Module> {
        None
    }

    /// All nested callables, for enumeration.
    fn children(&self) -> Vec<(&str, &dyn Module)> {
        Vec::new()
    }

    /// Default leaf classification: leaf modules are recorded as one
    /// opaque `call_module` node, non-leaf modules are traced through.
    /// Container modules override this to `false`.
    fn is_leaf(&self) -> bool {
        true
    }

    /// Formal parameters of `forward`, used by `symbolic_trace`.
    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("x")]
    }
}

/// Resolve a dot-separated attribute path: children for every segment but
/// the last, the attribute itself last.
pub fn resolve_attr(root: &dyn Module, path: &str) -> Option<Value> {
    let mut module = root;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            return module.attr(part);
        }
        module = module.child(part)?;
    }
    None
}

/// Resolve a dot-separated path of nested callables.
pub fn resolve_child<'a>(root: &'a dyn Module, path: &str) -> Option<&'a dyn Module> {
    let mut module = root;
    for part in path.split('.') {
        module = module.child(part)?;
    }
    Some(module)
}

enum Mode<'a> {
    Trace { rec: Rc<RefCell<Recorder>>, tracer: &'a Tracer },
    Eval,
}

/// Execution context threaded through [`Module::forward`].
///
/// Carries the current module, its qualified path from the trace root,
/// and the mode: tracing (operations record nodes) or evaluation
/// (operations resolve concretely).
pub struct Ctx<'a> {
    module: &'a dyn Module,
    path: String,
    mode: Mode<'a>,
}

impl<'a> Ctx<'a> {
    /// A concrete-evaluation context rooted at `module`.
    pub fn eval(module: &'a dyn Module) -> Self {
        Self { module, path: String::new(), mode: Mode::Eval }
    }

    pub(crate) fn trace(
        module: &'a dyn Module,
        rec: Rc<RefCell<Recorder>>,
        tracer: &'a Tracer,
        path: String,
    ) -> Self {
        Self { module, path, mode: Mode::Trace { rec, tracer } }
    }

    pub fn module(&self) -> &dyn Module {
        self.module
    }

    /// Qualified path of the current module; empty at the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn qualify(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    /// Read stored state. Dotted names walk nested modules.
    ///
    /// Under tracing this records a `get_attr` node with the qualified
    /// path; under evaluation it returns the stored value.
    pub fn attr(&mut self, name: &str) -> Result<Sym> {
        let value = resolve_attr(self.module, name)
            .ok_or_else(|| error::UnknownAttributeSnafu { path: self.qualify(name) }.build())?;
        match &self.mode {
            Mode::Trace { rec, .. } => {
                let id = rec.borrow_mut().graph.get_attr(&self.qualify(name))?;
                Ok(Sym::traced(id, rec.clone()))
            }
            Mode::Eval => Ok(Sym::lit(value)),
        }
    }

    /// Call a nested callable. Dotted names walk nested modules.
    ///
    /// Under tracing, a leaf child becomes one opaque `call_module` node;
    /// a non-leaf child is traced through, inlining its operations into
    /// the same graph. Errors raised inside the child propagate with the
    /// qualified call path attached.
    pub fn call_child(&mut self, name: &str, args: &[Sym]) -> Result<Sym> {
        let child = resolve_child(self.module, name)
            .ok_or_else(|| error::UnknownChildSnafu { path: self.qualify(name) }.build())?;
        let full = self.qualify(name);
        match &self.mode {
            Mode::Trace { rec, tracer } => {
                if tracer.is_leaf(child, &full) {
                    let call_args = args.iter().map(Sym::to_arg).collect();
                    let id = rec.borrow_mut().graph.call_module(&full, call_args, Default::default())?;
                    Ok(Sym::traced(id, rec.clone()))
                } else {
                    tracing::debug!(path = %full, "tracing through nested module");
                    let mut cx = Ctx::trace(child, rec.clone(), *tracer, full.clone());
                    child.forward(&mut cx, args).context(error::LeafModuleSnafu { path: full })
                }
            }
            Mode::Eval => {
                let mut cx = Ctx { module: child, path: full.clone(), mode: Mode::Eval };
                child.forward(&mut cx, args).context(error::LeafModuleSnafu { path: full })
            }
        }
    }
}
