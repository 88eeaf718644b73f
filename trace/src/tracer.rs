//! Symbolic tracing driver.
//!
//! A [`Tracer`] runs a module's `forward` on symbolic arguments and
//! collects the operations it performs into a [`Graph`]. The recording
//! state lives in a [`Recorder`] shared by every [`Sym`] of the trace;
//! a thread-local stack of active recorders lets wrapped free functions
//! record themselves even when called with fully concrete arguments.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use snafu::ensure;
use weft_ir::Graph;

use crate::error::{self, Result};
use crate::module::{Ctx, Module, ParamSpec};
use crate::registry::{self, Registry};
use crate::sym::Sym;

/// Mutable state of one in-progress trace: the graph under construction
/// and the function registry the trace resolves names against.
pub(crate) struct Recorder {
    pub(crate) graph: Graph,
    pub(crate) registry: Arc<Registry>,
}

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<RefCell<Recorder>>>> = const { RefCell::new(Vec::new()) };
}

/// Innermost trace active on this thread, if any.
pub(crate) fn active_recorder() -> Option<Rc<RefCell<Recorder>>> {
    ACTIVE.with(|stack| stack.borrow().last().cloned())
}

struct ActiveGuard;

impl ActiveGuard {
    fn push(rec: Rc<RefCell<Recorder>>) -> Self {
        ACTIVE.with(|stack| stack.borrow_mut().push(rec));
        Self
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Turns a [`Module`]'s forward pass into a [`Graph`].
///
/// Construction snapshots the global function registry, so names wrapped
/// after a tracer is built do not affect it. A custom leaf predicate can
/// override which nested modules are recorded opaquely.
pub struct Tracer {
    registry: Arc<Registry>,
    leaf: Box<dyn Fn(&dyn Module, &str) -> bool>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(registry::global_snapshot()))
    }

    /// A tracer resolving names against `registry` instead of the global
    /// one. Tests use this for isolation.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry, leaf: Box::new(|m, _| m.is_leaf()) }
    }

    /// Override leaf classification. The predicate receives the candidate
    /// module and its qualified path from the trace root.
    pub fn with_leaf_predicate(
        mut self,
        leaf: impl Fn(&dyn Module, &str) -> bool + 'static,
    ) -> Self {
        self.leaf = Box::new(leaf);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn is_leaf(&self, module: &dyn Module, path: &str) -> bool {
        (self.leaf)(module, path)
    }

    /// Trace `module.forward` with one symbolic placeholder per entry of
    /// `params` and return the captured graph.
    pub fn trace(&self, module: &dyn Module, params: &[ParamSpec]) -> Result<Graph> {
        let mut session = TraceSession::begin(self);
        let mut args = Vec::with_capacity(params.len());
        for spec in params {
            args.push(session.placeholder(spec)?);
        }
        let mut cx = session.ctx(module);
        let out = module.forward(&mut cx, &args)?;
        let graph = session.finish(out)?;
        tracing::debug!(nodes = graph.len(), "trace complete");
        Ok(graph)
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

/// One trace in progress. Lower-level than [`Tracer::trace`]: callers
/// create placeholders and drive forward passes themselves, which is how
/// graph-to-graph transforms re-trace.
pub struct TraceSession<'t> {
    tracer: &'t Tracer,
    rec: Rc<RefCell<Recorder>>,
    _guard: ActiveGuard,
}

impl<'t> TraceSession<'t> {
    pub fn begin(tracer: &'t Tracer) -> Self {
        let rec = Rc::new(RefCell::new(Recorder {
            graph: Graph::new(),
            registry: tracer.registry.clone(),
        }));
        let _guard = ActiveGuard::push(rec.clone());
        Self { tracer, rec, _guard }
    }

    /// Record a placeholder node and return its symbolic handle.
    pub fn placeholder(&mut self, spec: &ParamSpec) -> Result<Sym> {
        let id = self.rec.borrow_mut().graph.placeholder(&spec.name, spec.ty)?;
        Ok(Sym::traced(id, self.rec.clone()))
    }

    /// A tracing context rooted at `module`.
    pub fn ctx<'m>(&self, module: &'m dyn Module) -> Ctx<'m>
    where
        't: 'm,
    {
        Ctx::trace(module, self.rec.clone(), self.tracer, String::new())
    }

    /// Record the output node and take the finished graph.
    pub fn finish(self, out: Sym) -> Result<Graph> {
        if let Some(rec) = out.recorder() {
            ensure!(Rc::ptr_eq(&rec, &self.rec), error::RecorderMismatchSnafu);
        }
        let mut rec = self.rec.borrow_mut();
        rec.graph.output(out.to_arg())?;
        Ok(std::mem::take(&mut rec.graph))
    }
}
