//! A graph paired with the module that owns its state, packaged as a
//! callable.
//!
//! [`GraphModule`] binds three things: the root module (attributes and
//! nested callables resolve against it), the graph, and the compiled
//! form plus rendered code derived from the graph. The derived pair is
//! rebuilt only by [`recompile`](GraphModule::recompile); graph edits in
//! between leave it stale on purpose, matching the edit-then-recompile
//! workflow of graph surgery.

use std::sync::Arc;

use weft_ir::Graph;
use weft_trace::{Ctx, Module, ParamSpec, Registry, Sym, Tracer, registry};
use weft_value::Value;

use crate::compile::{CompiledGraph, compile, render_code};
use crate::error::Result;
use crate::interp::{Interp, Interpreter};

pub struct GraphModule {
    root: Arc<dyn Module>,
    graph: Graph,
    registry: Arc<Registry>,
    compiled: CompiledGraph,
    code: String,
}

impl GraphModule {
    /// Package `graph` with its owning module, compiling it immediately.
    pub fn new(root: Arc<dyn Module>, graph: Graph, registry: Arc<Registry>) -> Result<Self> {
        let compiled = compile(&graph, &registry)?;
        let code = render_code(&graph)?;
        Ok(Self { root, graph, registry, compiled, code })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access for graph surgery. The compiled form and code text
    /// stay stale until [`recompile`](Self::recompile).
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Rebuild the compiled form and code text from the current graph.
    pub fn recompile(&mut self) -> Result<()> {
        self.compiled = compile(&self.graph, &self.registry)?;
        self.code = render_code(&self.graph)?;
        tracing::debug!(nodes = self.graph.len(), "graph module recompiled");
        Ok(())
    }

    /// Rendered pseudocode of the graph as of the last compile.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The rendered pseudocode, under the name graph dumps go by.
    pub fn print_readable(&self) -> &str {
        self.code()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn root(&self) -> &Arc<dyn Module> {
        &self.root
    }

    /// Run the compiled form on concrete arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.compiled.execute(self.root.as_ref(), args)
    }

    /// Run the graph node by node instead of through the compiled form.
    /// Follows the current graph, stale compile or not.
    pub fn interpret(&self, args: &[Sym]) -> Result<Sym> {
        let mut cx = Ctx::eval(self.root.as_ref());
        Interp::new(self.registry.clone()).run(&mut cx, &self.graph, args)
    }
}

impl Module for GraphModule {
    /// Forward by interpretation. Under an active trace the interpreter
    /// re-records the graph's operations, which is what makes a traced
    /// graph module re-traceable.
    fn forward(&self, cx: &mut Ctx<'_>, args: &[Sym]) -> weft_trace::Result<Sym> {
        Interp::new(self.registry.clone())
            .run(cx, &self.graph, args)
            .map_err(|e| weft_trace::Error::Forward { source: Box::new(e) })
    }

    fn attr(&self, name: &str) -> Option<Value> {
        self.root.attr(name)
    }

    fn child(&self, name: &str) -> Option<&dyn Module> {
        self.root.child(name)
    }

    fn children(&self) -> Vec<(&str, &dyn Module)> {
        self.root.children()
    }

    fn is_leaf(&self) -> bool {
        false
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        self.graph
            .placeholders()
            .iter()
            .map(|&id| {
                let node = &self.graph[id];
                ParamSpec { name: node.name().to_owned(), ty: node.ty() }
            })
            .collect()
    }
}

impl std::fmt::Debug for GraphModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphModule").field("graph", &self.graph).finish_non_exhaustive()
    }
}

/// Trace `root` with a snapshot of the process-wide registry and package
/// the result. Placeholders come from the module's own
/// [`param_specs`](Module::param_specs).
pub fn symbolic_trace(root: Arc<dyn Module>) -> Result<GraphModule> {
    let reg = Arc::new(registry::global_snapshot());
    let tracer = Tracer::with_registry(reg.clone());
    let graph = tracer.trace(root.as_ref(), &root.param_specs())?;
    GraphModule::new(root, graph, reg)
}

/// [`symbolic_trace`] with an explicit registry instead of the global
/// snapshot.
pub fn symbolic_trace_with(root: Arc<dyn Module>, reg: Arc<Registry>) -> Result<GraphModule> {
    let tracer = Tracer::with_registry(reg.clone());
    let graph = tracer.trace(root.as_ref(), &root.param_specs())?;
    GraphModule::new(root, graph, reg)
}
