//! Graph-to-graph rewriting by re-trace.
//!
//! A transform runs an [`Interpreter`] over an existing graph module
//! inside a fresh trace session: every handler result flows through
//! symbolic values, so the operations the interpreter performs are
//! recorded into a new graph. With the stock handlers the copy is
//! structurally equivalent to the source; custom interpreters change
//! behavior node by node and get the rewritten graph for free.

use weft_trace::{ParamSpec, TraceSession, Tracer};

use crate::error::Result;
use crate::graph_module::GraphModule;
use crate::interp::{Interp, Interpreter};

/// Re-trace `gm` through `interp`, producing a new graph module over the
/// same root and registry. The source is untouched.
pub fn transform_with<I: Interpreter>(gm: &GraphModule, interp: &mut I) -> Result<GraphModule> {
    let tracer = Tracer::with_registry(gm.registry().clone());
    let mut session = TraceSession::begin(&tracer);

    let mut args = Vec::new();
    for &id in &gm.graph().placeholders() {
        let node = &gm.graph()[id];
        let spec = ParamSpec { name: node.name().to_owned(), ty: node.ty() };
        args.push(session.placeholder(&spec)?);
    }

    let mut cx = session.ctx(gm.root().as_ref());
    let out = interp.run(&mut cx, gm.graph(), &args)?;
    drop(cx);
    let graph = session.finish(out)?;
    GraphModule::new(gm.root().clone(), graph, gm.registry().clone())
}

/// The identity transform: re-trace through the stock interpreter.
pub struct Transformer;

impl Transformer {
    pub fn transform(gm: &GraphModule) -> Result<GraphModule> {
        let mut interp = Interp::new(gm.registry().clone());
        transform_with(gm, &mut interp)
    }
}
