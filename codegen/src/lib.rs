//! Execution back end for the weft toolkit.
//!
//! Takes the graphs that tracing produces and makes them runnable and
//! rewritable: compilation to a slot-allocated instruction list, a
//! node-by-node interpreter with overridable handlers, re-trace
//! transforms built on that interpreter, and [`GraphModule`], the
//! callable that ties a graph to the module owning its state.
//!
//! # Module Organization
//!
//! - [`graph_module`] - The compiled callable and `symbolic_trace`
//! - [`compile`] - Lowering to instructions, execution, code rendering
//! - [`interp`] - The interpreter trait and its stock implementation
//! - [`transform`] - Graph-to-graph rewriting by re-trace
//! - [`error`] - Error types and result handling

pub mod compile;
pub mod error;
pub mod graph_module;
pub mod interp;
pub mod transform;

#[cfg(test)]
pub mod test;

pub use compile::{CompiledGraph, compile, render_code};
pub use error::{Error, Result};
pub use graph_module::{GraphModule, symbolic_trace, symbolic_trace_with};
pub use interp::{Interp, Interpreter};
pub use transform::{Transformer, transform_with};
