//! Symbolic tracing front end for the weft toolkit.
//!
//! Tracing runs a [`Module`]'s `forward` with [`Sym`] proxies substituted
//! for real arguments; every operation performed on a proxy appends a node
//! to the graph under construction. The result is a populated
//! [`Graph`](weft_ir::Graph) capturing the computation's data flow.
//!
//! # Module Organization
//!
//! - [`sym`] - The symbolic value and its interception surface
//! - [`module`] - The traced callable-object abstraction and `Ctx`
//! - [`tracer`] - Trace driver, sessions, the active-trace slot
//! - [`registry`] - Function registry and the process-wide `wrap` state
//! - [`error`] - Error types and result handling

pub mod error;
pub mod module;
pub mod registry;
pub mod sym;
pub mod tracer;

#[cfg(test)]
pub mod test;

pub use error::{Error, Result};
pub use module::{Ctx, Module, ParamSpec, resolve_attr, resolve_child};
pub use registry::{Registry, wrap};
pub use sym::{Sym, call};
pub use tracer::{TraceSession, Tracer};
