//! Graph intermediate representation for the weft toolkit.
//!
//! This crate defines the IR that symbolic tracing produces and that every
//! back end consumes: an ordered, arena-owned collection of [`Node`]s with
//! a single output, plus the mutation primitives and structural validation
//! used for graph surgery.
//!
//! # Module Organization
//!
//! - [`node`] - Node, opcode, target and argument reference types
//! - [`graph`] - Graph arena, insertion cursor, mutation primitives, lint
//! - [`format`] - Human-readable and tabular rendering
//! - [`rewriter`] - Pattern/replacement subgraph rewriting
//! - [`error`] - Error types and result handling

pub mod error;
pub mod format;
pub mod graph;
pub mod node;
pub mod rewriter;

#[cfg(test)]
pub mod test;

pub use error::{Error, Result};
pub use graph::{Graph, InsertGuard};
pub use node::{Arg, Node, NodeId, Opcode, Target};
pub use rewriter::{Match, replace_pattern};

// Re-export the value types the IR embeds for convenience.
pub use weft_value::{Value, ValueKind};
