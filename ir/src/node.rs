//! Node, opcode, target and argument reference types.
//!
//! Nodes are created only through [`Graph`](crate::Graph) insertion and are
//! owned by the graph's arena; they reference each other exclusively by
//! [`NodeId`], so no `Rc` cycle can form between forward argument references
//! and the derived `users` back-index.

use std::collections::{BTreeMap, BTreeSet};

use smallvec::SmallVec;
use weft_value::{Value, ValueKind};

/// Stable handle to a node inside its owning graph.
///
/// Ids are arena indices and are only meaningful for the graph that issued
/// them. An id of an erased node is stale; the graph's fallible accessors
/// report it as [`Error::UnknownNode`](crate::Error::UnknownNode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of node kinds.
///
/// Every component that branches on node kind (tracer, interpreter,
/// codegen) matches this enum exhaustively, so adding an opcode is a
/// compile-time-checked change across all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Opcode {
    /// Formal parameter of the traced computation.
    Placeholder,
    /// Read of stored external state, target is the qualified path.
    GetAttr,
    /// Call of a free function, target is the function name.
    CallFunction,
    /// Call of a method on the first argument, target is the method name.
    CallMethod,
    /// Call of a nested callable object, target is its qualified path.
    CallModule,
    /// The graph's single return point, always last in program order.
    Output,
}

/// What a node's call resolves to; the meaning depends on the opcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Free function name, resolved against a function registry.
    Function(String),
    /// Method name, dispatched on the receiver value.
    Method(String),
    /// Dot-separated attribute path on the traced object.
    Attr(String),
    /// Dot-separated path of a nested callable object.
    Module(String),
    /// No target (placeholders and outputs).
    None,
}

impl Target {
    /// The textual payload, empty for [`Target::None`].
    pub fn as_str(&self) -> &str {
        match self {
            Target::Function(s) | Target::Method(s) | Target::Attr(s) | Target::Module(s) => s,
            Target::None => "",
        }
    }
}

/// One positional or keyword argument: a reference to another node in the
/// same graph, or an embedded literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Node(NodeId),
    Lit(Value),
}

impl Arg {
    /// The referenced node, if this argument is a node reference.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Arg::Node(id) => Some(*id),
            Arg::Lit(_) => None,
        }
    }
}

impl From<NodeId> for Arg {
    fn from(id: NodeId) -> Self {
        Arg::Node(id)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Lit(v)
    }
}

pub(crate) type Args = SmallVec<[Arg; 2]>;
pub(crate) type KwArgs = BTreeMap<String, Arg>;

/// A single recorded operation.
///
/// The name and opcode are fixed at insertion; target and argument
/// references are mutable through the owning graph, which keeps the
/// derived `users` index consistent on every change.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) opcode: Opcode,
    pub(crate) target: Target,
    pub(crate) args: Args,
    pub(crate) kwargs: KwArgs,
    pub(crate) ty: Option<ValueKind>,
    pub(crate) users: BTreeSet<NodeId>,
}

impl Node {
    /// Unique name within the owning graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Positional argument references in call order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Keyword argument references in deterministic (sorted) order.
    pub fn kwargs(&self) -> &BTreeMap<String, Arg> {
        &self.kwargs
    }

    /// Optional type annotation.
    pub fn ty(&self) -> Option<ValueKind> {
        self.ty
    }

    /// Nodes that consume this node. Derived index, maintained by the
    /// graph on every argument mutation; never independently settable.
    pub fn users(&self) -> &BTreeSet<NodeId> {
        &self.users
    }

    /// Iterate over every node referenced by args and kwargs, in order.
    pub fn input_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.args
            .iter()
            .chain(self.kwargs.values())
            .filter_map(Arg::as_node)
    }
}
