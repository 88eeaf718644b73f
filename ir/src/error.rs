use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node still has consumers and cannot be erased.
    #[snafu(display("cannot erase `{name}`: still used by {users:?}"))]
    EraseWithUsers { name: String, users: Vec<String> },

    /// A node id does not resolve in this graph (erased or foreign).
    #[snafu(display("node {what} does not exist in this graph"))]
    UnknownNode { what: String },

    /// The graph already has an output node.
    #[snafu(display("graph already has an output node `{existing}`"))]
    DuplicateOutput { existing: String },

    /// A node references another node that appears later in program order.
    #[snafu(display("`{user}` references `{used}` which does not appear earlier in the graph"))]
    UseBeforeDef { user: String, used: String },

    /// Stored user set diverges from the derived reverse index.
    #[snafu(display("user set of `{name}` does not match its actual consumers"))]
    UserIndexMismatch { name: String },

    /// The output node is not the last node in program order.
    #[snafu(display("output node `{name}` is not last in program order"))]
    OutputNotLast { name: String },

    /// Replacing a node's uses with itself.
    #[snafu(display("cannot replace uses of `{name}` with itself"))]
    SelfReplacement { name: String },

    /// Output nodes take exactly one argument.
    #[snafu(display("output node must have exactly one argument, got {got}"))]
    MalformedOutput { got: usize },

    /// Pattern and replacement graphs disagree on placeholder count.
    #[snafu(display("pattern has {pattern} placeholder(s) but replacement has {replacement}"))]
    PatternArity { pattern: usize, replacement: usize },
}
