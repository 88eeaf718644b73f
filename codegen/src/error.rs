use snafu::Snafu;
use weft_ir::Opcode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Graph manipulation failed or the graph did not pass lint.
    #[snafu(context(false), display("{source}"))]
    Graph { source: weft_ir::Error },

    /// Tracing or symbolic dispatch failed.
    #[snafu(context(false), display("{source}"))]
    Trace { source: weft_trace::Error },

    /// Concrete evaluation failed.
    #[snafu(context(false), display("{source}"))]
    Value { source: weft_value::Error },

    /// A node's target does not fit its opcode.
    #[snafu(display("node `{name}`: {opcode} node with incompatible target"))]
    BadTarget { name: String, opcode: Opcode },

    /// Free-function name did not resolve against the registry.
    #[snafu(display("function `{name}` is not registered"))]
    UnknownFunction { name: String },

    /// Free functions take positional arguments only.
    #[snafu(display("function `{name}` does not accept keyword arguments"))]
    FunctionKwargs { name: String },

    /// A `call_method` node with an empty argument list.
    #[snafu(display("method node `{name}` has no receiver argument"))]
    MethodWithoutReceiver { name: String },

    /// Stored state named by a `get_attr` node is missing on the module.
    #[snafu(display("attribute `{path}` did not resolve on the owning module"))]
    AttrResolve { path: String },

    /// Nested callable named by a `call_module` node is missing.
    #[snafu(display("module path `{path}` did not resolve"))]
    ChildResolve { path: String },

    /// Wrong number of call arguments for the graph's placeholders.
    #[snafu(display("expected {expected} argument(s), got {got}"))]
    ArityMismatch { expected: usize, got: usize },

    /// The graph has no output node; nothing to return.
    #[snafu(display("graph has no output node"))]
    MissingOutput,

    /// A nested module produced a symbolic result under concrete
    /// execution.
    #[snafu(display("node `{name}` produced a symbolic value during concrete execution"))]
    NotConcrete { name: String },

    /// A value slot was read after its scheduled disposal. Disposal
    /// schedules come from last-use analysis; this firing means the
    /// compiled program is inconsistent with its graph.
    #[snafu(display("slot for `{name}` read after disposal"))]
    SlotDead { name: String },

    /// Interpretation referenced a node with no computed value.
    #[snafu(display("node `{name}` read before definition"))]
    Undefined { name: String },
}
