use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A symbolic value was coerced to a boolean; the branch it would
    /// drive depends on runtime data and cannot be captured structurally.
    /// Hoist the decision out of the traced code or mark the region as an
    /// opaque call.
    #[snafu(display(
        "symbolic value `{name}` used as a branch condition; data-dependent control flow cannot be traced"
    ))]
    DataDependentBranch { name: String },

    /// A symbolic value's length was queried without `len` being
    /// registered as an opaque call.
    #[snafu(display(
        "length of symbolic value `{name}` queried; register `len` with wrap() to record it as an opaque call"
    ))]
    DataDependentLen { name: String },

    /// Call target not present in the function registry.
    #[snafu(display("unknown function `{name}`"))]
    UnknownFunction { name: String },

    /// Free functions take positional arguments only.
    #[snafu(display("function `{name}` does not accept keyword arguments"))]
    FunctionKwargs { name: String },

    /// Attribute path did not resolve to stored state.
    #[snafu(display("unknown attribute `{path}`"))]
    UnknownAttribute { path: String },

    /// Child path did not resolve to a nested callable.
    #[snafu(display("unknown nested module `{path}`"))]
    UnknownChild { path: String },

    /// Symbolic values from two different traces were combined.
    #[snafu(display("symbolic values belong to different traces"))]
    RecorderMismatch,

    /// A concrete value of a different kind was required.
    #[snafu(display("expected {expected}, got {actual}"))]
    ExpectedKind { expected: weft_value::ValueKind, actual: weft_value::ValueKind },

    /// Error raised inside a nested module call, with the call path.
    #[snafu(display("in module `{path}`: {source}"))]
    LeafModule {
        path: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    /// Graph construction failed while recording.
    #[snafu(context(false), display("{source}"))]
    Graph { source: weft_ir::Error },

    /// Concrete evaluation failed.
    #[snafu(context(false), display("{source}"))]
    Value { source: weft_value::Error },

    /// Error propagated out of a module's forward implementation.
    #[snafu(display("forward failed: {source}"))]
    Forward { source: Box<dyn std::error::Error + Send + Sync> },
}
