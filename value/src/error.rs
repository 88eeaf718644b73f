use snafu::Snafu;

use crate::ValueKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Operands have incompatible kinds for a binary operation.
    #[snafu(display("type mismatch: cannot apply `{op}` to {lhs} and {rhs}"))]
    TypeMismatch { op: &'static str, lhs: ValueKind, rhs: ValueKind },

    /// Operand has the wrong kind for a unary operation.
    #[snafu(display("type mismatch: cannot apply `{op}` to {operand}"))]
    UnaryTypeMismatch { op: &'static str, operand: ValueKind },

    /// A value of one kind was required, another was found.
    #[snafu(display("expected {expected}, got {actual}"))]
    KindMismatch { expected: ValueKind, actual: ValueKind },

    /// Division or remainder by zero.
    #[snafu(display("division by zero"))]
    DivisionByZero,

    /// Value kind has no length.
    #[snafu(display("{kind} has no length"))]
    NoLength { kind: ValueKind },

    /// Index outside the valid range.
    #[snafu(display("index {index} out of bounds for length {len}"))]
    IndexOutOfBounds { index: i64, len: usize },

    /// Wrong number of positional arguments.
    #[snafu(display("`{name}` expects {expected} argument(s), got {got}"))]
    ArityMismatch { name: String, expected: usize, got: usize },

    /// Method not defined for the receiver's kind.
    #[snafu(display("no method `{name}` on {kind}"))]
    UnknownMethod { name: String, kind: ValueKind },

    /// Keyword argument not accepted by the method.
    #[snafu(display("method `{name}` does not accept keyword `{keyword}`"))]
    UnknownKeyword { name: String, keyword: String },
}
