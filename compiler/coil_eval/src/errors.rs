//! The unified runtime error taxonomy.
//!
//! Both realizations - the iterative interpreter and the compiled stack
//! machine - classify every failing input into the same [`ErrorKind`], so
//! a program that fails one way on one path fails the same way on the
//! other. Factory functions are the construction surface; `Display`
//! renders the human-readable message.

use std::fmt;

use coil_ir::{BinaryOp, Span, StringInterner};
use coil_resolve::{ResolveError, ResolveErrorKind};

use crate::value::Value;

/// Result of a semantic operation.
pub type EvalResult = Result<Value, RuntimeError>;

// Per-operator zero-divisor messages.
pub const DIV_BY_ZERO: &str = "division by zero";
pub const INT_FLOORDIV_OR_MOD_BY_ZERO: &str = "integer division or modulo by zero";
pub const FLOAT_DIV_BY_ZERO: &str = "float division by zero";
pub const FLOAT_FLOORDIV_BY_ZERO: &str = "float floor division by zero";
pub const FLOAT_MOD_BY_ZERO: &str = "float modulo";
pub const COMPLEX_DIV_BY_ZERO: &str = "complex division by zero";
pub const ZERO_TO_NEGATIVE_POWER: &str = "0.0 cannot be raised to a negative power";

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name declared in no reachable frame.
    Name { name: String },
    /// Name declared in the frame but read before its first write
    /// (temporal dead zone).
    UnboundLocal { name: String },
    /// Binary operator applied to incompatible types.
    UnsupportedBinary {
        op: BinaryOp,
        left: &'static str,
        right: &'static str,
    },
    /// Unary operator (or unary-shaped builtin) applied to an
    /// incompatible type.
    UnsupportedUnary {
        op: &'static str,
        operand: &'static str,
    },
    /// Division-family operation with a zero divisor; the message names
    /// the specific operator.
    ZeroDivision { message: &'static str },
    /// Call with the wrong number of arguments.
    ArityMismatch {
        name: String,
        expected: u32,
        got: u32,
    },
    /// Call of a non-function value.
    NotCallable { type_name: &'static str },
    /// Pair accessor applied to a non-pair value.
    NotAPair { type_name: &'static str },
    /// `nonlocal` with no binding in an enclosing function frame.
    NonlocalMissing { name: String },
    /// `nonlocal` naming a parameter.
    NonlocalParameter { name: String },
    /// Name used before its `nonlocal` declaration.
    UsedBeforeNonlocal { name: String },
}

impl ErrorKind {
    /// Stable machine-checkable label for the kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name { .. } => "NameError",
            Self::UnboundLocal { .. } => "UnboundLocalError",
            Self::UnsupportedBinary { .. } | Self::UnsupportedUnary { .. } => {
                "UnsupportedOperandType"
            }
            Self::ZeroDivision { .. } => "ZeroDivisionError",
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::NotCallable { .. } => "CallOnNonFunction",
            Self::NotAPair { .. } => "NotAPair",
            Self::NonlocalMissing { .. } => "NonlocalBindingMissing",
            Self::NonlocalParameter { .. } => "NonlocalIsParameter",
            Self::UsedBeforeNonlocal { .. } => "UsedPriorToNonlocal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name { name } => write!(f, "name '{name}' is not defined"),
            Self::UnboundLocal { name } => {
                write!(f, "local variable '{name}' referenced before assignment")
            }
            Self::UnsupportedBinary { op, left, right } => {
                if op.is_ordering() {
                    write!(
                        f,
                        "'{}' not supported between instances of '{left}' and '{right}'",
                        op.as_symbol()
                    )
                } else {
                    write!(
                        f,
                        "unsupported operand type(s) for {}: '{left}' and '{right}'",
                        op.as_symbol()
                    )
                }
            }
            Self::UnsupportedUnary { op, operand } => {
                write!(f, "bad operand type for {op}: '{operand}'")
            }
            Self::ZeroDivision { message } => write!(f, "{message}"),
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(
                    f,
                    "{name}() takes {expected} positional {arg_word} but {got} were given"
                )
            }
            Self::NotCallable { type_name } => {
                write!(f, "'{type_name}' object is not callable")
            }
            Self::NotAPair { type_name } => {
                write!(f, "'{type_name}' is not a pair")
            }
            Self::NonlocalMissing { name } => {
                write!(f, "no binding for nonlocal '{name}' found")
            }
            Self::NonlocalParameter { name } => {
                write!(f, "name '{name}' is parameter and nonlocal")
            }
            Self::UsedBeforeNonlocal { name } => {
                write!(f, "name '{name}' is used prior to nonlocal declaration")
            }
        }
    }
}

/// A run-aborting failure: machine-checkable kind plus optional source
/// location. Errors propagate immediately; the engine never resumes past
/// one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError { kind, span: None }
    }

    /// Attach a source span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Fold a resolution failure into the unified taxonomy.
    pub fn from_resolve(err: ResolveError, interner: &StringInterner) -> Self {
        let name = interner.lookup(err.kind.name()).to_owned();
        let kind = match err.kind {
            ResolveErrorKind::Undeclared { .. } => ErrorKind::Name { name },
            ResolveErrorKind::NonlocalMissing { .. } => ErrorKind::NonlocalMissing { name },
            ResolveErrorKind::NonlocalParameter { .. } => ErrorKind::NonlocalParameter { name },
            ResolveErrorKind::UsedBeforeNonlocal { .. } => ErrorKind::UsedBeforeNonlocal { name },
        };
        RuntimeError::new(kind).with_span(err.span)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for RuntimeError {}

// Factory constructors.

pub fn name_error(name: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::Name { name: name.into() })
}

pub fn unbound_local(name: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::UnboundLocal { name: name.into() })
}

pub fn unsupported_binary(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::new(ErrorKind::UnsupportedBinary {
        op,
        left: left.type_name(),
        right: right.type_name(),
    })
}

pub fn unsupported_unary(op: &'static str, operand: &Value) -> RuntimeError {
    RuntimeError::new(ErrorKind::UnsupportedUnary {
        op,
        operand: operand.type_name(),
    })
}

pub fn zero_division(message: &'static str) -> RuntimeError {
    RuntimeError::new(ErrorKind::ZeroDivision { message })
}

pub fn arity_mismatch(name: impl Into<String>, expected: u32, got: u32) -> RuntimeError {
    RuntimeError::new(ErrorKind::ArityMismatch {
        name: name.into(),
        expected,
        got,
    })
}

pub fn not_callable(type_name: &'static str) -> RuntimeError {
    RuntimeError::new(ErrorKind::NotCallable { type_name })
}

pub fn not_a_pair(type_name: &'static str) -> RuntimeError {
    RuntimeError::new(ErrorKind::NotAPair { type_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_mismatch_message() {
        let err = unsupported_binary(BinaryOp::Add, &Value::int(1), &Value::string("a"));
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for +: 'int' and 'str'"
        );
        assert_eq!(err.kind.label(), "UnsupportedOperandType");
    }

    #[test]
    fn ordering_mismatch_message() {
        let err = unsupported_binary(BinaryOp::Lt, &Value::string("a"), &Value::int(1));
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'str' and 'int'"
        );
    }

    #[test]
    fn zero_division_messages_name_the_operator() {
        assert_eq!(zero_division(DIV_BY_ZERO).to_string(), "division by zero");
        assert_eq!(
            zero_division(INT_FLOORDIV_OR_MOD_BY_ZERO).to_string(),
            "integer division or modulo by zero"
        );
        assert_eq!(
            zero_division(ZERO_TO_NEGATIVE_POWER).to_string(),
            "0.0 cannot be raised to a negative power"
        );
    }

    #[test]
    fn arity_message() {
        let err = arity_mismatch("f", 2, 3);
        assert_eq!(
            err.to_string(),
            "f() takes 2 positional arguments but 3 were given"
        );
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(name_error("x").kind.label(), "NameError");
        assert_eq!(unbound_local("x").kind.label(), "UnboundLocalError");
        assert_eq!(not_callable("int").kind.label(), "CallOnNonFunction");
        assert_eq!(not_a_pair("int").kind.label(), "NotAPair");
    }
}
