//! Statement types.

use std::fmt;

use super::{ExprId, FuncId, NameRange, StmtRange};
use crate::{Name, Span};

/// Statement node.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

impl fmt::Debug for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

/// Statement variants.
///
/// `elif` chains arrive from the parser as nested `If` statements in the
/// `orelse` block.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StmtKind {
    /// Expression statement.
    Expr(ExprId),

    /// Assignment to a name: `target = value`.
    Assign { target: Name, value: ExprId },

    /// Return from the enclosing function, with optional value.
    Return(Option<ExprId>),

    /// Conditional statement. `orelse` may be empty.
    If {
        cond: ExprId,
        then_body: StmtRange,
        orelse: StmtRange,
    },

    /// While loop.
    While { cond: ExprId, body: StmtRange },

    /// Break out of the nearest enclosing loop.
    Break,

    /// Continue with the next iteration of the nearest enclosing loop.
    Continue,

    /// Function definition. Binds the function's name in the current frame.
    FunctionDef(FuncId),

    /// `nonlocal` declaration.
    Nonlocal { names: NameRange },

    /// `global` declaration. Accepted and recorded; deliberately carries no
    /// further runtime semantics (documented incompleteness).
    Global { names: NameRange },

    /// No-op statement.
    Pass,
}
