//! Expression types.
//!
//! All children are indices, not boxes: expressions reference other
//! expressions by `ExprId` and argument lists by `ExprRange`. Integer
//! literals index a `BigInt` side table so `ExprKind` stays `Copy`; float
//! and imaginary literals store raw `f64` bits so `ExprKind` stays `Eq`
//! and `Hash`.

use std::fmt;

use super::operators::{BinaryOp, BoolOp, UnaryOp};
use super::{ExprId, ExprRange, FuncId, IntId};
use crate::{Name, Span};

/// Expression node.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

/// Expression variants.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Integer literal: 42, 10**100 digits - arbitrary precision,
    /// stored in the arena's integer table.
    Int(IntId),

    /// Float literal: 3.14, 2.5e-8 (stored as bits for `Eq`/`Hash`).
    Float(u64),

    /// Imaginary literal: 2j (the imaginary component, stored as bits).
    Imaginary(u64),

    /// Boolean literal: True, False.
    Bool(bool),

    /// String literal (interned).
    Str(Name),

    /// None literal.
    NoneLit,

    /// Variable reference.
    Ident(Name),

    /// Unary operation: `-x`, `+x`, `not x`.
    Unary { op: UnaryOp, operand: ExprId },

    /// Binary operation (arithmetic or comparison): `left op right`.
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },

    /// Short-circuiting boolean operation: `left and right`, `left or right`.
    ///
    /// Kept apart from `Binary` - the right operand must not be evaluated
    /// once the left operand decides the result.
    Logical {
        op: BoolOp,
        left: ExprId,
        right: ExprId,
    },

    /// Conditional expression: `then if cond else orelse`.
    Conditional {
        cond: ExprId,
        then: ExprId,
        orelse: ExprId,
    },

    /// Lambda expression. The referenced function has an expression body.
    Lambda(FuncId),

    /// Function call: `callee(args...)`.
    Call { callee: ExprId, args: ExprRange },
}
