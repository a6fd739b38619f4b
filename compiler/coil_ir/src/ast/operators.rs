//! Binary, boolean, and unary operators.
//!
//! `and`/`or` live in their own `BoolOp` enum rather than `BinaryOp`:
//! they short-circuit, so the control algorithm must not decompose their
//! right operand up front the way it does for ordinary binary operators.

/// Binary operators, including comparisons.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages to show the exact operator that failed.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }

    /// Whether this operator is a comparison (`==`, `!=`, `<`, `<=`, `>`, `>=`).
    ///
    /// Comparisons have different type-mismatch wording than arithmetic
    /// operators, and equality never errors on mismatched types.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Whether this operator is an ordering (`<`, `<=`, `>`, `>=`).
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }
}

/// Short-circuiting boolean operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    /// Returns the source-level keyword for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// Arithmetic negation: `-x`
    Neg,
    /// Arithmetic identity: `+x`
    Pos,
    /// Logical negation: `not x`
    Not,
}

impl UnaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Not => "not",
        }
    }
}
