//! Program-tree storage.
//!
//! The arena owns every node of a program: expressions, statements,
//! function definitions, argument/body/name lists, and the big-integer
//! literal table. Nodes reference each other through `u32` ids and
//! (start, len) ranges into contiguous arrays.

mod expr;
mod operators;
mod stmt;


pub use expr::{Expr, ExprKind};
pub use operators::{BinaryOp, BoolOp, UnaryOp};
pub use stmt::{Stmt, StmtKind};

use num_bigint::BigInt;

use crate::{Name, Span};

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id! {
    /// Index of an expression in the arena.
    ExprId
}
arena_id! {
    /// Index of a statement in the arena.
    StmtId
}
arena_id! {
    /// Index of a function definition in the arena.
    FuncId
}
arena_id! {
    /// Index of a big-integer literal in the arena's integer table.
    IntId
}

macro_rules! arena_range {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub struct $name {
            pub start: u32,
            pub len: u32,
        }

        impl $name {
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u32) -> Self {
                $name { start, len }
            }

            #[inline]
            pub const fn len(self) -> usize {
                self.len as usize
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.len == 0
            }
        }
    };
}

arena_range! {
    /// Range of expression ids in the arena's expression-list table.
    ExprRange
}
arena_range! {
    /// Range of statement ids in the arena's statement-list table.
    StmtRange
}
arena_range! {
    /// Range of names in the arena's name-list table (parameters,
    /// `nonlocal`/`global` name lists).
    NameRange
}

/// A function body: a single expression (lambda) or a statement block.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FuncBody {
    Expr(ExprId),
    Block(StmtRange),
}

/// A function definition shared by `def` statements and lambdas.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FuncDef {
    /// Bound name for `def`; `Name::EMPTY` for lambdas.
    pub name: Name,
    pub params: NameRange,
    pub body: FuncBody,
    pub span: Span,
}

/// Arena for a whole program tree.
#[derive(Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    funcs: Vec<FuncDef>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
    name_lists: Vec<Name>,
    ints: Vec<BigInt>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression node.
    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::from_raw(checked_index(self.exprs.len()));
        self.exprs.push(Expr::new(kind, span));
        id
    }

    /// Allocate a statement node.
    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::from_raw(checked_index(self.stmts.len()));
        self.stmts.push(Stmt::new(kind, span));
        id
    }

    /// Allocate a function definition.
    pub fn alloc_func(&mut self, func: FuncDef) -> FuncId {
        let id = FuncId::from_raw(checked_index(self.funcs.len()));
        self.funcs.push(func);
        id
    }

    /// Allocate a big-integer literal.
    pub fn alloc_int(&mut self, value: BigInt) -> IntId {
        let id = IntId::from_raw(checked_index(self.ints.len()));
        self.ints.push(value);
        id
    }

    /// Allocate a contiguous expression list (call arguments).
    pub fn alloc_exprs(&mut self, ids: &[ExprId]) -> ExprRange {
        let start = checked_index(self.expr_lists.len());
        self.expr_lists.extend_from_slice(ids);
        ExprRange::new(start, checked_index(ids.len()))
    }

    /// Allocate a contiguous statement list (a block body).
    pub fn alloc_stmts(&mut self, ids: &[StmtId]) -> StmtRange {
        let start = checked_index(self.stmt_lists.len());
        self.stmt_lists.extend_from_slice(ids);
        StmtRange::new(start, checked_index(ids.len()))
    }

    /// Allocate a contiguous name list (parameters, declaration lists).
    pub fn alloc_names(&mut self, names: &[Name]) -> NameRange {
        let start = checked_index(self.name_lists.len());
        self.name_lists.extend_from_slice(names);
        NameRange::new(start, checked_index(names.len()))
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn func(&self, id: FuncId) -> &FuncDef {
        &self.funcs[id.index()]
    }

    #[inline]
    pub fn int(&self, id: IntId) -> &BigInt {
        &self.ints[id.index()]
    }

    #[inline]
    pub fn exprs(&self, range: ExprRange) -> &[ExprId] {
        &self.expr_lists[range.start as usize..range.start as usize + range.len()]
    }

    #[inline]
    pub fn stmts(&self, range: StmtRange) -> &[StmtId] {
        &self.stmt_lists[range.start as usize..range.start as usize + range.len()]
    }

    #[inline]
    pub fn names(&self, range: NameRange) -> &[Name] {
        &self.name_lists[range.start as usize..range.start as usize + range.len()]
    }

    /// Number of function definitions in the arena.
    pub fn func_count(&self) -> usize {
        self.funcs.len()
    }

    /// Number of expression nodes in the arena.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }
}

fn checked_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("arena capacity exceeded: {len} entries"))
}
