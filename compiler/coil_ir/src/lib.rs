//! Coil IR - Program-tree types for the Coil runtime.
//!
//! Coil executes a restricted Python dialect. This crate defines the tree the
//! out-of-scope parser produces and the engine consumes:
//!
//! - `ExprArena`: id-indexed storage for expressions, statements, function
//!   bodies, and arbitrary-precision integer literals
//! - `Expr` / `Stmt`: tree nodes addressed by `ExprId` / `StmtId` (no `Box`)
//! - `BinaryOp` / `BoolOp` / `UnaryOp`: the dialect's operator set
//! - `Name` / `StringInterner`: compact interned identifiers
//! - `Span`: byte-offset source locations
//! - `ProgramBuilder`: the programmatic construction surface used by
//!   embedders and tests
//!
//! # Design Notes
//!
//! All tree children are `u32` indices into contiguous arena arrays, never
//! owning pointers. Integer literals live in a side table of `BigInt` so
//! `ExprKind` stays `Copy`; float literals store raw bits so `ExprKind`
//! stays `Eq` and `Hash`.

mod ast;
mod build;
mod interner;
mod name;
mod span;

pub use ast::{
    BinaryOp, BoolOp, Expr, ExprArena, ExprId, ExprKind, ExprRange, FuncBody, FuncDef, FuncId,
    IntId, NameRange, Stmt, StmtId, StmtKind, StmtRange, UnaryOp,
};
pub use build::{Program, ProgramBuilder};
pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use span::Span;
