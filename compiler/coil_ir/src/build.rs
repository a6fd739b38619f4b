//! Programmatic tree construction.
//!
//! The parser that produces Coil trees lives outside this repository, so
//! the arena's construction surface is wrapped in a builder that embedders
//! (and this workspace's tests) use to assemble programs directly.
//!
//! Nodes built here carry `Span::DUMMY`; a real parser allocates through
//! `ExprArena` and supplies source spans itself.

use num_bigint::BigInt;

use crate::ast::{
    BinaryOp, BoolOp, ExprArena, ExprId, ExprKind, FuncBody, FuncDef, FuncId, StmtId, StmtKind,
    StmtRange, UnaryOp,
};
use crate::{Name, SharedInterner, Span};

/// A complete program: the arena, the interner its names live in, and the
/// top-level statement block.
pub struct Program {
    pub arena: ExprArena,
    pub interner: SharedInterner,
    pub body: StmtRange,
}

/// Builder for assembling program trees.
pub struct ProgramBuilder {
    arena: ExprArena,
    interner: SharedInterner,
    top: Vec<StmtId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            arena: ExprArena::new(),
            interner: SharedInterner::default(),
            top: Vec::new(),
        }
    }

    /// Intern an identifier.
    pub fn ident(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    // Expressions

    /// Integer literal from an `i64`.
    pub fn int(&mut self, v: i64) -> ExprId {
        self.big(BigInt::from(v))
    }

    /// Integer literal from an arbitrary-precision value.
    pub fn big(&mut self, v: BigInt) -> ExprId {
        let id = self.arena.alloc_int(v);
        self.arena.alloc_expr(ExprKind::Int(id), Span::DUMMY)
    }

    /// Float literal.
    pub fn float(&mut self, v: f64) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Float(v.to_bits()), Span::DUMMY)
    }

    /// Imaginary literal: `2j`.
    pub fn imaginary(&mut self, v: f64) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Imaginary(v.to_bits()), Span::DUMMY)
    }

    /// Boolean literal.
    pub fn bool_lit(&mut self, v: bool) -> ExprId {
        self.arena.alloc_expr(ExprKind::Bool(v), Span::DUMMY)
    }

    /// String literal.
    pub fn str_lit(&mut self, s: &str) -> ExprId {
        let name = self.interner.intern(s);
        self.arena.alloc_expr(ExprKind::Str(name), Span::DUMMY)
    }

    /// None literal.
    pub fn none(&mut self) -> ExprId {
        self.arena.alloc_expr(ExprKind::NoneLit, Span::DUMMY)
    }

    /// Variable reference.
    pub fn name(&mut self, s: &str) -> ExprId {
        let name = self.interner.intern(s);
        self.arena.alloc_expr(ExprKind::Ident(name), Span::DUMMY)
    }

    /// Unary operation.
    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Unary { op, operand }, Span::DUMMY)
    }

    /// Binary operation (arithmetic or comparison).
    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Binary { op, left, right }, Span::DUMMY)
    }

    /// Short-circuiting `and`/`or`.
    pub fn logical(&mut self, op: BoolOp, left: ExprId, right: ExprId) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Logical { op, left, right }, Span::DUMMY)
    }

    /// Conditional expression: `then if cond else orelse`.
    pub fn conditional(&mut self, cond: ExprId, then: ExprId, orelse: ExprId) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Conditional { cond, then, orelse }, Span::DUMMY)
    }

    /// Lambda expression.
    pub fn lambda(&mut self, params: &[&str], body: ExprId) -> ExprId {
        let func = self.func_def(Name::EMPTY, params, FuncBody::Expr(body));
        self.arena.alloc_expr(ExprKind::Lambda(func), Span::DUMMY)
    }

    /// Function call.
    pub fn call(&mut self, callee: ExprId, args: &[ExprId]) -> ExprId {
        let args = self.arena.alloc_exprs(args);
        self.arena
            .alloc_expr(ExprKind::Call { callee, args }, Span::DUMMY)
    }

    // Statements

    /// Expression statement.
    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Expr(expr), Span::DUMMY)
    }

    /// Assignment: `target = value`.
    pub fn assign(&mut self, target: &str, value: ExprId) -> StmtId {
        let target = self.interner.intern(target);
        self.arena
            .alloc_stmt(StmtKind::Assign { target, value }, Span::DUMMY)
    }

    /// Return statement.
    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Return(value), Span::DUMMY)
    }

    /// If statement. `orelse` may be `StmtRange::EMPTY`.
    pub fn if_stmt(&mut self, cond: ExprId, then_body: StmtRange, orelse: StmtRange) -> StmtId {
        self.arena.alloc_stmt(
            StmtKind::If {
                cond,
                then_body,
                orelse,
            },
            Span::DUMMY,
        )
    }

    /// While loop.
    pub fn while_stmt(&mut self, cond: ExprId, body: StmtRange) -> StmtId {
        self.arena
            .alloc_stmt(StmtKind::While { cond, body }, Span::DUMMY)
    }

    /// Break statement.
    pub fn brk(&mut self) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Break, Span::DUMMY)
    }

    /// Continue statement.
    pub fn cont(&mut self) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Continue, Span::DUMMY)
    }

    /// Pass statement.
    pub fn pass(&mut self) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Pass, Span::DUMMY)
    }

    /// Function definition statement.
    pub fn def(&mut self, name: &str, params: &[&str], body: StmtRange) -> StmtId {
        let name = self.interner.intern(name);
        let func = self.func_def(name, params, FuncBody::Block(body));
        self.arena
            .alloc_stmt(StmtKind::FunctionDef(func), Span::DUMMY)
    }

    /// `nonlocal` declaration.
    pub fn nonlocal(&mut self, names: &[&str]) -> StmtId {
        let names = self.name_list(names);
        self.arena
            .alloc_stmt(StmtKind::Nonlocal { names }, Span::DUMMY)
    }

    /// `global` declaration.
    pub fn global(&mut self, names: &[&str]) -> StmtId {
        let names = self.name_list(names);
        self.arena
            .alloc_stmt(StmtKind::Global { names }, Span::DUMMY)
    }

    /// Assemble statements into a block.
    pub fn block(&mut self, stmts: &[StmtId]) -> StmtRange {
        self.arena.alloc_stmts(stmts)
    }

    /// Append a statement to the top-level program body.
    pub fn push(&mut self, stmt: StmtId) {
        self.top.push(stmt);
    }

    /// Finish building, producing the program.
    pub fn finish(mut self) -> Program {
        let body = self.arena.alloc_stmts(&self.top);
        Program {
            arena: self.arena,
            interner: self.interner,
            body,
        }
    }

    fn name_list(&mut self, names: &[&str]) -> crate::ast::NameRange {
        let interned: Vec<Name> = names.iter().map(|n| self.interner.intern(n)).collect();
        self.arena.alloc_names(&interned)
    }

    fn func_def(&mut self, name: Name, params: &[&str], body: FuncBody) -> FuncId {
        let interned: Vec<Name> = params.iter().map(|p| self.interner.intern(p)).collect();
        let params = self.arena.alloc_names(&interned);
        self.arena.alloc_func(FuncDef {
            name,
            params,
            body,
            span: Span::DUMMY,
        })
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
