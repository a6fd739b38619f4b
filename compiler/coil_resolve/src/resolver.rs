//! The resolution passes.
//!
//! Each scope is processed in two phases: declaration collection over the
//! whole body first (so `x` followed later by `x = 1` addresses the local
//! slot and becomes a run-time unbound access, not a resolution failure),
//! then identifier/store addressing in textual order. Scopes are processed
//! outside-in, so enclosing layouts are always final when a nested body
//! resolves against them.

use coil_ir::{
    ExprArena, ExprId, ExprKind, FuncBody, FuncId, Name, NameRange, Span, StmtKind, StmtRange,
};
use coil_stack::ensure_headroom;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::errors::{ResolveError, ResolveErrorKind};
use crate::program::{FrameId, FrameLayout, LexicalAddress, ResolvedProgram};

/// Resolve a whole program.
///
/// `builtins` lists the engine-provided names, in the slot order the
/// engine installs them; they form the outermost frame of every chain.
pub fn resolve_program(
    arena: &ExprArena,
    body: StmtRange,
    builtins: &[Name],
) -> Result<ResolvedProgram, ResolveError> {
    let mut resolver = Resolver {
        arena,
        out: ResolvedProgram::default(),
    };
    resolver.out.frames.push(FrameLayout {
        names: builtins.to_vec(),
        is_function: false,
        func: None,
        parent: None,
        globals: Vec::new(),
    });
    let module = resolver.resolve_scope(None, &[FrameId::BUILTINS], FuncBody::Block(body))?;
    debug_assert_eq!(module, FrameId::MODULE);
    debug!(
        frames = resolver.out.frame_count(),
        loads = resolver.out.loads.len(),
        "resolved program"
    );
    Ok(resolver.out)
}

/// Declarations collected from one body.
#[derive(Default)]
struct Collected {
    /// Assigned / `def`-bound names, first-encounter order.
    declared: Vec<Name>,
    seen: FxHashSet<Name>,
    /// `nonlocal` names with the span of their declaration.
    nonlocals: FxHashMap<Name, Span>,
    nonlocal_order: Vec<Name>,
    globals: Vec<Name>,
}

impl Collected {
    fn declare(&mut self, name: Name) {
        if self.seen.insert(name) {
            self.declared.push(name);
        }
    }

    fn declare_nonlocal(&mut self, name: Name, span: Span) {
        if !self.nonlocals.contains_key(&name) {
            self.nonlocals.insert(name, span);
            self.nonlocal_order.push(name);
        }
    }
}

/// Per-scope state for the addressing phase.
struct ScopeCx {
    /// Ancestor chain including the current frame, innermost last.
    chain: Vec<FrameId>,
    /// The current frame's `nonlocal` names.
    nonlocals: FxHashSet<Name>,
    /// `nonlocal` statements already passed in textual order.
    nonlocals_seen: FxHashSet<Name>,
}

impl ScopeCx {
    /// Reject a use or store of a `nonlocal` name before its declaration.
    fn check_pending_nonlocal(&self, name: Name, span: Span) -> Result<(), ResolveError> {
        if self.nonlocals.contains(&name) && !self.nonlocals_seen.contains(&name) {
            return Err(ResolveError::new(
                ResolveErrorKind::UsedBeforeNonlocal { name },
                span,
            ));
        }
        Ok(())
    }
}

struct Resolver<'a> {
    arena: &'a ExprArena,
    out: ResolvedProgram,
}

impl Resolver<'_> {
    /// Collect and address one scope; returns its frame id.
    fn resolve_scope(
        &mut self,
        func: Option<FuncId>,
        parents: &[FrameId],
        body: FuncBody,
    ) -> Result<FrameId, ResolveError> {
        let params: Vec<Name> = func
            .map(|f| self.arena.names(self.arena.func(f).params).to_vec())
            .unwrap_or_default();

        let mut collected = Collected::default();
        for &param in &params {
            collected.seen.insert(param);
        }
        if let FuncBody::Block(range) = body {
            self.collect_stmts(range, &mut collected);
        }

        for &name in &collected.nonlocal_order {
            let span = collected.nonlocals[&name];
            if params.contains(&name) {
                return Err(ResolveError::new(
                    ResolveErrorKind::NonlocalParameter { name },
                    span,
                ));
            }
            let bound_in_enclosing_fn = parents.iter().rev().any(|&frame| {
                let layout = self.out.frame(frame);
                layout.is_function && layout.slot_of(name).is_some()
            });
            if !bound_in_enclosing_fn {
                return Err(ResolveError::new(
                    ResolveErrorKind::NonlocalMissing { name },
                    span,
                ));
            }
        }

        let mut names = params;
        names.extend(
            collected
                .declared
                .iter()
                .copied()
                .filter(|n| !collected.nonlocals.contains_key(n)),
        );
        let frame_id = FrameId::from_raw(
            u32::try_from(self.out.frames.len())
                .unwrap_or_else(|_| panic!("frame count exceeds u32")),
        );
        self.out.frames.push(FrameLayout {
            names,
            is_function: func.is_some(),
            func,
            parent: parents.last().copied(),
            globals: collected.globals,
        });
        if let Some(f) = func {
            self.out.func_frames.insert(f, frame_id);
        }

        let mut cx = ScopeCx {
            chain: parents.iter().copied().chain([frame_id]).collect(),
            nonlocals: collected.nonlocals.keys().copied().collect(),
            nonlocals_seen: FxHashSet::default(),
        };
        match body {
            FuncBody::Expr(expr) => self.resolve_expr(expr, &mut cx)?,
            FuncBody::Block(range) => self.resolve_stmts(range, &mut cx)?,
        }
        Ok(frame_id)
    }

    /// Declaration collection: walk a statement block, descending into
    /// `if`/`while` bodies but never into nested function bodies.
    fn collect_stmts(&self, range: StmtRange, out: &mut Collected) {
        for &sid in self.arena.stmts(range) {
            let stmt = self.arena.stmt(sid);
            match stmt.kind {
                StmtKind::Assign { target, .. } => out.declare(target),
                StmtKind::FunctionDef(func) => out.declare(self.arena.func(func).name),
                StmtKind::If {
                    then_body, orelse, ..
                } => {
                    self.collect_stmts(then_body, out);
                    self.collect_stmts(orelse, out);
                }
                StmtKind::While { body, .. } => self.collect_stmts(body, out),
                StmtKind::Nonlocal { names } => {
                    for &name in self.arena.names(names) {
                        out.declare_nonlocal(name, stmt.span);
                    }
                }
                StmtKind::Global { names } => {
                    for &name in self.arena.names(names) {
                        if !out.globals.contains(&name) {
                            out.globals.push(name);
                        }
                    }
                }
                StmtKind::Expr(_)
                | StmtKind::Return(_)
                | StmtKind::Break
                | StmtKind::Continue
                | StmtKind::Pass => {}
            }
        }
    }

    /// Addressing: walk a statement block in textual order.
    fn resolve_stmts(&mut self, range: StmtRange, cx: &mut ScopeCx) -> Result<(), ResolveError> {
        for &sid in self.arena.stmts(range) {
            let stmt = *self.arena.stmt(sid);
            match stmt.kind {
                StmtKind::Expr(expr) => self.resolve_expr(expr, cx)?,
                StmtKind::Assign { target, value } => {
                    self.resolve_expr(value, cx)?;
                    cx.check_pending_nonlocal(target, stmt.span)?;
                    let addr = self.lookup(target, cx).ok_or_else(|| {
                        ResolveError::new(ResolveErrorKind::Undeclared { name: target }, stmt.span)
                    })?;
                    self.out.stores.insert(sid, addr);
                }
                StmtKind::Return(value) => {
                    if let Some(expr) = value {
                        self.resolve_expr(expr, cx)?;
                    }
                }
                StmtKind::If {
                    cond,
                    then_body,
                    orelse,
                } => {
                    self.resolve_expr(cond, cx)?;
                    self.resolve_stmts(then_body, cx)?;
                    self.resolve_stmts(orelse, cx)?;
                }
                StmtKind::While { cond, body } => {
                    self.resolve_expr(cond, cx)?;
                    self.resolve_stmts(body, cx)?;
                }
                StmtKind::FunctionDef(func) => {
                    let name = self.arena.func(func).name;
                    cx.check_pending_nonlocal(name, stmt.span)?;
                    let addr = self.lookup(name, cx).ok_or_else(|| {
                        ResolveError::new(ResolveErrorKind::Undeclared { name }, stmt.span)
                    })?;
                    self.out.stores.insert(sid, addr);
                    let body = self.arena.func(func).body;
                    self.resolve_scope(Some(func), &cx.chain.clone(), body)?;
                }
                StmtKind::Nonlocal { names } => {
                    self.mark_nonlocals_seen(names, cx);
                }
                StmtKind::Global { .. }
                | StmtKind::Break
                | StmtKind::Continue
                | StmtKind::Pass => {}
            }
        }
        Ok(())
    }

    fn mark_nonlocals_seen(&self, names: NameRange, cx: &mut ScopeCx) {
        for &name in self.arena.names(names) {
            cx.nonlocals_seen.insert(name);
        }
    }

    /// Addressing: walk an expression.
    fn resolve_expr(&mut self, id: ExprId, cx: &mut ScopeCx) -> Result<(), ResolveError> {
        ensure_headroom(|| {
            let expr = *self.arena.expr(id);
            match expr.kind {
                ExprKind::Int(_)
                | ExprKind::Float(_)
                | ExprKind::Imaginary(_)
                | ExprKind::Bool(_)
                | ExprKind::Str(_)
                | ExprKind::NoneLit => Ok(()),
                ExprKind::Ident(name) => {
                    cx.check_pending_nonlocal(name, expr.span)?;
                    let addr = self.lookup(name, cx).ok_or_else(|| {
                        ResolveError::new(ResolveErrorKind::Undeclared { name }, expr.span)
                    })?;
                    self.out.loads.insert(id, addr);
                    Ok(())
                }
                ExprKind::Unary { operand, .. } => self.resolve_expr(operand, cx),
                ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                    self.resolve_expr(left, cx)?;
                    self.resolve_expr(right, cx)
                }
                ExprKind::Conditional { cond, then, orelse } => {
                    self.resolve_expr(cond, cx)?;
                    self.resolve_expr(then, cx)?;
                    self.resolve_expr(orelse, cx)
                }
                ExprKind::Lambda(func) => {
                    let body = self.arena.func(func).body;
                    self.resolve_scope(Some(func), &cx.chain.clone(), body)?;
                    Ok(())
                }
                ExprKind::Call { callee, args } => {
                    self.resolve_expr(callee, cx)?;
                    for &arg in self.arena.exprs(args) {
                        self.resolve_expr(arg, cx)?;
                    }
                    Ok(())
                }
            }
        })
    }

    /// Search the chain outward for a name; innermost frame is depth 0.
    fn lookup(&self, name: Name, cx: &ScopeCx) -> Option<LexicalAddress> {
        for (depth, &frame) in cx.chain.iter().rev().enumerate() {
            if let Some(index) = self.out.frame(frame).slot_of(name) {
                let depth = u32::try_from(depth).unwrap_or_else(|_| unreachable!());
                return Some(LexicalAddress::new(depth, index));
            }
        }
        None
    }
}
