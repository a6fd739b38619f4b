//! Decomposition and primitive-instruction execution.

use coil_ir::{ExprId, ExprKind, FuncBody, FuncId, Name, Span, StmtId, StmtKind, StmtRange};
use smallvec::SmallVec;

use crate::arith::{evaluate_binary, evaluate_unary};
use crate::errors::{arity_mismatch, name_error, not_callable, unbound_local, RuntimeError};
use crate::value::{ClosureValue, Complex, Int, Value};

use super::{Instr, Machine, WorkItem};

impl Machine<'_> {
    /// Decompose (or directly evaluate) one expression node.
    pub(super) fn step_expr(&mut self, id: ExprId) -> Result<(), RuntimeError> {
        let expr = *self.arena.expr(id);
        match expr.kind {
            ExprKind::Int(int_id) => {
                let value = Int::from_bigint(self.arena.int(int_id).clone());
                self.operands.push(Value::Int(value));
            }
            ExprKind::Float(bits) => self.operands.push(Value::Float(f64::from_bits(bits))),
            ExprKind::Imaginary(bits) => self
                .operands
                .push(Value::Complex(Complex::new(0.0, f64::from_bits(bits)))),
            ExprKind::Bool(b) => self.operands.push(Value::Bool(b)),
            ExprKind::Str(name) => self
                .operands
                .push(Value::string(self.interner.lookup(name))),
            ExprKind::NoneLit => self.operands.push(Value::None),
            ExprKind::Ident(name) => {
                let value = self.load(id, name, expr.span)?;
                self.operands.push(value);
            }
            ExprKind::Unary { op, operand } => {
                self.pending.push(WorkItem::Instr(Instr::Unary(op)));
                self.pending.push(WorkItem::Expr(operand));
            }
            ExprKind::Binary { op, left, right } => {
                self.pending.push(WorkItem::Instr(Instr::Binary(op)));
                self.pending.push(WorkItem::Expr(right));
                self.pending.push(WorkItem::Expr(left));
            }
            ExprKind::Logical { op, left, right } => {
                self.pending
                    .push(WorkItem::Instr(Instr::ShortCircuit { op, right }));
                self.pending.push(WorkItem::Expr(left));
            }
            ExprKind::Conditional { cond, then, orelse } => {
                self.pending
                    .push(WorkItem::Instr(Instr::BranchExpr { then, orelse }));
                self.pending.push(WorkItem::Expr(cond));
            }
            ExprKind::Lambda(func) => {
                let closure = self.make_closure(func);
                self.operands.push(closure);
            }
            ExprKind::Call { callee, args } => {
                let arg_ids = self.arena.exprs(args);
                self.pending.push(WorkItem::Instr(Instr::Apply {
                    argc: args.len,
                    span: expr.span,
                }));
                for &arg in arg_ids.iter().rev() {
                    self.pending.push(WorkItem::Expr(arg));
                }
                self.pending.push(WorkItem::Expr(callee));
            }
        }
        Ok(())
    }

    /// Decompose one statement. Every statement leaves exactly one value
    /// on the operand stack; only an expression statement's value is not
    /// `None`.
    pub(super) fn step_stmt(&mut self, id: StmtId) -> Result<(), RuntimeError> {
        let stmt = *self.arena.stmt(id);
        match stmt.kind {
            StmtKind::Expr(expr) => self.pending.push(WorkItem::Expr(expr)),
            StmtKind::Assign { value, .. } => {
                let addr = self
                    .resolved
                    .store_address(id)
                    .unwrap_or_else(|| unreachable!("assignment resolved during analysis"));
                self.pending.push(WorkItem::Instr(Instr::Store { addr }));
                self.pending.push(WorkItem::Expr(value));
            }
            StmtKind::Return(value) => {
                self.pending.push(WorkItem::Instr(Instr::Return));
                match value {
                    Some(expr) => self.pending.push(WorkItem::Expr(expr)),
                    None => self.pending.push(WorkItem::Instr(Instr::PushNone)),
                }
            }
            StmtKind::If {
                cond,
                then_body,
                orelse,
            } => {
                self.pending.push(WorkItem::Instr(Instr::BranchStmt {
                    then_body,
                    orelse,
                }));
                self.pending.push(WorkItem::Expr(cond));
            }
            StmtKind::While { cond, body } => {
                self.pending
                    .push(WorkItem::Instr(Instr::LoopTest { cond, body }));
                self.pending.push(WorkItem::Expr(cond));
            }
            StmtKind::Break => self.unwind_loop(true),
            StmtKind::Continue => self.unwind_loop(false),
            StmtKind::FunctionDef(func) => {
                let addr = self
                    .resolved
                    .store_address(id)
                    .unwrap_or_else(|| unreachable!("definition resolved during analysis"));
                self.pending.push(WorkItem::Instr(Instr::Store { addr }));
                self.pending
                    .push(WorkItem::Instr(Instr::MakeClosure { func }));
            }
            // Declarations are analysis-time; at run time they are the
            // statement value None.
            StmtKind::Nonlocal { .. } | StmtKind::Global { .. } | StmtKind::Pass => {
                self.operands.push(Value::None);
            }
        }
        Ok(())
    }

    /// Decompose a statement block: statements run in order, every value
    /// but the last is discarded, an empty block is worth `None`.
    pub(super) fn step_block(&mut self, range: StmtRange) {
        let stmts = self.arena.stmts(range);
        match stmts.split_last() {
            None => self.operands.push(Value::None),
            Some((&last, init)) => {
                self.pending.push(WorkItem::Stmt(last));
                for &stmt in init.iter().rev() {
                    self.pending.push(WorkItem::Instr(Instr::Discard));
                    self.pending.push(WorkItem::Stmt(stmt));
                }
            }
        }
    }

    /// Execute one primitive instruction.
    pub(super) fn step_instr(&mut self, instr: Instr) -> Result<(), RuntimeError> {
        match instr {
            Instr::Binary(op) => {
                let right = self.pop_operand();
                let left = self.pop_operand();
                let result = evaluate_binary(op, left, right)?;
                self.operands.push(result);
            }
            Instr::Unary(op) => {
                let operand = self.pop_operand();
                let result = evaluate_unary(op, operand)?;
                self.operands.push(result);
            }
            Instr::ShortCircuit { op, right } => {
                let left = self.pop_operand();
                let decided = match op {
                    coil_ir::BoolOp::And => !left.is_truthy(),
                    coil_ir::BoolOp::Or => left.is_truthy(),
                };
                if decided {
                    // The left operand is the result, uncoerced.
                    self.operands.push(left);
                } else {
                    self.pending.push(WorkItem::Expr(right));
                }
            }
            Instr::BranchExpr { then, orelse } => {
                let cond = self.pop_operand();
                let chosen = if cond.is_truthy() { then } else { orelse };
                self.pending.push(WorkItem::Expr(chosen));
            }
            Instr::BranchStmt {
                then_body,
                orelse,
            } => {
                let cond = self.pop_operand();
                let chosen = if cond.is_truthy() { then_body } else { orelse };
                self.pending.push(WorkItem::Instr(Instr::ToNone));
                self.pending.push(WorkItem::Block(chosen));
            }
            Instr::LoopTest { cond, body } => {
                let test = self.pop_operand();
                if test.is_truthy() {
                    self.pending
                        .push(WorkItem::Instr(Instr::LoopTest { cond, body }));
                    self.pending.push(WorkItem::Expr(cond));
                    self.pending.push(WorkItem::Instr(Instr::Discard));
                    self.pending.push(WorkItem::Block(body));
                } else {
                    self.operands.push(Value::None);
                }
            }
            Instr::Store { addr } => {
                let value = self.pop_operand();
                self.envs.write(self.env, addr, value);
                self.operands.push(Value::None);
            }
            Instr::MakeClosure { func } => {
                let closure = self.make_closure(func);
                self.operands.push(closure);
            }
            Instr::Apply { argc, span } => self.apply(argc, span)?,
            Instr::Return => {
                let value = self.pop_operand();
                loop {
                    match self.pending.pop() {
                        Some(WorkItem::Instr(Instr::RestoreEnv { env })) => {
                            self.env = env;
                            break;
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                self.operands.push(value);
            }
            Instr::RestoreEnv { env } => self.env = env,
            Instr::Discard => {
                self.pop_operand();
            }
            Instr::ToNone => {
                self.pop_operand();
                self.operands.push(Value::None);
            }
            Instr::PushNone => self.operands.push(Value::None),
        }
        Ok(())
    }

    /// `break`/`continue`: unwind pending work to the nearest enclosing
    /// loop test. Never crosses a function boundary.
    fn unwind_loop(&mut self, is_break: bool) {
        while let Some(item) = self.pending.pop() {
            match item {
                WorkItem::Instr(Instr::LoopTest { cond, body }) => {
                    if is_break {
                        // The while statement still owes its value.
                        self.operands.push(Value::None);
                    } else {
                        self.pending
                            .push(WorkItem::Instr(Instr::LoopTest { cond, body }));
                        self.pending.push(WorkItem::Expr(cond));
                    }
                    return;
                }
                WorkItem::Instr(Instr::RestoreEnv { env }) => {
                    self.pending
                        .push(WorkItem::Instr(Instr::RestoreEnv { env }));
                    break;
                }
                _ => {}
            }
        }
        // No enclosing loop (the parser normally rejects this): the
        // statement degrades to its value.
        self.operands.push(Value::None);
    }

    /// Enter a call: verify the callee, bind arguments into a fresh frame
    /// parented to the closure's captured environment (never the
    /// caller's), and schedule the body with an environment restore.
    fn apply(&mut self, argc: u32, span: Span) -> Result<(), RuntimeError> {
        let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(argc as usize);
        for _ in 0..argc {
            args.push(self.pop_operand());
        }
        args.reverse();
        let callee = self.pop_operand();
        match callee {
            Value::Builtin(builtin) => {
                builtin.check_arity(argc).map_err(|e| e.with_span(span))?;
                let result = builtin.call(&args).map_err(|e| e.with_span(span))?;
                self.operands.push(result);
            }
            Value::Closure(closure) => {
                if argc != closure.arity {
                    return Err(arity_mismatch(
                        self.closure_name(closure.name),
                        closure.arity,
                        argc,
                    )
                    .with_span(span));
                }
                let frame = self.resolved.frame_of_func(closure.func);
                let size = self.resolved.frame(frame).slot_count();
                let callee_env = self.envs.alloc(Some(closure.env), frame, size);
                for (index, arg) in args.into_iter().enumerate() {
                    self.envs.bind_slot(callee_env, index, arg);
                }
                self.pending
                    .push(WorkItem::Instr(Instr::RestoreEnv { env: self.env }));
                match self.arena.func(closure.func).body {
                    FuncBody::Expr(expr) => self.pending.push(WorkItem::Expr(expr)),
                    FuncBody::Block(body) => {
                        // A block-bodied function without an explicit
                        // return yields None.
                        self.pending.push(WorkItem::Instr(Instr::ToNone));
                        self.pending.push(WorkItem::Block(body));
                    }
                }
                self.env = callee_env;
            }
            other => return Err(not_callable(other.type_name()).with_span(span)),
        }
        Ok(())
    }

    fn make_closure(&self, func: FuncId) -> Value {
        let def = self.arena.func(func);
        Value::Closure(ClosureValue {
            func,
            name: def.name,
            arity: def.params.len,
            env: self.env,
        })
    }

    /// Read a resolved identifier; an unbound slot is the temporal dead
    /// zone error.
    fn load(&self, id: ExprId, name: Name, span: Span) -> Result<Value, RuntimeError> {
        let Some(addr) = self.resolved.load_address(id) else {
            return Err(name_error(self.interner.lookup(name)).with_span(span));
        };
        match self.envs.read(self.env, addr) {
            Some(value) => Ok(value.clone()),
            None => Err(unbound_local(self.interner.lookup(name)).with_span(span)),
        }
    }

    fn closure_name(&self, name: Name) -> String {
        if name.is_empty() {
            "<lambda>".to_owned()
        } else {
            self.interner.lookup(name).to_owned()
        }
    }

    fn pop_operand(&mut self) -> Value {
        self.operands
            .pop()
            .unwrap_or_else(|| unreachable!("operand stack underflow"))
    }
}
