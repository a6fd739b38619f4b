//! The iterative evaluation machine.
//!
//! The engine never recurses on the host call stack per guest call: guest
//! programs routinely recurse thousands of levels deep. Three explicit
//! structures drive evaluation:
//!
//! - a **pending-work stack** of tree nodes and primitive instructions
//! - an **operand stack** of completed values
//! - the **current environment** id
//!
//! Popping a tree node pushes its decomposition: subexpressions in
//! right-to-left push order (so they evaluate left-to-right) followed by
//! the one primitive instruction that consumes their results. Popping an
//! instruction pops its operands, performs the effect, and pushes any
//! result. The run ends when the pending-work stack empties; the operand
//! left on the stack is the program result.
//!
//! Function calls push an environment-restore instruction and continue
//! iteratively, so guest recursion costs pending/operand stack space, not
//! host frames. The budget check in the driver loop is the engine's only
//! cancellation point.
//!
//! One machine is one run: it owns its environment arena, stacks, and
//! budget meter exclusively, and nothing is shared across runs.

mod step;


use coil_ir::{
    BinaryOp, BoolOp, ExprArena, ExprId, FuncId, Program, Span, StmtId, StmtRange, StringInterner,
    UnaryOp,
};
use coil_resolve::{resolve_program, FrameId, LexicalAddress, ResolvedProgram};
use tracing::debug;

use crate::budget::{Budget, BudgetMeter};
use crate::builtins::Builtin;
use crate::env::{EnvArena, EnvId};
use crate::errors::RuntimeError;
use crate::outcome::Outcome;
use crate::value::{display, Value};

/// One entry on the pending-work stack.
#[derive(Clone, Debug)]
enum WorkItem {
    Expr(ExprId),
    Stmt(StmtId),
    Block(StmtRange),
    Instr(Instr),
}

/// A primitive step: pops its operands, performs one effect, pushes any
/// result.
#[derive(Clone, Debug)]
enum Instr {
    /// Pop rhs then lhs, push the operator result.
    Binary(BinaryOp),
    /// Pop the operand, push the operator result.
    Unary(UnaryOp),
    /// Pop the left operand; either it decides the result and is pushed
    /// back, or the right operand is scheduled. The right side is never
    /// decomposed early, so short-circuiting has no side effects.
    ShortCircuit { op: BoolOp, right: ExprId },
    /// Pop the condition, schedule one branch expression.
    BranchExpr { then: ExprId, orelse: ExprId },
    /// Pop the condition, schedule one branch block (statement value:
    /// `None`, via `ToNone`).
    BranchStmt { then_body: StmtRange, orelse: StmtRange },
    /// Pop the loop condition; truthy reschedules body + test, falsy
    /// pushes the loop's statement value (`None`).
    LoopTest { cond: ExprId, body: StmtRange },
    /// Pop a value, store through the lexical address, push `None`.
    Store { addr: LexicalAddress },
    /// Push a closure capturing the current environment.
    MakeClosure { func: FuncId },
    /// Pop `argc` arguments and the callee, enter the call.
    Apply { argc: u32, span: Span },
    /// Pop the return value, unwind to the function boundary, push it.
    Return,
    /// Restore the caller's environment (the function-boundary marker).
    RestoreEnv { env: EnvId },
    /// Pop and discard one value (statement sequencing).
    Discard,
    /// Pop one value, push `None` (statement-value boundary).
    ToNone,
    /// Push `None`.
    PushNone,
}

/// Builder for a single-run machine.
pub struct MachineBuilder<'a> {
    arena: &'a ExprArena,
    resolved: &'a ResolvedProgram,
    interner: &'a StringInterner,
    budget: Budget,
}

impl<'a> MachineBuilder<'a> {
    pub fn new(
        arena: &'a ExprArena,
        resolved: &'a ResolvedProgram,
        interner: &'a StringInterner,
    ) -> Self {
        MachineBuilder {
            arena,
            resolved,
            interner,
            budget: Budget::UNLIMITED,
        }
    }

    /// Set the step/time budget.
    #[must_use]
    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn build(self) -> Machine<'a> {
        let mut envs = EnvArena::new();
        let builtin_env = envs.alloc(None, FrameId::BUILTINS, Builtin::ALL.len());
        for builtin in Builtin::ALL {
            envs.bind_slot(
                builtin_env,
                builtin.table_index() as usize,
                Value::Builtin(builtin),
            );
        }
        let module_size = self.resolved.frame(FrameId::MODULE).slot_count();
        let module_env = envs.alloc(Some(builtin_env), FrameId::MODULE, module_size);
        Machine {
            arena: self.arena,
            resolved: self.resolved,
            interner: self.interner,
            envs,
            env: module_env,
            pending: Vec::new(),
            operands: Vec::new(),
            meter: BudgetMeter::new(self.budget),
        }
    }
}

/// The iterative evaluator. One machine is one run.
pub struct Machine<'a> {
    arena: &'a ExprArena,
    resolved: &'a ResolvedProgram,
    interner: &'a StringInterner,
    envs: EnvArena,
    env: EnvId,
    pending: Vec<WorkItem>,
    operands: Vec<Value>,
    meter: BudgetMeter,
}

impl Machine<'_> {
    /// Evaluate the program body to an outcome.
    pub fn run(&mut self, body: StmtRange) -> Outcome {
        debug!(stmts = body.len(), "machine run start");
        self.pending.push(WorkItem::Block(body));
        loop {
            if self.meter.tick() {
                debug!(steps = self.meter.steps(), "budget exhausted");
                return Outcome::Suspended;
            }
            let Some(item) = self.pending.pop() else { break };
            let result = match item {
                WorkItem::Expr(id) => self.step_expr(id),
                WorkItem::Stmt(id) => self.step_stmt(id),
                WorkItem::Block(range) => {
                    self.step_block(range);
                    Ok(())
                }
                WorkItem::Instr(instr) => self.step_instr(instr),
            };
            if let Err(err) = result {
                debug!(steps = self.meter.steps(), error = %err, "machine run failed");
                return Outcome::Failed(err);
            }
        }
        let value = self.operands.pop().unwrap_or(Value::None);
        let rendered = display(&value, self.interner);
        debug!(steps = self.meter.steps(), "machine run finished");
        Outcome::Finished { value, rendered }
    }

    /// Frames allocated so far (root environments included).
    pub fn frame_count(&self) -> usize {
        self.envs.len()
    }
}

/// Resolve and evaluate a complete program under a budget.
///
/// Resolution failures surface through the unified error taxonomy as a
/// `Failed` outcome.
pub fn run_program(program: &Program, budget: Budget) -> Outcome {
    let builtin_names = Builtin::interned_names(&program.interner);
    match resolve_program(&program.arena, program.body, &builtin_names) {
        Err(err) => Outcome::Failed(RuntimeError::from_resolve(err, &program.interner)),
        Ok(resolved) => MachineBuilder::new(&program.arena, &resolved, &program.interner)
            .budget(budget)
            .build()
            .run(program.body),
    }
}
