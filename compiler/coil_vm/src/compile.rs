//! Per-function bytecode compilation.
//!
//! Each function body (the module body included) compiles ahead of time
//! into one fixed instruction sequence against the resolved lexical
//! addresses. The compiled program is observably identical to the
//! interpreter for every value, error, and evaluation order: operands
//! are compiled left-to-right, short-circuit operators use keep-variant
//! jumps, and statements leave no values behind except the module body's
//! trailing expression statement, which becomes the program result.

use coil_ir::{
    ExprArena, ExprId, ExprKind, FuncBody, FuncId, Name, StmtId, StmtKind, StmtRange,
    StringInterner,
};
use coil_resolve::{FrameId, LexicalAddress, ResolvedProgram};
use coil_stack::ensure_headroom;
use tracing::debug;

use crate::instr::{CompiledFunction, CompiledProgram, Const, Instruction};

/// Compilation failures: structural limits of the memory contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// A frame needs more slots than the closure payload's 8-bit
    /// captured-frame-size field can carry.
    FrameTooLarge { name: Name, slots: usize },
    /// More parameters than the closure payload's 8-bit arity field.
    ArityTooLarge { name: Name, params: usize },
    /// The function table exceeds its 16-bit tag space.
    TooManyFunctions,
    /// `break` or `continue` outside a loop.
    LoopControlOutsideLoop,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrameTooLarge { slots, .. } => {
                write!(f, "frame needs {slots} slots, the closure encoding carries 255")
            }
            Self::ArityTooLarge { params, .. } => {
                write!(f, "function takes {params} parameters, the closure encoding carries 255")
            }
            Self::TooManyFunctions => write!(f, "function table exceeds 16-bit tags"),
            Self::LoopControlOutsideLoop => {
                write!(f, "break or continue outside a loop")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Compile a resolved program.
pub fn compile_program(
    arena: &ExprArena,
    resolved: &ResolvedProgram,
    interner: &StringInterner,
    body: StmtRange,
) -> Result<CompiledProgram, CompileError> {
    let mut compiler = Compiler {
        arena,
        resolved,
        interner,
        functions: Vec::new(),
    };
    let entry = compiler.compile_body(Name::EMPTY, None, FrameId::MODULE, Body::Module(body))?;
    debug!(functions = compiler.functions.len(), "compiled program");
    Ok(CompiledProgram {
        functions: compiler.functions,
        entry,
    })
}

/// What a function body compiles from.
enum Body {
    /// Module body: the trailing expression statement's value is kept as
    /// the program result.
    Module(StmtRange),
    /// `def` body: statement values are dropped, falls through to None.
    Block(StmtRange),
    /// Lambda body: the expression is the return value.
    Expr(ExprId),
}

/// Per-function emission state.
struct FnCtx {
    code: Vec<Instruction>,
    consts: Vec<Const>,
    /// Enclosing loops: (continue target, break patch sites).
    loops: Vec<LoopCtx>,
}

struct LoopCtx {
    start: u32,
    breaks: Vec<usize>,
}

impl FnCtx {
    fn emit(&mut self, instr: Instruction) -> usize {
        self.code.push(instr);
        self.code.len() - 1
    }

    fn here(&self) -> u32 {
        u32::try_from(self.code.len()).unwrap_or_else(|_| panic!("code exceeds u32 targets"))
    }

    fn add_const(&mut self, constant: Const) -> u32 {
        let index = u32::try_from(self.consts.len())
            .unwrap_or_else(|_| panic!("constant pool exceeds u32 indices"));
        self.consts.push(constant);
        index
    }

    /// Patch a previously emitted jump to land here.
    fn patch_to_here(&mut self, at: usize) {
        let target = self.here();
        match &mut self.code[at] {
            Instruction::Jump(t)
            | Instruction::PopJumpIfFalse(t)
            | Instruction::JumpIfFalsyKeep(t)
            | Instruction::JumpIfTruthyKeep(t) => *t = target,
            other => unreachable!("patching a non-jump instruction {other:?}"),
        }
    }
}

struct Compiler<'a> {
    arena: &'a ExprArena,
    resolved: &'a ResolvedProgram,
    interner: &'a StringInterner,
    functions: Vec<CompiledFunction>,
}

impl Compiler<'_> {
    /// Compile one function body into a table entry; returns its index.
    fn compile_body(
        &mut self,
        name: Name,
        func: Option<FuncId>,
        frame: FrameId,
        body: Body,
    ) -> Result<usize, CompileError> {
        let layout = self.resolved.frame(frame);
        let slots = layout.slot_count();
        if slots > usize::from(u8::MAX) {
            return Err(CompileError::FrameTooLarge { name, slots });
        }
        let arity: u32 = func.map_or(0, |f| self.arena.func(f).params.len);
        if arity > u32::from(u8::MAX) {
            return Err(CompileError::ArityTooLarge {
                name,
                params: arity as usize,
            });
        }

        // Reserve the table slot first so nested functions compile after
        // their enclosing function's index is fixed.
        let index = self.functions.len();
        if index + usize::from(crate::instr::USER_FUNC_BASE) > usize::from(u16::MAX) {
            return Err(CompileError::TooManyFunctions);
        }
        self.functions.push(CompiledFunction {
            name,
            arity,
            frame,
            frame_size: u32::try_from(slots).unwrap_or_else(|_| unreachable!()),
            code: Vec::new(),
            consts: Vec::new(),
        });

        let mut ctx = FnCtx {
            code: Vec::new(),
            consts: Vec::new(),
            loops: Vec::new(),
        };
        match body {
            Body::Module(range) => {
                let kept = self.compile_module_block(&mut ctx, range)?;
                if !kept {
                    ctx.emit(Instruction::LoadNone);
                }
                ctx.emit(Instruction::Return);
            }
            Body::Block(range) => {
                self.compile_block(&mut ctx, range)?;
                ctx.emit(Instruction::LoadNone);
                ctx.emit(Instruction::Return);
            }
            Body::Expr(expr) => {
                self.compile_expr(&mut ctx, expr)?;
                ctx.emit(Instruction::Return);
            }
        }
        self.functions[index].code = ctx.code;
        self.functions[index].consts = ctx.consts;
        Ok(index)
    }

    /// Compile the module body; returns whether the final statement left
    /// the program result on the stack.
    fn compile_module_block(
        &mut self,
        ctx: &mut FnCtx,
        range: StmtRange,
    ) -> Result<bool, CompileError> {
        let stmts = self.arena.stmts(range);
        let Some((&last, init)) = stmts.split_last() else {
            return Ok(false);
        };
        for &stmt in init {
            self.compile_stmt(ctx, stmt)?;
        }
        if let StmtKind::Expr(expr) = self.arena.stmt(last).kind {
            self.compile_expr(ctx, expr)?;
            Ok(true)
        } else {
            self.compile_stmt(ctx, last)?;
            Ok(false)
        }
    }

    fn compile_block(&mut self, ctx: &mut FnCtx, range: StmtRange) -> Result<(), CompileError> {
        for &stmt in self.arena.stmts(range) {
            self.compile_stmt(ctx, stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, ctx: &mut FnCtx, id: StmtId) -> Result<(), CompileError> {
        let stmt = *self.arena.stmt(id);
        match stmt.kind {
            StmtKind::Expr(expr) => {
                self.compile_expr(ctx, expr)?;
                ctx.emit(Instruction::Pop);
            }
            StmtKind::Assign { value, .. } => {
                self.compile_expr(ctx, value)?;
                let addr = self
                    .resolved
                    .store_address(id)
                    .unwrap_or_else(|| unreachable!("assignment resolved during analysis"));
                ctx.emit(store(addr));
            }
            StmtKind::Return(value) => {
                match value {
                    Some(expr) => self.compile_expr(ctx, expr)?,
                    None => {
                        ctx.emit(Instruction::LoadNone);
                    }
                }
                ctx.emit(Instruction::Return);
            }
            StmtKind::If {
                cond,
                then_body,
                orelse,
            } => {
                self.compile_expr(ctx, cond)?;
                let to_else = ctx.emit(Instruction::PopJumpIfFalse(u32::MAX));
                self.compile_block(ctx, then_body)?;
                let to_end = ctx.emit(Instruction::Jump(u32::MAX));
                ctx.patch_to_here(to_else);
                self.compile_block(ctx, orelse)?;
                ctx.patch_to_here(to_end);
            }
            StmtKind::While { cond, body } => {
                let start = ctx.here();
                self.compile_expr(ctx, cond)?;
                let exit = ctx.emit(Instruction::PopJumpIfFalse(u32::MAX));
                ctx.loops.push(LoopCtx {
                    start,
                    breaks: vec![exit],
                });
                self.compile_block(ctx, body)?;
                ctx.emit(Instruction::Jump(start));
                let finished = ctx
                    .loops
                    .pop()
                    .unwrap_or_else(|| unreachable!("loop context pushed above"));
                for site in finished.breaks {
                    ctx.patch_to_here(site);
                }
            }
            StmtKind::Break => {
                let site = ctx.emit(Instruction::Jump(u32::MAX));
                match ctx.loops.last_mut() {
                    Some(current) => current.breaks.push(site),
                    None => return Err(CompileError::LoopControlOutsideLoop),
                }
            }
            StmtKind::Continue => {
                let target = match ctx.loops.last() {
                    Some(current) => current.start,
                    None => return Err(CompileError::LoopControlOutsideLoop),
                };
                ctx.emit(Instruction::Jump(target));
            }
            StmtKind::FunctionDef(func) => {
                let tag = self.compile_func(func)?;
                ctx.emit(Instruction::MakeClosure { func: tag });
                let addr = self
                    .resolved
                    .store_address(id)
                    .unwrap_or_else(|| unreachable!("definition resolved during analysis"));
                ctx.emit(store(addr));
            }
            // Analysis-time statements compile to nothing.
            StmtKind::Nonlocal { .. } | StmtKind::Global { .. } | StmtKind::Pass => {}
        }
        Ok(())
    }

    fn compile_expr(&mut self, ctx: &mut FnCtx, id: ExprId) -> Result<(), CompileError> {
        ensure_headroom(|| {
            let expr = *self.arena.expr(id);
            match expr.kind {
                ExprKind::Int(int_id) => {
                    let constant = Const::Int(self.arena.int(int_id).clone());
                    let index = ctx.add_const(constant);
                    ctx.emit(Instruction::LoadConst(index));
                }
                ExprKind::Float(bits) => {
                    let index = ctx.add_const(Const::Float(f64::from_bits(bits)));
                    ctx.emit(Instruction::LoadConst(index));
                }
                ExprKind::Imaginary(bits) => {
                    let index = ctx.add_const(Const::Complex {
                        re: 0.0,
                        im: f64::from_bits(bits),
                    });
                    ctx.emit(Instruction::LoadConst(index));
                }
                ExprKind::Bool(b) => {
                    let index = ctx.add_const(Const::Bool(b));
                    ctx.emit(Instruction::LoadConst(index));
                }
                ExprKind::Str(name) => {
                    let index = ctx.add_const(Const::Str(self.interner.lookup(name).to_owned()));
                    ctx.emit(Instruction::LoadConst(index));
                }
                ExprKind::NoneLit => {
                    ctx.emit(Instruction::LoadNone);
                }
                ExprKind::Ident(_) => {
                    let addr = self
                        .resolved
                        .load_address(id)
                        .unwrap_or_else(|| unreachable!("identifier resolved during analysis"));
                    ctx.emit(Instruction::LoadName {
                        depth: addr.depth,
                        index: addr.index,
                    });
                }
                ExprKind::Unary { op, operand } => {
                    self.compile_expr(ctx, operand)?;
                    ctx.emit(Instruction::UnaryOp(op));
                }
                ExprKind::Binary { op, left, right } => {
                    self.compile_expr(ctx, left)?;
                    self.compile_expr(ctx, right)?;
                    ctx.emit(Instruction::BinaryOp(op));
                }
                ExprKind::Logical { op, left, right } => {
                    self.compile_expr(ctx, left)?;
                    let short = match op {
                        coil_ir::BoolOp::And => {
                            ctx.emit(Instruction::JumpIfFalsyKeep(u32::MAX))
                        }
                        coil_ir::BoolOp::Or => {
                            ctx.emit(Instruction::JumpIfTruthyKeep(u32::MAX))
                        }
                    };
                    ctx.emit(Instruction::Pop);
                    self.compile_expr(ctx, right)?;
                    ctx.patch_to_here(short);
                }
                ExprKind::Conditional { cond, then, orelse } => {
                    self.compile_expr(ctx, cond)?;
                    let to_else = ctx.emit(Instruction::PopJumpIfFalse(u32::MAX));
                    self.compile_expr(ctx, then)?;
                    let to_end = ctx.emit(Instruction::Jump(u32::MAX));
                    ctx.patch_to_here(to_else);
                    self.compile_expr(ctx, orelse)?;
                    ctx.patch_to_here(to_end);
                }
                ExprKind::Lambda(func) => {
                    let tag = self.compile_func(func)?;
                    ctx.emit(Instruction::MakeClosure { func: tag });
                }
                ExprKind::Call { callee, args } => {
                    self.compile_expr(ctx, callee)?;
                    for &arg in self.arena.exprs(args) {
                        self.compile_expr(ctx, arg)?;
                    }
                    ctx.emit(Instruction::CallFunction { argc: args.len });
                }
            }
            Ok(())
        })
    }

    /// Compile a nested function definition; returns its table tag.
    fn compile_func(&mut self, func: FuncId) -> Result<u16, CompileError> {
        let def = *self.arena.func(func);
        let frame = self.resolved.frame_of_func(func);
        let body = match def.body {
            FuncBody::Expr(expr) => Body::Expr(expr),
            FuncBody::Block(range) => Body::Block(range),
        };
        let index = self.compile_body(def.name, Some(func), frame, body)?;
        let tag = u16::try_from(index + usize::from(crate::instr::USER_FUNC_BASE))
            .map_err(|_| CompileError::TooManyFunctions)?;
        Ok(tag)
    }
}

fn store(addr: LexicalAddress) -> Instruction {
    Instruction::StoreName {
        depth: addr.depth,
        index: addr.index,
    }
}
