//! The stack-machine execution loop.
//!
//! Runs a compiled program inside its own linear memory: a value stack of
//! (tag, payload) pairs, a call-frame stack of (function, pc, environment
//! record), and the bump heap. Guest calls push frames on the heap-backed
//! frame vector, never the host stack, so deep guest recursion is safe
//! here exactly as in the interpreter.
//!
//! Primitive operations decode operands through the memory codec and
//! delegate to `coil_eval`'s semantics functions, so both realizations
//! share one implementation of arithmetic, comparison, and formatting.
//! Unrecoverable conditions (reading the unbound sentinel, calling a
//! non-function) trap by classifying into the same error taxonomy as the
//! interpreter and terminating the instance.

use coil_eval::{
    display, evaluate_binary, evaluate_unary, not_callable, unbound_local, Budget, BudgetMeter,
    Builtin, Outcome, RuntimeError, Value,
};
use coil_ir::{Name, StringInterner};
use coil_resolve::{FrameId, ResolvedProgram};
use tracing::debug;

use crate::instr::{CompiledProgram, Const, Instruction, USER_FUNC_BASE};
use crate::mem::{
    self, alloc_env, env_read, env_write, pack_closure, read_pair, tag, unpack_closure,
    write_pair, write_slot, ClosureParts, LinearMemory, TaggedValue,
};

/// One active call.
#[derive(Copy, Clone, Debug)]
struct CallFrame {
    /// Function-table tag of the running function.
    func: u16,
    pc: u32,
    /// Address of the call's environment record.
    env: u32,
}

/// A single-run stack machine.
pub struct Vm<'a> {
    program: &'a CompiledProgram,
    resolved: &'a ResolvedProgram,
    interner: &'a StringInterner,
    mem: LinearMemory,
    stack: Vec<TaggedValue>,
    frames: Vec<CallFrame>,
    meter: BudgetMeter,
}

impl<'a> Vm<'a> {
    pub fn new(
        program: &'a CompiledProgram,
        resolved: &'a ResolvedProgram,
        interner: &'a StringInterner,
    ) -> Self {
        Vm {
            program,
            resolved,
            interner,
            mem: LinearMemory::new(),
            stack: Vec::new(),
            frames: Vec::new(),
            meter: BudgetMeter::new(Budget::UNLIMITED),
        }
    }

    /// Set the step/time budget.
    #[must_use]
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.meter = BudgetMeter::new(budget);
        self
    }

    /// Execute to an outcome. One machine instance is one run.
    pub fn run(mut self) -> Outcome {
        let builtin_env = self.install_builtins();
        let entry = &self.program.functions[self.program.entry];
        let module_env = alloc_env(&mut self.mem, builtin_env, entry.frame_size);
        self.frames.push(CallFrame {
            func: self.program.table_tag(self.program.entry),
            pc: 0,
            env: module_env,
        });
        debug!(functions = self.program.functions.len(), "vm run start");

        loop {
            if self.meter.tick() {
                debug!(steps = self.meter.steps(), "vm budget exhausted");
                return Outcome::Suspended;
            }
            let frame = *self
                .frames
                .last()
                .unwrap_or_else(|| unreachable!("frame stack underflow"));
            let function = self
                .program
                .user_function(frame.func)
                .unwrap_or_else(|| unreachable!("running a builtin frame"));
            let instr = function.code[frame.pc as usize].clone();
            self.bump_pc();
            match self.execute(&instr, frame) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Returned(value)) => {
                    if self.frames.is_empty() {
                        let value = mem::decode(&self.mem, value, self.program);
                        let rendered = display(&value, self.interner);
                        debug!(
                            steps = self.meter.steps(),
                            heap = self.mem.heap_size(),
                            "vm run finished"
                        );
                        return Outcome::Finished { value, rendered };
                    }
                    self.stack.push(value);
                }
                Err(err) => {
                    debug!(steps = self.meter.steps(), error = %err, "vm trapped");
                    return Outcome::Failed(err);
                }
            }
        }
    }

    fn install_builtins(&mut self) -> u32 {
        let count =
            u32::try_from(Builtin::ALL.len()).unwrap_or_else(|_| unreachable!());
        let env = alloc_env(&mut self.mem, 0, count);
        for builtin in Builtin::ALL {
            let payload = pack_closure(ClosureParts {
                func_tag: builtin.table_index() as u16,
                arity: builtin.arity() as u8,
                frame_size: 0,
                parent_env: 0,
            });
            write_slot(
                &mut self.mem,
                env,
                builtin.table_index(),
                TaggedValue {
                    tag: tag::CLOSURE,
                    payload,
                },
            );
        }
        env
    }

    fn bump_pc(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc += 1;
        }
    }

    fn jump(&mut self, target: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc = target;
        }
    }

    fn execute(&mut self, instr: &Instruction, frame: CallFrame) -> Result<Flow, RuntimeError> {
        match instr {
            Instruction::LoadConst(index) => {
                let function = self
                    .program
                    .user_function(frame.func)
                    .unwrap_or_else(|| unreachable!("running a builtin frame"));
                let constant = function.consts[*index as usize].clone();
                let value = self.const_value(&constant);
                self.stack.push(value);
            }
            Instruction::LoadNone => self.stack.push(TaggedValue::NONE),
            Instruction::LoadName { depth, index } => {
                let value = env_read(&self.mem, frame.env, *depth, *index);
                if value.tag == tag::UNBOUND {
                    let name = self.slot_name(frame.func, *depth, *index);
                    return Err(unbound_local(name));
                }
                self.stack.push(value);
            }
            Instruction::StoreName { depth, index } => {
                let value = self.pop();
                env_write(&mut self.mem, frame.env, *depth, *index, value);
            }
            Instruction::MakeClosure { func } => {
                let function = self
                    .program
                    .user_function(*func)
                    .unwrap_or_else(|| unreachable!("closure over a missing function"));
                let payload = pack_closure(ClosureParts {
                    func_tag: *func,
                    arity: function.arity as u8,
                    frame_size: function.frame_size as u8,
                    parent_env: frame.env,
                });
                self.stack.push(TaggedValue {
                    tag: tag::CLOSURE,
                    payload,
                });
            }
            Instruction::CallFunction { argc } => return self.call(*argc),
            Instruction::Return => {
                let value = self.pop();
                self.frames
                    .pop()
                    .unwrap_or_else(|| unreachable!("return without a frame"));
                return Ok(Flow::Returned(value));
            }
            Instruction::Jump(target) => self.jump(*target),
            Instruction::PopJumpIfFalse(target) => {
                let cond = self.pop();
                if !self.truthy(cond) {
                    self.jump(*target);
                }
            }
            Instruction::JumpIfFalsyKeep(target) => {
                let top = *self
                    .stack
                    .last()
                    .unwrap_or_else(|| unreachable!("value stack underflow"));
                if !self.truthy(top) {
                    self.jump(*target);
                }
            }
            Instruction::JumpIfTruthyKeep(target) => {
                let top = *self
                    .stack
                    .last()
                    .unwrap_or_else(|| unreachable!("value stack underflow"));
                if self.truthy(top) {
                    self.jump(*target);
                }
            }
            Instruction::BinaryOp(op) => {
                let right = self.pop();
                let left = self.pop();
                let left = mem::decode(&self.mem, left, self.program);
                let right = mem::decode(&self.mem, right, self.program);
                let result = evaluate_binary(*op, left, right)?;
                let encoded = self.encode_result(&result);
                self.stack.push(encoded);
            }
            Instruction::UnaryOp(op) => {
                let operand = self.pop();
                let operand = mem::decode(&self.mem, operand, self.program);
                let result = evaluate_unary(*op, operand)?;
                let encoded = self.encode_result(&result);
                self.stack.push(encoded);
            }
            Instruction::Pop => {
                self.pop();
            }
        }
        Ok(Flow::Continue)
    }

    /// Enter a call: builtins run inline, user functions push a frame
    /// over a fresh environment record parented to the closure's captured
    /// record.
    fn call(&mut self, argc: u32) -> Result<Flow, RuntimeError> {
        let args_base = self
            .stack
            .len()
            .checked_sub(argc as usize)
            .unwrap_or_else(|| unreachable!("value stack underflow"));
        let args: Vec<TaggedValue> = self.stack.split_off(args_base);
        let callee = self.pop();
        if callee.tag != tag::CLOSURE {
            return Err(not_callable(callee.type_name()));
        }
        let parts = unpack_closure(callee.payload);

        if parts.func_tag < USER_FUNC_BASE {
            let builtin = Builtin::from_index(u32::from(parts.func_tag))
                .unwrap_or_else(|| unreachable!("builtin tag out of range"));
            builtin.check_arity(argc)?;
            let result = self.call_builtin(builtin, &args)?;
            self.stack.push(result);
            return Ok(Flow::Continue);
        }

        let function = self
            .program
            .user_function(parts.func_tag)
            .unwrap_or_else(|| unreachable!("call to a missing function"));
        if argc != u32::from(parts.arity) {
            let name = if function.name.is_empty() {
                "<lambda>".to_owned()
            } else {
                self.interner.lookup(function.name).to_owned()
            };
            return Err(coil_eval::arity_mismatch(name, u32::from(parts.arity), argc));
        }
        let env = alloc_env(&mut self.mem, parts.parent_env, function.frame_size);
        for (index, arg) in args.into_iter().enumerate() {
            write_slot(
                &mut self.mem,
                env,
                u32::try_from(index).unwrap_or_else(|_| unreachable!()),
                arg,
            );
        }
        self.frames.push(CallFrame {
            func: parts.func_tag,
            pc: 0,
            env,
        });
        Ok(Flow::Continue)
    }

    /// Builtins: the pair family operates directly on memory records;
    /// `abs` round-trips through the shared semantics.
    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: &[TaggedValue],
    ) -> Result<TaggedValue, RuntimeError> {
        match builtin {
            Builtin::Pair => Ok(write_pair(&mut self.mem, args[0], args[1])),
            Builtin::Head => {
                if args[0].tag != tag::PAIR {
                    return Err(coil_eval::not_a_pair(args[0].type_name()));
                }
                Ok(read_pair(&self.mem, args[0]).0)
            }
            Builtin::Tail => {
                if args[0].tag != tag::PAIR {
                    return Err(coil_eval::not_a_pair(args[0].type_name()));
                }
                Ok(read_pair(&self.mem, args[0]).1)
            }
            Builtin::IsPair => Ok(TaggedValue::bool(args[0].tag == tag::PAIR)),
            Builtin::Abs => {
                let value = mem::decode(&self.mem, args[0], self.program);
                let result = builtin.call(&[value])?;
                Ok(self.encode_result(&result))
            }
        }
    }

    fn const_value(&mut self, constant: &Const) -> TaggedValue {
        match constant {
            Const::Int(big) => {
                let value = coil_eval::Int::from_bigint(big.clone());
                mem::encode_int(&mut self.mem, &value)
            }
            Const::Float(f) => TaggedValue {
                tag: tag::FLOAT,
                payload: f.to_bits(),
            },
            Const::Complex { re, im } => {
                let value = Value::complex(*re, *im);
                self.encode_result(&value)
            }
            Const::Str(s) => mem::encode_str(&mut self.mem, s),
            Const::Bool(b) => TaggedValue::bool(*b),
        }
    }

    /// Encode a semantics result. Arithmetic and builtins only produce
    /// data values, which always encode.
    fn encode_result(&mut self, value: &Value) -> TaggedValue {
        match mem::encode(&mut self.mem, value) {
            Ok(tv) => tv,
            Err(err) => unreachable!("primitive produced an unencodable {}", err.type_name),
        }
    }

    /// Truthiness without a full decode for the heap-only-truthy tags.
    fn truthy(&self, value: TaggedValue) -> bool {
        match value.tag {
            tag::PAIR | tag::CLOSURE => true,
            tag::BIG_INT => true, // never stores an i64-range (or zero) value
            _ => mem::decode(&self.mem, value, self.program).is_truthy(),
        }
    }

    /// Name of the slot behind a lexical address, via the static layout
    /// chain of the running function.
    fn slot_name(&self, func_tag: u16, depth: u32, index: u32) -> String {
        let mut frame_id = self
            .program
            .user_function(func_tag)
            .map_or(FrameId::MODULE, |f| f.frame);
        for _ in 0..depth {
            match self.resolved.frame(frame_id).parent {
                Some(parent) => frame_id = parent,
                None => break,
            }
        }
        let layout = self.resolved.frame(frame_id);
        layout
            .names
            .get(index as usize)
            .map_or_else(String::new, |&name: &Name| {
                self.interner.lookup(name).to_owned()
            })
    }

    /// Bytes used by the bump heap (diagnostic surface for embedders).
    pub fn heap_size(&self) -> usize {
        self.mem.heap_size()
    }

    fn pop(&mut self) -> TaggedValue {
        self.stack
            .pop()
            .unwrap_or_else(|| unreachable!("value stack underflow"))
    }
}

/// Result of executing one instruction.
enum Flow {
    Continue,
    Returned(TaggedValue),
}
