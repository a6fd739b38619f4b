//! Coil VM - the compiled realization of the Coil engine.
//!
//! Translates resolved program trees into per-function instruction
//! sequences and executes them as a stack machine over a bump-allocated
//! linear memory with a bit-exact tagged-value contract (`mem`). All
//! value semantics delegate to `coil_eval`, so the interpreter and this
//! target agree on every observable value, error kind, and evaluation
//! order - `run_compiled` is a drop-in counterpart to
//! `coil_eval::run_program`.

mod compile;
mod instr;
pub mod mem;
mod vm;

pub use compile::{compile_program, CompileError};
pub use instr::{CompiledFunction, CompiledProgram, Const, Instruction, USER_FUNC_BASE};
pub use vm::Vm;

use coil_eval::{Budget, Builtin, Outcome, RuntimeError};
use coil_ir::Program;
use coil_resolve::resolve_program;

/// Resolve, compile, and execute a complete program under a budget.
///
/// Resolution failures surface through the unified error taxonomy, as on
/// the interpreted path; compilation failures are structural limits of
/// the memory contract and surface as their own error.
pub fn run_compiled(program: &Program, budget: Budget) -> Result<Outcome, CompileError> {
    let builtin_names = Builtin::interned_names(&program.interner);
    let resolved = match resolve_program(&program.arena, program.body, &builtin_names) {
        Ok(resolved) => resolved,
        Err(err) => {
            return Ok(Outcome::Failed(RuntimeError::from_resolve(
                err,
                &program.interner,
            )))
        }
    };
    let compiled = compile_program(&program.arena, &resolved, &program.interner, program.body)?;
    Ok(Vm::new(&compiled, &resolved, &program.interner)
        .with_budget(budget)
        .run())
}
