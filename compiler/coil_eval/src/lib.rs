//! Coil Eval - the evaluation engine for the Coil dialect.
//!
//! This crate is both the iterative interpreter and the single home of the
//! runtime semantics the compiled target reuses:
//!
//! - `Value`, `Int`, `Complex`: the tagged value model and numeric tower
//! - `evaluate_binary` / `evaluate_unary` / `equals` / `compare`: operator
//!   semantics, including the precision-safe integer/float comparator
//! - `EnvArena`: frames addressed by stable ids, with temporal-dead-zone
//!   slots
//! - `Machine`: the pending-work/operand-stack evaluator that never
//!   recurses on the host stack per guest call
//! - `Budget`: cooperative step and wall-clock limits
//! - `RuntimeError` / `ErrorKind`: the unified error taxonomy both
//!   realizations classify into
//!
//! # Architecture
//!
//! Evaluation is explicit-state: tree nodes decompose onto a pending-work
//! stack, completed values collect on an operand stack, and the current
//! environment is an arena id. `run_program` resolves and evaluates in one
//! call; `MachineBuilder` is the fine-grained surface.

mod arith;
mod budget;
mod builtins;
mod env;
mod errors;
mod machine;
mod outcome;
mod value;

pub use arith::{compare, equals, evaluate_binary, evaluate_unary};
pub use budget::{Budget, BudgetMeter};
pub use builtins::Builtin;
pub use env::{EnvArena, EnvId};
pub use errors::{
    arity_mismatch, name_error, not_a_pair, not_callable, unbound_local, unsupported_binary,
    unsupported_unary, zero_division, ErrorKind, EvalResult, RuntimeError,
    COMPLEX_DIV_BY_ZERO, DIV_BY_ZERO, FLOAT_DIV_BY_ZERO, FLOAT_FLOORDIV_BY_ZERO,
    FLOAT_MOD_BY_ZERO, INT_FLOORDIV_OR_MOD_BY_ZERO, ZERO_TO_NEGATIVE_POWER,
};
pub use machine::{run_program, Machine, MachineBuilder};
pub use outcome::Outcome;
pub use value::{
    display, format_complex, format_float, repr, ClosureValue, Complex, Heap, Int, Value,
};
