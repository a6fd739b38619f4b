//! Static name resolution for Coil programs.
//!
//! Runs once over a program tree, before evaluation or compilation, and
//! produces the [`ResolvedProgram`] both realizations consume:
//!
//! - **Declaration collection**: each function/program body yields a frame
//!   layout - parameters first, then every name assigned or `def`-bound at
//!   that level, in first-encounter order. The walk descends into `if` and
//!   `while` bodies (the dialect has function-level scoping only) but never
//!   into nested function bodies.
//! - **`nonlocal` handling**: a `nonlocal` name is removed from the current
//!   frame's layout so lookups skip the frame. The declaration is validated
//!   against strictly enclosing *function* frames; a parameter cannot be
//!   `nonlocal`, and any use or store of the name textually before its
//!   `nonlocal` statement is an error.
//! - **`global` handling**: accepted and recorded on the frame layout;
//!   deliberately no further semantics (documented incompleteness).
//! - **Lexical addressing**: every identifier use and assignment target is
//!   mapped to a `(depth, index)` address. Depth counts frames outward from
//!   the executing frame; index is the declaration-order slot.
//!
//! Frame layouts are fixed here and never change at run time; the engine's
//! environment arena and the compiled target's environment records both
//! mirror them slot for slot.

mod errors;
mod program;
mod resolver;

#[cfg(test)]
mod tests;

pub use errors::{ResolveError, ResolveErrorKind};
pub use program::{FrameId, FrameLayout, LexicalAddress, ResolvedProgram};
pub use resolver::resolve_program;
