//! Stack headroom for recursive tree walks.
//!
//! The evaluation engine itself is iterative and never recurses per guest
//! call, but the static-analysis and bytecode-compilation passes do walk
//! the program tree recursively. A parser is free to hand them expressions
//! nested thousands of levels deep (`((((...1...))))`), so those walks wrap
//! their recursion in [`ensure_headroom`] to grow the host stack on demand.
//!
//! # Platform Support
//!
//! - **Native targets**: uses the `stacker` crate to grow the stack.
//! - **WASM targets**: no-op passthrough (WASM manages its own stack).

/// Minimum stack space to keep available (64KB red zone).
///
/// If less than this amount remains, the stack is grown before recursing.
const RED_ZONE: usize = 64 * 1024;

/// Stack space to allocate when growing (2MB).
const GROWTH: usize = 2 * 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
///
/// Wrap the recursive step of a tree walk:
///
/// ```text
/// fn walk_expr(&mut self, id: ExprId) -> Result<(), ResolveError> {
///     ensure_headroom(|| {
///         // ... recurse into subexpressions ...
///     })
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_headroom<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, GROWTH, f)
}

/// WASM version - call directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_headroom<R>(f: impl FnOnce() -> R) -> R {
    f()
}
