//! Resolved-program data: frame layouts and lexical addresses.

use coil_ir::{ExprId, FuncId, Name, StmtId};
use rustc_hash::FxHashMap;

/// Index of a frame layout in the resolved program.
///
/// Frame 0 is always the builtin frame; frame 1 the module frame; every
/// function body gets one further layout.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct FrameId(u32);

impl FrameId {
    /// The builtin frame, outermost ancestor of every chain.
    pub const BUILTINS: FrameId = FrameId(0);
    /// The module (top-level program) frame.
    pub const MODULE: FrameId = FrameId(1);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        FrameId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A lexical `(depth, index)` address.
///
/// Depth counts frames from the currently executing one outward to the
/// frame where the name is declared; index is the declaration-order slot
/// within that frame. Identical for interpretation and compilation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LexicalAddress {
    pub depth: u32,
    pub index: u32,
}

impl LexicalAddress {
    #[inline]
    pub const fn new(depth: u32, index: u32) -> Self {
        LexicalAddress { depth, index }
    }
}

/// The fixed binding layout of one frame.
///
/// Slot order and count are decided here, at analysis time, and never
/// change at run time.
#[derive(Clone, Debug)]
pub struct FrameLayout {
    /// Slot names in declaration order: parameters first, then assigned
    /// and `def`-bound names, minus `nonlocal` names.
    pub names: Vec<Name>,
    /// Whether this layout belongs to a function body (false for the
    /// builtin and module frames). `nonlocal` resolution only considers
    /// function frames.
    pub is_function: bool,
    /// The function this layout belongs to, if any.
    pub func: Option<FuncId>,
    /// The lexically enclosing frame (`None` only for the builtin frame).
    /// Mirrors the runtime parent chain, so diagnostics can name a slot
    /// reached through a `(depth, index)` address without a live frame.
    pub parent: Option<FrameId>,
    /// Names declared `global` in this frame. Recorded only; the `global`
    /// statement deliberately has no further semantics.
    pub globals: Vec<Name>,
}

impl FrameLayout {
    /// Find the slot index of a name in this frame.
    pub fn slot_of(&self, name: Name) -> Option<u32> {
        self.names
            .iter()
            .position(|&n| n == name)
            .map(|i| u32::try_from(i).unwrap_or_else(|_| unreachable!()))
    }

    /// Number of slots in this frame.
    pub fn slot_count(&self) -> usize {
        self.names.len()
    }
}

/// Output of resolution: every frame layout plus the address decoration
/// for identifier loads and assignment stores.
#[derive(Debug, Default)]
pub struct ResolvedProgram {
    pub(crate) frames: Vec<FrameLayout>,
    pub(crate) func_frames: FxHashMap<FuncId, FrameId>,
    pub(crate) loads: FxHashMap<ExprId, LexicalAddress>,
    pub(crate) stores: FxHashMap<StmtId, LexicalAddress>,
}

impl ResolvedProgram {
    /// Layout of a frame.
    #[inline]
    pub fn frame(&self, id: FrameId) -> &FrameLayout {
        &self.frames[id.index()]
    }

    /// All frame layouts, builtins first.
    pub fn frames(&self) -> &[FrameLayout] {
        &self.frames
    }

    /// The frame a function body executes in.
    ///
    /// # Panics
    /// Panics if the function was not part of the resolved tree.
    pub fn frame_of_func(&self, func: FuncId) -> FrameId {
        self.func_frames[&func]
    }

    /// Address of an identifier use, if the expression is one.
    #[inline]
    pub fn load_address(&self, expr: ExprId) -> Option<LexicalAddress> {
        self.loads.get(&expr).copied()
    }

    /// Address of an assignment or `def` target, if the statement is one.
    #[inline]
    pub fn store_address(&self, stmt: StmtId) -> Option<LexicalAddress> {
        self.stores.get(&stmt).copied()
    }

    /// Number of frames (builtins and module included).
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
