//! Resolution errors.
//!
//! These carry interned `Name`s rather than strings; the engine stringifies
//! them against the program's interner when it folds them into its unified
//! error taxonomy.

use std::fmt;

use coil_ir::{Name, Span, StringInterner};

/// Typed resolution error category.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ResolveErrorKind {
    /// Name declared in no reachable frame and not a builtin.
    Undeclared { name: Name },
    /// `nonlocal` with no binding in any strictly enclosing function frame.
    NonlocalMissing { name: Name },
    /// `nonlocal` naming a parameter of the current frame.
    NonlocalParameter { name: Name },
    /// Name used or assigned before its `nonlocal` declaration.
    UsedBeforeNonlocal { name: Name },
}

impl ResolveErrorKind {
    /// The name the error is about.
    pub fn name(self) -> Name {
        match self {
            Self::Undeclared { name }
            | Self::NonlocalMissing { name }
            | Self::NonlocalParameter { name }
            | Self::UsedBeforeNonlocal { name } => name,
        }
    }
}

/// A resolution failure.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub span: Span,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, span: Span) -> Self {
        ResolveError { kind, span }
    }

    /// Render the error message against the program's interner.
    pub fn render(&self, interner: &StringInterner) -> String {
        let name = interner.lookup(self.kind.name());
        match self.kind {
            ResolveErrorKind::Undeclared { .. } => {
                format!("name '{name}' is not defined")
            }
            ResolveErrorKind::NonlocalMissing { .. } => {
                format!("no binding for nonlocal '{name}' found")
            }
            ResolveErrorKind::NonlocalParameter { .. } => {
                format!("name '{name}' is parameter and nonlocal")
            }
            ResolveErrorKind::UsedBeforeNonlocal { .. } => {
                format!("name '{name}' is used prior to nonlocal declaration")
            }
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResolveErrorKind::Undeclared { name } => {
                write!(f, "name #{} is not defined", name.raw())
            }
            ResolveErrorKind::NonlocalMissing { name } => {
                write!(f, "no binding for nonlocal #{} found", name.raw())
            }
            ResolveErrorKind::NonlocalParameter { name } => {
                write!(f, "name #{} is parameter and nonlocal", name.raw())
            }
            ResolveErrorKind::UsedBeforeNonlocal { name } => {
                write!(f, "name #{} is used prior to nonlocal declaration", name.raw())
            }
        }
    }
}

impl std::error::Error for ResolveError {}
