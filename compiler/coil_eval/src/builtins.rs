//! Engine-provided functions.
//!
//! Builtins occupy the outermost frame of every lexical chain, in
//! `Builtin::ALL` order; the resolver addresses them like any other
//! binding and the compiled target reserves the low function-table tags
//! for them.

use coil_ir::{Name, StringInterner};

use crate::errors::{arity_mismatch, not_a_pair, unsupported_unary, EvalResult};
use crate::value::Value;

/// The builtin function set.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Builtin {
    /// `pair(head, tail)` - construct a pair.
    Pair,
    /// `head(p)` - first component of a pair.
    Head,
    /// `tail(p)` - second component of a pair.
    Tail,
    /// `is_pair(v)` - whether a value is a pair.
    IsPair,
    /// `abs(n)` - magnitude of a number.
    Abs,
}

impl Builtin {
    /// Every builtin, in slot/table order.
    pub const ALL: [Builtin; 5] = [
        Builtin::Pair,
        Builtin::Head,
        Builtin::Tail,
        Builtin::IsPair,
        Builtin::Abs,
    ];

    /// Source-level name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pair => "pair",
            Self::Head => "head",
            Self::Tail => "tail",
            Self::IsPair => "is_pair",
            Self::Abs => "abs",
        }
    }

    /// Declared parameter count.
    pub const fn arity(self) -> u32 {
        match self {
            Self::Pair => 2,
            Self::Head | Self::Tail | Self::IsPair | Self::Abs => 1,
        }
    }

    /// Position in `ALL` - the builtin's slot in the outermost frame and
    /// its function-table tag in the compiled target.
    pub const fn table_index(self) -> u32 {
        self as u32
    }

    /// Builtin for a function-table tag, if it is one.
    pub fn from_index(index: u32) -> Option<Builtin> {
        Self::ALL.get(index as usize).copied()
    }

    /// Interned names in slot order, for the resolver.
    pub fn interned_names(interner: &StringInterner) -> Vec<Name> {
        Self::ALL.iter().map(|b| interner.intern(b.name())).collect()
    }

    /// Apply the builtin to already-evaluated arguments.
    ///
    /// The caller has checked arity via [`Builtin::check_arity`].
    pub fn call(self, args: &[Value]) -> EvalResult {
        match self {
            Self::Pair => Ok(Value::pair(args[0].clone(), args[1].clone())),
            Self::Head => match &args[0] {
                Value::Pair(p) => Ok(p.0.clone()),
                other => Err(not_a_pair(other.type_name())),
            },
            Self::Tail => match &args[0] {
                Value::Pair(p) => Ok(p.1.clone()),
                other => Err(not_a_pair(other.type_name())),
            },
            Self::IsPair => Ok(Value::Bool(matches!(args[0], Value::Pair(_)))),
            Self::Abs => match &args[0] {
                Value::Int(i) => Ok(Value::Int(i.abs())),
                Value::Bool(b) => Ok(Value::int(i64::from(*b))),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                Value::Complex(c) => Ok(Value::Float(c.magnitude())),
                other => Err(unsupported_unary("abs()", other)),
            },
        }
    }

    /// Check an argument count against the declared arity.
    pub fn check_arity(self, got: u32) -> Result<(), crate::errors::RuntimeError> {
        if got == self.arity() {
            Ok(())
        } else {
            Err(arity_mismatch(self.name(), self.arity(), got))
        }
    }
}
