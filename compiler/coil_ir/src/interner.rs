//! String interner for identifier storage.
//!
//! Provides O(1) interning and lookup. Interned strings are leaked into
//! `'static` storage; an interner lives for the whole program run, so the
//! leak is bounded by the set of distinct identifiers.

// Arc is needed for SharedInterner - the interner is shared between the
// builder, the resolver, and the evaluation engine.
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct Inner {
    /// Map from string content to interner index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name::raw()`.
    strings: Vec<&'static str>,
}

impl Inner {
    fn with_empty() -> Self {
        // Pre-intern the empty string at index 0 so Name::EMPTY resolves.
        let mut map = FxHashMap::default();
        map.insert("", 0);
        Inner {
            map,
            strings: vec![""],
        }
    }
}

/// String interner.
///
/// Interior mutability (`RwLock`) so callers can intern through a shared
/// reference while the arena and resolver borrow it concurrently.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        StringInterner {
            inner: RwLock::new(Inner::with_empty()),
        }
    }

    /// Intern a string, returning its `Name`.
    ///
    /// Interning the same content twice returns the same `Name`.
    pub fn intern(&self, s: &str) -> Name {
        // Fast path: already interned.
        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name::from_raw(idx);
            }
        }

        let mut guard = self.inner.write();
        // Double-check after acquiring the write lock.
        if let Some(&idx) = guard.map.get(s) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(guard.strings.len()).unwrap_or_else(|_| {
            panic!("interner capacity exceeded: {} strings", guard.strings.len())
        });
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Look up the content of an interned name.
    ///
    /// # Panics
    /// Panics if `name` was not produced by this interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.inner.read();
        guard.strings[name.raw() as usize]
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Whether only the pre-interned empty string is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference-counted interner handle shared across compilation stages.
#[derive(Clone, Default)]
pub struct SharedInterner(Arc<StringInterner>);

impl Deref for SharedInterner {
    type Target = StringInterner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let interner = StringInterner::new();
        let a = interner.intern("factorial");
        let b = interner.intern("factorial");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "factorial");
    }

    #[test]
    fn intern_distinct() {
        let interner = StringInterner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert!(interner.is_empty());
    }

    #[test]
    fn shared_interner_clones_share_storage() {
        let shared = SharedInterner::default();
        let a = shared.intern("n");
        let clone = shared.clone();
        assert_eq!(clone.lookup(a), "n");
        assert_eq!(clone.intern("n"), a);
    }
}
