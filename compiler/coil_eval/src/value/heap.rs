//! Shared heap allocation wrapper.
//!
//! `Heap<T>` wraps `Arc<T>` with a crate-private constructor so every heap
//! value is created through a `Value` factory method (or the numeric
//! tower's own spill path), never ad hoc.

// Arc is the intentional implementation of Heap<T>.
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Reference-counted heap storage for values.
///
/// Cloning a `Heap<T>` is a pointer copy; the payload is immutable.
#[repr(transparent)]
pub struct Heap<T>(Arc<T>);

impl<T> Heap<T> {
    /// Allocate a value on the heap. Crate-private so construction goes
    /// through the `Value` factories.
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }

    /// Whether two handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<T: fmt::Display> fmt::Display for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<T: PartialEq> PartialEq for Heap<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq> Eq for Heap<T> {}
