//! Stable iterator over an [`AcidList`](crate::AcidList).
//!
//! An `Iter` is nothing more than two counted handles: the node it currently
//! points at, and the list's tail sentinel (kept around so the iterator can
//! recognize `end()` without borrowing the list itself). Because both are
//! owned, reference-counted handles, an `Iter` has no lifetime tied to the
//! list it came from — it can outlive any particular mutation, including one
//! that erases the very node it points at.

use crate::node::NodePtr;

/// A cursor into an [`AcidList`](crate::AcidList) that remains valid across
/// concurrent structural changes made by other threads.
///
/// Dereferencing (`get`) always returns the value that was present at the
/// node this iterator points to, even if that node has since been logically
/// removed (see the crate-level docs for why this is safe). Only advancing
/// past a removed node moves the iterator off of it.
pub struct Iter<T> {
    pub(crate) node: NodePtr<T>,
    pub(crate) tail: NodePtr<T>,
}

impl<T> Iter<T> {
    pub(crate) fn new(node: NodePtr<T>, tail: NodePtr<T>) -> Self {
        Iter { node, tail }
    }

    /// True when this iterator is at the list's `end()` sentinel.
    pub fn is_end(&self) -> bool {
        self.node == self.tail
    }

    /// Returns a clone of the value at this iterator's position.
    ///
    /// # Panics
    ///
    /// Panics if called on an iterator pointing at `end()` — sentinels carry
    /// no user-visible value, matching the crate's contract that
    /// dereferencing past the end is undefined for a caller to rely on.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        // The read lock is not protecting `value` (which never changes after
        // construction) so much as it is synchronizing with the
        // happens-before edge established when the node's value was
        // published during `insert`.
        let _guard = self.node.node().read_links();
        self.node.node().value().clone()
    }

    /// Moves this iterator to the next live node, or to `end()` if none
    /// remain. Skipping tombstoned nodes is lazy: each call walks forward
    /// exactly as far as it needs to find the next live position.
    pub fn advance(&mut self) {
        self.node = self.node.locked_next();
        while self.node.is_tombstone() {
            self.node = self.node.locked_next();
        }
    }

    /// Symmetric with [`advance`](Self::advance), walking toward `begin()`.
    pub fn retreat(&mut self) {
        self.node = self.node.locked_prev();
        while self.node.is_tombstone() {
            self.node = self.node.locked_prev();
        }
    }
}

impl<T> Clone for Iter<T> {
    fn clone(&self) -> Self {
        Iter {
            node: self.node.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> PartialEq for Iter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<T> Eq for Iter<T> {}

impl<T: Clone> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.is_end() {
            return None;
        }
        let value = self.get();
        self.advance();
        Some(value)
    }
}
