//! The list core: sentinels, the live element count, and the multi-lock
//! validation protocol behind `insert`/`erase`.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::iter::Iter;
use crate::node::NodePtr;

/// A concurrent doubly-linked list whose iterators stay valid across
/// structural changes made by other threads.
///
/// `AcidList` hands out [`Iter`] cursors from [`begin`](Self::begin),
/// [`end`](Self::end), [`insert`](Self::insert) and
/// [`erase`](Self::erase). Every mutating method takes `&self`: concurrency
/// control lives entirely in per-node locks (see [`crate::node`]), not in a
/// lock over the list as a whole, so inserts and erases at different
/// positions can proceed in parallel.
pub struct AcidList<T> {
    head: NodePtr<T>,
    tail: NodePtr<T>,
    size: AtomicUsize,
}

impl<T> AcidList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        let head = NodePtr::new_sentinel();
        let tail = NodePtr::new_sentinel();
        {
            let mut head_links = head.node().write_links();
            head_links.next = tail.clone();
        }
        {
            let mut tail_links = tail.node().write_links();
            tail_links.prev = head.clone();
        }
        AcidList {
            head,
            tail,
            size: AtomicUsize::new(0),
        }
    }

    /// Appends `value` to the end of the list.
    pub fn push_back(&self, value: T) {
        let end = self.end();
        self.insert(&end, value);
    }

    /// Prepends `value` to the front of the list.
    pub fn push_front(&self, value: T) {
        let first = Iter::new(self.head.locked_next(), self.tail.clone());
        self.insert(&first, value);
    }

    /// Inserts `value` immediately before `pos`, returning an iterator to the
    /// newly inserted element.
    ///
    /// If `pos` already points at a tombstoned node, the insertion lands
    /// just before the next live node instead — an iterator to a removed
    /// element names a position in the list, not a fixed index, and that
    /// position has already moved on.
    pub fn insert(&self, pos: &Iter<T>, value: T) -> Iter<T> {
        let mut pos = pos.node.clone();
        let new_node = NodePtr::new_value(value);
        loop {
            while pos.is_tombstone() {
                pos = pos.locked_next();
            }
            let prev = pos.locked_prev();

            // Fixed acquisition order: predecessor before successor. `erase`
            // uses the same order, so no two mutating operations can
            // deadlock waiting on each other.
            let mut prev_guard = prev.node().write_links();
            let mut pos_guard = pos.node().write_links();

            if pos.is_tombstone() || pos_guard.prev != prev {
                drop(pos_guard);
                drop(prev_guard);
                tracing::trace!("insert: validation failed, restarting");
                continue;
            }

            {
                let mut new_guard = new_node.node().write_links();
                new_guard.prev = prev.clone();
                new_guard.next = pos.clone();
            }
            prev_guard.next = new_node.clone();
            pos_guard.prev = new_node.clone();
            self.size.fetch_add(1, Ordering::Relaxed);

            drop(pos_guard);
            drop(prev_guard);
            tracing::trace!("insert: committed");
            return Iter::new(new_node, self.tail.clone());
        }
    }

    /// Logically removes the element `pos` points to.
    ///
    /// Returns an iterator to the next live element (or `end()`). Erasing an
    /// already-removed position is a no-op with respect to the list's
    /// contents — concurrent erasures of the same element are idempotent —
    /// but still computes and returns the current next-live position, same
    /// as a first-time erase.
    pub fn erase(&self, pos: &Iter<T>) -> Iter<T> {
        let node = pos.node.clone();
        if node.node().is_sentinel() {
            // Erasing a sentinel (most commonly `end()`) is a caller error;
            // treat it as a no-op rather than corrupting the list.
            return self.end();
        }
        loop {
            if node.is_tombstone() {
                let mut next = Iter::new(node.clone(), self.tail.clone());
                next.advance();
                return next;
            }

            let (prev, next) = node.locked_prev_next();

            // Fixed acquisition order: predecessor, then the node itself,
            // then successor — the same order `insert` uses.
            let prev_guard = prev.node().write_links();
            let node_guard = node.node().write_links();
            let mut next_guard = next.node().write_links();

            if node.is_tombstone() || node_guard.prev != prev || node_guard.next != next {
                drop(next_guard);
                drop(node_guard);
                drop(prev_guard);
                tracing::trace!("erase: validation failed, restarting");
                continue;
            }

            node.node().mark_tombstone();
            let mut prev_guard = prev_guard;
            // N keeps its own prev/next unchanged: that retained path is
            // what lets an iterator still on N advance to a live node.
            prev_guard.next = next.clone();
            next_guard.prev = prev.clone();
            self.size.fetch_sub(1, Ordering::Relaxed);

            drop(next_guard);
            drop(node_guard);
            drop(prev_guard);
            tracing::trace!("erase: committed");
            return Iter::new(next, self.tail.clone());
        }
    }

    /// An iterator to the first live element, or `end()` if the list is
    /// empty.
    pub fn begin(&self) -> Iter<T> {
        Iter::new(self.head.locked_next(), self.tail.clone())
    }

    /// The list's end sentinel. Never dereferenceable; advancing to it from
    /// any live position is always reachable in a finite number of steps.
    pub fn end(&self) -> Iter<T> {
        Iter::new(self.tail.clone(), self.tail.clone())
    }

    /// Alias for [`begin`](Self::begin), for `for v in list.iter() { .. }`.
    pub fn iter(&self) -> Iter<T> {
        self.begin()
    }

    /// The number of live elements. This is an atomic snapshot: it may lag
    /// an in-flight commit by the brief window between lock acquisition and
    /// the counter update, but is always between the pre- and
    /// post-operation values of any individual `insert`/`erase`.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A clone of the first live value, or `None` if the list is empty.
    pub fn front(&self) -> Option<T>
    where
        T: Clone,
    {
        let it = self.begin();
        if it.is_end() {
            None
        } else {
            Some(it.get())
        }
    }

    /// A clone of the last live value, or `None` if the list is empty.
    pub fn back(&self) -> Option<T>
    where
        T: Clone,
    {
        let mut it = self.end();
        it.retreat();
        if it.node == self.head {
            None
        } else {
            Some(it.get())
        }
    }

    /// Removes every live element. Not atomic with respect to concurrent
    /// inserts: a push racing with `clear` may survive it, leaving the list
    /// non-empty. Valid only up to "size is eventually zero if nothing else
    /// is inserting".
    pub fn clear(&self) {
        tracing::debug!("clear: start");
        loop {
            let it = self.begin();
            if it.is_end() {
                break;
            }
            self.erase(&it);
        }
        tracing::debug!("clear: done");
    }
}

impl<T> Default for AcidList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AcidList<T> {
    fn drop(&mut self) {
        // `head` and `tail` hold mutual references to each other through
        // their own `next`/`prev` edges (that's the whole point: a
        // tombstoned chain still has to lead somewhere). Left alone, that
        // two-node cycle would never reach a zero refcount once this list's
        // own `head`/`tail` fields are dropped. `clear()` first collapses
        // the live chain back down to `head.next == tail` and
        // `tail.prev == head`, then we break that last cycle by hand.
        self.clear();
        {
            let mut head_links = self.head.node().write_links();
            head_links.next = NodePtr::null();
        }
        {
            let mut tail_links = self.tail.node().write_links();
            tail_links.prev = NodePtr::null();
        }
    }
}

// `AcidList<T>` is Send/Sync whenever `T: Send + Sync` purely structurally:
// its only fields are `NodePtr<T>` (Send/Sync under the same bound, see
// `node.rs`) and a plain `AtomicUsize`. No manual unsafe impl needed here.
