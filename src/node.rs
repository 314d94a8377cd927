//! Node representation and the counted handle (`NodePtr`) that owns a
//! reference to it.
//!
//! Each node carries its own reader/writer lock guarding the `prev`/`next`
//! links, a one-way tombstone flag, and an atomic reference count. The
//! reference count is what keeps a logically removed node alive for as long
//! as some iterator or neighboring node still points at it (see the crate's
//! top-level docs for the invariants this maintains).

use std::cell::RefCell;
use std::ptr::null_mut;
use std::sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The mutable, lock-guarded part of a node: its neighbors.
///
/// `value` and `tombstone` live outside this struct (see `Node`) because
/// `value` never changes after construction and `tombstone` is a one-shot
/// atomic flag; only the links need reader/writer exclusion.
pub(crate) struct Links<T> {
    pub(crate) prev: NodePtr<T>,
    pub(crate) next: NodePtr<T>,
}

pub(crate) struct Node<T> {
    value: Option<T>,
    links: RwLock<Links<T>>,
    tombstone: AtomicBool,
    refcount: AtomicUsize,
    /// Sentinels (head/tail) are never tombstoned and carry no user value.
    sentinel: bool,
}

impl<T> Node<T> {
    fn new(value: Option<T>, sentinel: bool) -> Self {
        Node {
            value,
            links: RwLock::new(Links {
                prev: NodePtr::null(),
                next: NodePtr::null(),
            }),
            tombstone: AtomicBool::new(false),
            refcount: AtomicUsize::new(0),
            sentinel,
        }
    }

    pub(crate) fn is_tombstone(&self) -> bool {
        self.tombstone.load(Ordering::Acquire)
    }

    pub(crate) fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    /// Sets the tombstone flag. Callers must already hold `links` for
    /// writing; this is what makes the false->true transition exclusive
    /// with respect to every other reader and writer of this node.
    pub(crate) fn mark_tombstone(&self) {
        debug_assert!(!self.sentinel, "attempted to tombstone a sentinel");
        debug_assert!(!self.is_tombstone(), "double tombstone on the same node");
        self.tombstone.store(true, Ordering::Release);
    }

    pub(crate) fn value(&self) -> &T {
        self.value
            .as_ref()
            .expect("dereferenced a sentinel node, which carries no value")
    }

    pub(crate) fn read_links(&self) -> RwLockReadGuard<'_, Links<T>> {
        self.links.read()
    }

    pub(crate) fn write_links(&self) -> RwLockWriteGuard<'_, Links<T>> {
        self.links.write()
    }
}

/// A counted, owning handle to a node (or null).
///
/// Cloning bumps the target's reference count; dropping decrements it, and
/// the handle whose decrement brings the count to zero becomes responsible
/// for freeing the node via the non-recursive teardown routine below.
pub(crate) struct NodePtr<T> {
    ptr: *mut Node<T>,
}

impl<T> NodePtr<T> {
    pub(crate) fn null() -> Self {
        NodePtr { ptr: null_mut() }
    }

    pub(crate) fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    fn new_owned(node: Node<T>) -> Self {
        let ptr = Box::into_raw(Box::new(node));
        // SAFETY: ptr was just allocated by us; nothing else can observe it yet.
        unsafe {
            (*ptr).refcount.store(1, Ordering::Relaxed);
        }
        NodePtr { ptr }
    }

    pub(crate) fn new_value(value: T) -> Self {
        Self::new_owned(Node::new(Some(value), false))
    }

    pub(crate) fn new_sentinel() -> Self {
        Self::new_owned(Node::new(None, true))
    }

    /// Creates a new owning handle to an already-live node, bumping its
    /// reference count. A no-op (and stays null) when `ptr` is null.
    fn from_raw(ptr: *mut Node<T>) -> Self {
        if !ptr.is_null() {
            // SAFETY: caller took this pointer from a live Links value, which
            // only ever holds pointers to nodes with refcount > 0.
            let prior = unsafe { (*ptr).refcount.fetch_add(1, Ordering::Relaxed) };
            debug_assert!(prior > 0, "resurrected a node whose refcount was zero");
        }
        NodePtr { ptr }
    }

    pub(crate) fn node(&self) -> &Node<T> {
        debug_assert!(!self.ptr.is_null(), "dereferenced a null NodePtr");
        // SAFETY: a non-null NodePtr always owns a live reference to its node.
        unsafe { &*self.ptr }
    }

    pub(crate) fn is_tombstone(&self) -> bool {
        self.node().is_tombstone()
    }

    /// Locked read of the successor link. Returns a fresh owning handle.
    pub(crate) fn locked_next(&self) -> NodePtr<T> {
        let links = self.node().read_links();
        NodePtr::from_raw(links.next.ptr)
    }

    /// Locked read of the predecessor link. Returns a fresh owning handle.
    pub(crate) fn locked_prev(&self) -> NodePtr<T> {
        let links = self.node().read_links();
        NodePtr::from_raw(links.prev.ptr)
    }

    /// Locked read of both neighbor links in a single critical section.
    pub(crate) fn locked_prev_next(&self) -> (NodePtr<T>, NodePtr<T>) {
        let links = self.node().read_links();
        (NodePtr::from_raw(links.prev.ptr), NodePtr::from_raw(links.next.ptr))
    }
}

impl<T> Clone for NodePtr<T> {
    fn clone(&self) -> Self {
        NodePtr::from_raw(self.ptr)
    }
}

impl<T> PartialEq for NodePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for NodePtr<T> {}

impl<T> Drop for NodePtr<T> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        // SAFETY: this handle owns one reference; fetch_sub observes that.
        let prior = unsafe { (*self.ptr).refcount.fetch_sub(1, Ordering::Release) };
        if prior == 1 {
            fence(Ordering::Acquire);
            teardown(self.ptr);
        }
    }
}

// Soundness rests on the per-node `parking_lot::RwLock` plus `Arc`-style
// reference counting above, both already `Send`/`Sync` for `T: Send + Sync`;
// no CAS/bit-packing invariant is being asserted here the way the raw
// `unsafe impl` blocks elsewhere in this corpus assert for packed atomics.
unsafe impl<T: Send + Sync> Send for NodePtr<T> {}
unsafe impl<T: Send + Sync> Sync for NodePtr<T> {}

/// A type-erased piece of teardown work: a node pointer plus the
/// monomorphized function that knows how to finalize it for its `T`.
///
/// Type erasure here is what lets a single thread-local stack be shared
/// across every `NodePtr<T>` instantiation live on this thread, instead of
/// allocating a fresh stack (or requiring a generic `static`, which Rust
/// does not allow) per element type.
struct WorkItem {
    ptr: *mut (),
    step: unsafe fn(*mut (), &mut Vec<WorkItem>),
}

thread_local! {
    static TEARDOWN_WORKLIST: RefCell<Vec<WorkItem>> = RefCell::new(Vec::new());
}

/// Non-recursive teardown of a node (and, transitively, any neighbor whose
/// refcount this release brings to zero).
///
/// A naive recursive destructor walking `prev`/`next` overflows the stack on
/// long chains (tested at 200,000+ nodes). This instead drives an explicit,
/// thread-local worklist: pop a node, detach its two edges by hand
/// (decrementing the neighbor's refcount directly, bypassing `NodePtr`'s own
/// `Drop` so the detach itself never recurses), push any neighbor whose
/// count just hit zero, and let the node's `Box` deallocate normally once
/// its links are nulled out.
fn teardown<T>(start: *mut Node<T>) {
    unsafe fn step<T>(ptr: *mut (), stack: &mut Vec<WorkItem>) {
        let ptr = ptr as *mut Node<T>;
        // SAFETY: caller (the worklist loop) only ever pushes nodes whose
        // refcount has reached zero; we are the sole owner.
        let mut owned = unsafe { Box::from_raw(ptr) };
        let links = owned.links.get_mut();
        let prev_ptr = links.prev.ptr;
        let next_ptr = links.next.ptr;
        // Null the fields directly rather than through `NodePtr`'s
        // assignment operator: that would invoke `Drop` on the old value
        // and recurse into `teardown` again.
        links.prev.ptr = null_mut();
        links.next.ptr = null_mut();

        for neighbor in [prev_ptr, next_ptr] {
            if neighbor.is_null() {
                continue;
            }
            // SAFETY: neighbor was a live node reachable through our own
            // (now-severed) edge, so it has refcount >= 1.
            let prior = unsafe { (*neighbor).refcount.fetch_sub(1, Ordering::Release) };
            if prior == 1 {
                fence(Ordering::Acquire);
                stack.push(WorkItem {
                    ptr: neighbor as *mut (),
                    step: step::<T>,
                });
            }
        }
        drop(owned);
    }

    TEARDOWN_WORKLIST.with(|cell| {
        let mut stack = cell.borrow_mut();
        stack.push(WorkItem {
            ptr: start as *mut (),
            step: step::<T>,
        });
        while let Some(item) = stack.pop() {
            // SAFETY: `step` was monomorphized for the same `T` that produced
            // this `WorkItem`, since every push site in this module is.
            unsafe {
                (item.step)(item.ptr, &mut stack);
            }
        }
    });
}
