//! An ACID-style concurrent doubly-linked list.
//!
//! [`AcidList`] is a mutable ordered sequence container safe to mutate and
//! traverse from many threads in parallel, whose iterators remain
//! *consistent* across concurrent structural changes made by other threads:
//!
//! - An iterator that refers to an element keeps dereferencing to that
//!   element's value even after the element is logically removed, or after
//!   surrounding elements are inserted or erased. Advancing such an iterator
//!   yields the next live element, as observed by the traversing thread.
//! - Insertion and deletion at different positions proceed in parallel;
//!   dereferencing and advancing iterators never block on a global lock —
//!   there isn't one.
//! - Concurrent attempts to erase the same element are idempotent: exactly
//!   one "wins" the unlink, and the node's value remains readable through
//!   any iterator that still refers to it.
//!
//! ```
//! use acid_list::AcidList;
//!
//! let list = AcidList::new();
//! list.push_back(1);
//! list.push_back(2);
//! list.push_back(3);
//! list.push_front(0);
//!
//! let mut middle = list.begin();
//! while middle.get() != 2 {
//!     middle.advance();
//! }
//! list.erase(&middle);
//!
//! assert_eq!(list.len(), 3);
//! assert_eq!(list.iter().collect::<Vec<_>>(), vec![0, 1, 3]);
//! ```
//!
//! # What this crate is not
//!
//! There is no order-statistic indexing, no splicing or sort, and no
//! transactional multi-element atomicity: each mutating operation is atomic
//! only with respect to itself. The protocol is lock-based with retry on
//! optimistic validation failure, not lock-free — there is no bounded-wait
//! progress guarantee.
//!
//! # How it works
//!
//! Every node owns its own reader/writer lock guarding its `prev`/`next`
//! links, plus an atomic reference count and a one-way tombstone flag.
//! Mutating operations lock the predecessor, the node, and (for erase) the
//! successor in that fixed order, validate that nothing changed out from
//! under them since they last looked, and commit — restarting from the top
//! if validation fails. Logical removal (tombstoning) never touches a
//! node's own outgoing links, which is what lets an iterator already
//! sitting on a removed node advance correctly afterward.

mod iter;
mod list;
mod node;

pub use iter::Iter;
pub use list::AcidList;
