//! Concurrency and consistency properties of `AcidList`, exercised with
//! `std::thread::scope` workers, one `#[test]` per named property.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use acid_list::AcidList;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// S1 — basic order.
#[test]
fn test_basic_order() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    list.push_back(1);
    list.push_back(2);
    list.push_back(3);
    list.push_front(0);

    let mut middle = list.begin();
    while middle.get() != 2 {
        middle.advance();
    }
    list.erase(&middle);

    assert_eq!(list.iter().collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(list.len(), 3);
}

// S2 — concurrent push_back from disjoint ranges.
#[test]
fn test_concurrent_push_back() {
    init_tracing();
    const THREADS: u64 = 4;
    const PER_THREAD: u64 = 25_000;

    let list: AcidList<u64> = AcidList::new();
    thread::scope(|scope| {
        for t in 0..THREADS {
            let list = &list;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    list.push_back(t * PER_THREAD + i);
                }
            });
        }
    });

    assert_eq!(list.len() as u64, THREADS * PER_THREAD);
    let seen: HashSet<u64> = list.iter().collect();
    assert_eq!(seen.len() as u64, THREADS * PER_THREAD);
    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            assert!(seen.contains(&(t * PER_THREAD + i)));
        }
    }
}

// S3 — three threads erase the same iterator to the sole element.
#[test]
fn test_concurrent_erase_same_position() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    list.push_back(1);
    let it = list.begin();

    thread::scope(|scope| {
        for _ in 0..3 {
            let list = &list;
            let mut it = it.clone();
            scope.spawn(move || {
                list.erase(&it);
                assert_eq!(it.get(), 1);
                it.advance();
                assert!(it.is_end());
            });
        }
    });

    assert_eq!(list.len(), 0);
}

// S4 — captured iterators survive `clear()` and still dereference to the
// value present at capture time; advancing each reaches `end()`.
#[test]
fn test_consistent_iterator_across_clear() {
    init_tracing();
    const N: i32 = 10_000;
    let list: AcidList<i32> = AcidList::new();
    for i in 0..N {
        list.push_back(i);
    }

    let mut captured = Vec::with_capacity(N as usize);
    let mut it = list.begin();
    while !it.is_end() {
        captured.push(it.clone());
        it.advance();
    }

    list.clear();

    for (i, mut it) in captured.into_iter().enumerate() {
        assert_eq!(it.get(), i as i32);
        it.advance();
        assert!(it.is_end());
    }
}

// S5 — two threads walk inward from begin()/end() inserting distinct values.
#[test]
fn test_sequential_insert_from_two_ends() {
    init_tracing();
    const PER_THREAD: i64 = 50_000;
    let list: AcidList<i64> = AcidList::new();
    list.push_back(0);

    thread::scope(|scope| {
        let list = &list;
        scope.spawn(move || {
            let mut pos = list.begin();
            for i in 0..PER_THREAD {
                pos = list.insert(&pos, -(i + 1));
            }
        });
        scope.spawn(move || {
            for i in 0..PER_THREAD {
                let end = list.end();
                list.insert(&end, i + 1);
            }
        });
    });

    assert_eq!(list.len() as i64, 2 * PER_THREAD + 1);
    let values: HashSet<i64> = list.iter().collect();
    assert_eq!(values.len() as i64, 2 * PER_THREAD + 1);
}

// S6 — long-chain teardown: 200,000 nodes, erase all, drop the last iterator.
// A recursive destructor would overflow the stack well before this; this
// just needs to return.
#[test]
fn test_long_chain_teardown() {
    init_tracing();
    const N: i32 = 200_000;
    let list: AcidList<[u8; 256]> = AcidList::new();
    for _ in 0..N {
        list.push_back([0u8; 256]);
    }

    let last_it = {
        let mut it = list.begin();
        loop {
            let next = list.erase(&it);
            if next.is_end() {
                break it;
            }
            it = next;
        }
    };

    assert_eq!(list.len(), 0);
    drop(last_it);
    drop(list);
}

// Property: membership preservation under concurrent insert (disjoint
// multisets of distinct values).
#[test]
fn test_membership_preserved_under_concurrent_insert() {
    init_tracing();
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 5_000;
    let list: AcidList<u64> = AcidList::new();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let list = &list;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    list.push_back(t * PER_THREAD + i);
                }
            });
        }
    });

    let mut values: Vec<u64> = list.iter().collect();
    values.sort_unstable();
    let mut expected: Vec<u64> = (0..THREADS * PER_THREAD).collect();
    expected.sort_unstable();
    assert_eq!(values, expected);
}

// Property: size() always matches the number of elements reachable from
// begin() to end() once all mutation has quiesced.
#[test]
fn test_size_matches_traversal_count() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    for i in 0..1_000 {
        list.push_back(i);
    }
    for i in (0..1_000).step_by(3) {
        let mut it = list.begin();
        while it.get() != i {
            it.advance();
        }
        list.erase(&it);
    }
    assert_eq!(list.len(), list.iter().count());
}

// Property: advancing a live iterator a finite number of times always
// reaches either a live node or end(), never stalling on a tombstone.
#[test]
fn test_advance_skips_tombstones_and_terminates() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    for i in 0..100 {
        list.push_back(i);
    }
    // Erase every node but the very first and very last.
    let mut it = list.begin();
    it.advance();
    for _ in 0..98 {
        it = list.erase(&it);
    }
    assert_eq!(list.len(), 2);

    let mut cursor = list.begin();
    assert_eq!(cursor.get(), 0);
    cursor.advance();
    assert_eq!(cursor.get(), 99);
    cursor.advance();
    assert!(cursor.is_end());
}

// Property: erasing the same iterator twice from a single thread is a no-op
// the second time and leaves neighbors intact.
#[test]
fn test_idempotent_erase_single_threaded() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    list.push_back(1);
    list.push_back(2);
    list.push_back(3);

    let mut it = list.begin();
    it.advance(); // points at 2
    let it2 = it.clone();

    list.erase(&it);
    assert_eq!(list.len(), 2);
    let next = list.erase(&it2);
    assert_eq!(list.len(), 2);
    assert_eq!(next.get(), 3);

    assert_eq!(list.iter().collect::<Vec<_>>(), vec![1, 3]);
}

// Property: three concurrent erases of the same iterator change size() by
// exactly one erase's worth.
#[test]
fn test_concurrent_erase_changes_size_once() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    list.push_back(1);
    list.push_back(2);
    list.push_back(3);

    let mut target = list.begin();
    target.advance();
    let erased = AtomicU64::new(0);

    thread::scope(|scope| {
        for _ in 0..3 {
            let list = &list;
            let erased = &erased;
            let target = target.clone();
            scope.spawn(move || {
                let size_before = list.len();
                list.erase(&target);
                let size_after = list.len();
                if size_after < size_before {
                    erased.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(list.len(), 2);
    assert_eq!(list.iter().collect::<Vec<_>>(), vec![1, 3]);
}

// Property: no leaks. Values carry a drop counter; after the list and every
// iterator holding one are dropped, every value has been dropped exactly
// once.
#[test]
fn test_no_leaks_on_list_and_iterator_drop() {
    init_tracing();
    use std::sync::Arc;

    struct DropCounter(Arc<AtomicU64>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let drops = Arc::new(AtomicU64::new(0));
    const N: u64 = 5_000;

    let list: AcidList<DropCounter> = AcidList::new();
    for _ in 0..N {
        list.push_back(DropCounter(drops.clone()));
    }

    // Hold on to a few iterators, including ones to elements we then erase.
    let mut held = Vec::new();
    let mut it = list.begin();
    for _ in 0..10 {
        held.push(it.clone());
        it.advance();
    }
    for it in &held {
        list.erase(it);
    }

    drop(list);
    assert_eq!(drops.load(Ordering::SeqCst), N - held.len() as u64);
    drop(held);
    assert_eq!(drops.load(Ordering::SeqCst), N);
}

#[test]
fn test_front_and_back() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    assert_eq!(list.front(), None);
    assert_eq!(list.back(), None);

    list.push_back(1);
    list.push_back(2);
    list.push_front(0);

    assert_eq!(list.front(), Some(0));
    assert_eq!(list.back(), Some(2));
}

#[test]
fn test_clear_empties_list_absent_concurrent_inserts() {
    init_tracing();
    let list: AcidList<i32> = AcidList::new();
    for i in 0..1_000 {
        list.push_back(i);
    }
    list.clear();
    assert_eq!(list.len(), 0);
    assert!(list.begin().is_end());
}
