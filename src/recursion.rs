// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-thread role bookkeeping.
// Each thread keeps a small arena of entries keyed by lock identity, scanned
// linearly. Entries whose counts all drop to zero are released for reuse by
// any other lock rather than freed. Only the owning thread touches its arena.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity value marking a free entry. Lock and thread ids start at 1.
const FREE: u64 = 0;

/// Roles held by one thread on one lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RoleCounts {
    pub read: u32,
    pub write: u32,
    pub upgrade: u32,
}

impl RoleCounts {
    pub(crate) fn is_empty(&self) -> bool {
        self.read == 0 && self.write == 0 && self.upgrade == 0
    }

    /// Reader slots this thread occupies in the state word when it is not
    /// the writer: one for any plain reads, one for the upgrade role.
    pub(crate) fn reader_slots(&self) -> u32 {
        u32::from(self.read > 0) + u32::from(self.upgrade > 0)
    }
}

struct RecursionEntry {
    lock_id: u64,
    counts: RoleCounts,
}

thread_local! {
    static TABLE: RefCell<Vec<RecursionEntry>> = const { RefCell::new(Vec::new()) };
    static THREAD_ID: Cell<u64> = const { Cell::new(0) };
}

/// Process-unique, non-zero id for the calling thread.
pub(crate) fn current_thread_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    THREAD_ID.with(|id| {
        let mut v = id.get();
        if v == 0 {
            v = NEXT.fetch_add(1, Ordering::Relaxed);
            id.set(v);
        }
        v
    })
}

/// Counts the calling thread holds on `lock_id`. Never allocates.
pub(crate) fn counts(lock_id: u64) -> RoleCounts {
    TABLE.with(|t| {
        t.borrow()
            .iter()
            .find(|e| e.lock_id == lock_id)
            .map(|e| e.counts)
            .unwrap_or_default()
    })
}

/// Apply `f` to the calling thread's entry for `lock_id`, claiming a free
/// (or new) entry first if needed. An entry left empty is released.
pub(crate) fn update<R>(lock_id: u64, f: impl FnOnce(&mut RoleCounts) -> R) -> R {
    debug_assert_ne!(lock_id, FREE);
    TABLE.with(|t| {
        let mut table = t.borrow_mut();
        let idx = match table.iter().position(|e| e.lock_id == lock_id) {
            Some(i) => i,
            None => match table.iter().position(|e| e.lock_id == FREE) {
                Some(i) => {
                    table[i].lock_id = lock_id;
                    i
                }
                None => {
                    table.push(RecursionEntry {
                        lock_id,
                        counts: RoleCounts::default(),
                    });
                    table.len() - 1
                }
            },
        };
        let entry = &mut table[idx];
        let r = f(&mut entry.counts);
        if entry.counts.is_empty() {
            entry.lock_id = FREE;
        }
        r
    })
}

#[cfg(test)]
fn arena_len() -> usize {
    TABLE.with(|t| t.borrow().len())
}
