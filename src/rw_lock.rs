// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reentrant reader/writer lock with an upgradeable-read role.
// - The state word (see state.rs) carries reader slots plus writer and waiter
//   flags and only changes through compare-and-swap.
// - A spin lock serializes bookkeeping: waiter counts, owner ids and the
//   lazily created wait events. It is never held across a blocking wait.
// - Failed acquisitions back off (spin → yield → sleep) for `spin_count`
//   rounds, then park on the wait event for their role.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::backoff;
use crate::config::{LockConfig, RecursionPolicy};
use crate::event::{ResetMode, WaitEvent};
use crate::recursion::{self, current_thread_id};
use crate::spin_lock::{SpinLock, SpinLockGuard};
use crate::state::LockState;
use crate::timeout::{Deadline, Timeout};
use crate::{LockError, Role, Violation};

const NO_OWNER: u64 = 0;

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Which wait event a parked thread sleeps on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitKind {
    Read,
    Write,
    Upgrade,
    /// The upgrade owner waiting for readers to drain.
    UpgradeToWrite,
}

impl WaitKind {
    fn reset_mode(self) -> ResetMode {
        match self {
            WaitKind::Read | WaitKind::Upgrade => ResetMode::Manual,
            WaitKind::Write | WaitKind::UpgradeToWrite => ResetMode::Auto,
        }
    }

    fn blocks_readers(self) -> bool {
        matches!(self, WaitKind::Write | WaitKind::UpgradeToWrite)
    }
}

#[derive(Default)]
struct Bookkeeping {
    disposed: bool,
    /// The upgrade owner also holds a plain read (a second reader slot).
    upgrade_holding_read: bool,
    read_waiters: u32,
    write_waiters: u32,
    upgrade_waiters: u32,
    write_upgrade_waiters: u32,
    read_event: Option<Arc<WaitEvent>>,
    write_event: Option<Arc<WaitEvent>>,
    upgrade_event: Option<Arc<WaitEvent>>,
    wait_upgrade_event: Option<Arc<WaitEvent>>,
}

impl Bookkeeping {
    fn event_slot(&mut self, kind: WaitKind) -> &mut Option<Arc<WaitEvent>> {
        match kind {
            WaitKind::Read => &mut self.read_event,
            WaitKind::Write => &mut self.write_event,
            WaitKind::Upgrade => &mut self.upgrade_event,
            WaitKind::UpgradeToWrite => &mut self.wait_upgrade_event,
        }
    }

    fn waiters_mut(&mut self, kind: WaitKind) -> &mut u32 {
        match kind {
            WaitKind::Read => &mut self.read_waiters,
            WaitKind::Write => &mut self.write_waiters,
            WaitKind::Upgrade => &mut self.upgrade_waiters,
            WaitKind::UpgradeToWrite => &mut self.write_upgrade_waiters,
        }
    }

    fn has_waiters(&self) -> bool {
        self.read_waiters != 0
            || self.write_waiters != 0
            || self.upgrade_waiters != 0
            || self.write_upgrade_waiters != 0
    }
}

type Book<'a> = SpinLockGuard<'a, Bookkeeping>;

/// A reader/writer lock with optional reentrancy and an upgradeable-read
/// role.
///
/// Many threads may hold the read role at once; the write role is
/// exclusive. At most one thread holds the upgradeable-read role: it counts
/// as a reader against writers, and is the only role from which
/// [`enter_write`](Self::enter_write) may be called without releasing first.
///
/// Roles are tracked per thread, so every `exit_*` must run on the thread
/// that made the matching `enter_*` call. Misuse (illegal role transitions,
/// unbalanced exits) is reported as a [`LockError`] and never retried.
///
/// Waiting is writer-preferring: a parked writer or upgrader blocks new
/// readers, and releases wake the upgrader first, then a writer, then all
/// readers.
pub struct ReentrantRwLock {
    id: u64,
    policy: RecursionPolicy,
    spin_count: u32,
    state: AtomicU32,
    writer_owner: AtomicU64,
    upgrade_owner: AtomicU64,
    book: SpinLock<Bookkeeping>,
}

impl ReentrantRwLock {
    /// Create a new unlocked lock with the given recursion policy.
    pub fn new(policy: RecursionPolicy) -> Self {
        Self::with_config(LockConfig::new(policy))
    }

    pub fn with_config(config: LockConfig) -> Self {
        Self {
            id: NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed),
            policy: config.policy,
            spin_count: config.spin_count,
            state: AtomicU32::new(0),
            writer_owner: AtomicU64::new(NO_OWNER),
            upgrade_owner: AtomicU64::new(NO_OWNER),
            book: SpinLock::new(Bookkeeping::default()),
        }
    }

    /// Process-unique identity of this lock.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn recursion_policy(&self) -> RecursionPolicy {
        self.policy
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Acquire the read role, blocking until it is granted.
    pub fn enter_read(&self) -> Result<(), LockError> {
        self.try_enter_read(Timeout::Infinite).map(|_| ())
    }

    /// Acquire the read role, waiting at most `timeout`.
    /// Returns `Ok(false)` if the timeout elapsed first.
    pub fn try_enter_read(&self, timeout: impl Into<Timeout>) -> Result<bool, LockError> {
        let deadline = Deadline::start(timeout.into())?;
        let book = self.lock_book()?;
        let held = recursion::counts(self.id);

        match self.policy {
            RecursionPolicy::NoRecursion => {
                if held.write > 0 {
                    return Err(Violation::ReadAfterWrite.into());
                }
                if held.read > 0 {
                    return Err(Violation::RecursiveRead.into());
                }
            }
            RecursionPolicy::SupportsRecursion => {
                if held.read > 0 || held.write > 0 {
                    recursion::update(self.id, |c| c.read += 1);
                    return Ok(true);
                }
            }
        }

        // Writers are already shut out by the upgrade slot, so the upgrade
        // owner's read only needs room in the count.
        let upgrader = held.upgrade > 0;
        self.acquire(book, &deadline, WaitKind::Read, |book| {
            let granted = self.transition(|s| {
                let room = if upgrader {
                    s.has_reader_room()
                } else {
                    s.admits_reader()
                };
                room.then(|| LockState {
                    reader_count: s.reader_count + 1,
                    ..s
                })
            });
            if granted {
                if upgrader {
                    book.upgrade_holding_read = true;
                }
                recursion::update(self.id, |c| c.read += 1);
            }
            granted
        })
    }

    /// Release one level of the read role.
    pub fn exit_read(&self) -> Result<(), LockError> {
        let mut book = self.lock_book()?;
        let held = recursion::counts(self.id);
        if held.read == 0 {
            return Err(LockError::MismatchedExit(Role::Read));
        }
        recursion::update(self.id, |c| c.read -= 1);
        // Nested, or folded into the writer slot.
        if held.read > 1 || held.write > 0 {
            return Ok(());
        }
        if held.upgrade > 0 {
            book.upgrade_holding_read = false;
        }
        self.release_reader_slot();
        self.exit_and_wake(book)
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    /// Acquire the write role, blocking until it is granted.
    pub fn enter_write(&self) -> Result<(), LockError> {
        self.try_enter_write(Timeout::Infinite).map(|_| ())
    }

    /// Acquire the write role, waiting at most `timeout`.
    /// Returns `Ok(false)` if the timeout elapsed first.
    ///
    /// Called by the upgrade owner, this waits only for the other readers to
    /// drain and converts in place; the upgrade role is kept.
    pub fn try_enter_write(&self, timeout: impl Into<Timeout>) -> Result<bool, LockError> {
        let deadline = Deadline::start(timeout.into())?;
        let book = self.lock_book()?;
        let held = recursion::counts(self.id);

        if held.write > 0 {
            return match self.policy {
                RecursionPolicy::NoRecursion => Err(Violation::RecursiveWrite.into()),
                RecursionPolicy::SupportsRecursion => {
                    recursion::update(self.id, |c| c.write += 1);
                    Ok(true)
                }
            };
        }
        if held.read > 0 && held.upgrade == 0 {
            return Err(Violation::WriteAfterRead.into());
        }

        let upgrading = held.upgrade > 0;
        // 1 for the upgrade slot, 2 if the upgrader also holds a read.
        let own_slots = held.reader_slots();
        let kind = if upgrading {
            WaitKind::UpgradeToWrite
        } else {
            WaitKind::Write
        };
        let me = current_thread_id();
        self.acquire(book, &deadline, kind, |_| {
            let granted = self.transition(|s| {
                s.admits_writer(own_slots, upgrading).then_some(LockState {
                    reader_count: 0,
                    writer_held: true,
                    ..s
                })
            });
            if granted {
                self.writer_owner.store(me, Ordering::SeqCst);
                recursion::update(self.id, |c| c.write += 1);
            }
            granted
        })
    }

    /// Release one level of the write role.
    ///
    /// When the last level goes, any reads or upgrade role this thread still
    /// holds become ordinary reader slots again.
    pub fn exit_write(&self) -> Result<(), LockError> {
        let mut book = self.lock_book()?;
        let held = recursion::counts(self.id);
        if held.write == 0 {
            return Err(LockError::MismatchedExit(Role::Write));
        }
        recursion::update(self.id, |c| c.write -= 1);
        if held.write > 1 {
            return Ok(());
        }

        let restored = held.reader_slots();
        if held.upgrade > 0 {
            book.upgrade_holding_read = held.read > 0;
        }
        self.writer_owner.store(NO_OWNER, Ordering::SeqCst);
        self.transition(|s| {
            Some(LockState {
                writer_held: false,
                reader_count: restored,
                ..s
            })
        });
        self.exit_and_wake(book)
    }

    // -----------------------------------------------------------------------
    // Upgradeable read
    // -----------------------------------------------------------------------

    /// Acquire the upgradeable-read role, blocking until it is granted.
    pub fn enter_upgradeable_read(&self) -> Result<(), LockError> {
        self.try_enter_upgradeable_read(Timeout::Infinite).map(|_| ())
    }

    /// Acquire the upgradeable-read role, waiting at most `timeout`.
    /// Returns `Ok(false)` if the timeout elapsed first.
    pub fn try_enter_upgradeable_read(
        &self,
        timeout: impl Into<Timeout>,
    ) -> Result<bool, LockError> {
        let deadline = Deadline::start(timeout.into())?;
        let mut book = self.lock_book()?;
        let held = recursion::counts(self.id);
        let me = current_thread_id();

        if held.upgrade > 0 {
            return match self.policy {
                RecursionPolicy::NoRecursion => Err(Violation::RecursiveUpgrade.into()),
                RecursionPolicy::SupportsRecursion => {
                    recursion::update(self.id, |c| c.upgrade += 1);
                    Ok(true)
                }
            };
        }
        if held.write > 0 {
            return match self.policy {
                RecursionPolicy::NoRecursion => Err(Violation::UpgradeAfterWrite.into()),
                RecursionPolicy::SupportsRecursion => {
                    // The slot stays folded into the writer until exit_write.
                    self.upgrade_owner.store(me, Ordering::SeqCst);
                    book.upgrade_holding_read = held.read > 0;
                    recursion::update(self.id, |c| c.upgrade += 1);
                    Ok(true)
                }
            };
        }
        if held.read > 0 {
            return Err(Violation::UpgradeAfterRead.into());
        }

        self.acquire(book, &deadline, WaitKind::Upgrade, |book| {
            if self.upgrade_owner.load(Ordering::SeqCst) != NO_OWNER {
                return false;
            }
            let granted = self.transition(|s| {
                s.admits_reader().then(|| LockState {
                    reader_count: s.reader_count + 1,
                    ..s
                })
            });
            if granted {
                self.upgrade_owner.store(me, Ordering::SeqCst);
                book.upgrade_holding_read = false;
                recursion::update(self.id, |c| c.upgrade += 1);
            }
            granted
        })
    }

    /// Release one level of the upgradeable-read role.
    pub fn exit_upgradeable_read(&self) -> Result<(), LockError> {
        let mut book = self.lock_book()?;
        let held = recursion::counts(self.id);
        if held.upgrade == 0 {
            return Err(LockError::MismatchedExit(Role::UpgradeableRead));
        }
        recursion::update(self.id, |c| c.upgrade -= 1);
        if held.upgrade > 1 {
            return Ok(());
        }

        self.upgrade_owner.store(NO_OWNER, Ordering::SeqCst);
        book.upgrade_holding_read = false;
        if held.write == 0 {
            self.release_reader_slot();
        }
        self.exit_and_wake(book)
    }

    // -----------------------------------------------------------------------
    // Dispose
    // -----------------------------------------------------------------------

    /// Retire the lock, releasing its wait events.
    ///
    /// Fails with [`LockError::DisposeInUse`] (leaving the lock usable) while
    /// any thread holds a role or waits. Every later call fails with
    /// [`LockError::Disposed`].
    pub fn dispose(&self) -> Result<(), LockError> {
        let mut book = self.lock_book()?;
        let s = self.load_state();
        if book.has_waiters()
            || !s.is_idle()
            || self.upgrade_owner.load(Ordering::SeqCst) != NO_OWNER
        {
            warn!("lock {}: dispose rejected while held or waited on", self.id);
            return Err(LockError::DisposeInUse);
        }
        book.disposed = true;
        let events = [
            book.read_event.take(),
            book.write_event.take(),
            book.upgrade_event.take(),
            book.wait_upgrade_event.take(),
        ];
        drop(book);
        drop(events);
        debug!("lock {}: disposed", self.id);
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.book.lock().disposed
    }

    // -----------------------------------------------------------------------
    // Observability (snapshots, not atomic across calls)
    // -----------------------------------------------------------------------

    /// Whether the calling thread holds the read role.
    pub fn is_read_held(&self) -> bool {
        recursion::counts(self.id).read > 0
    }

    /// Whether the calling thread holds the write role.
    pub fn is_write_held(&self) -> bool {
        self.writer_owner.load(Ordering::SeqCst) == current_thread_id()
    }

    /// Whether the calling thread holds the upgradeable-read role.
    pub fn is_upgradeable_read_held(&self) -> bool {
        self.upgrade_owner.load(Ordering::SeqCst) == current_thread_id()
    }

    /// Threads currently holding the read role (the upgrade slot excluded).
    pub fn current_read_count(&self) -> u32 {
        let s = self.load_state();
        let upgrade_slot =
            self.upgrade_owner.load(Ordering::SeqCst) != NO_OWNER && !s.writer_held;
        s.reader_count.saturating_sub(u32::from(upgrade_slot))
    }

    pub fn recursive_read_count(&self) -> u32 {
        recursion::counts(self.id).read
    }

    pub fn recursive_write_count(&self) -> u32 {
        recursion::counts(self.id).write
    }

    pub fn recursive_upgrade_count(&self) -> u32 {
        recursion::counts(self.id).upgrade
    }

    pub fn waiting_read_count(&self) -> u32 {
        self.book.lock().read_waiters
    }

    /// Threads parked in `enter_write`, including an upgrader waiting for
    /// readers to drain.
    pub fn waiting_write_count(&self) -> u32 {
        let book = self.book.lock();
        book.write_waiters + book.write_upgrade_waiters
    }

    pub fn waiting_upgrade_count(&self) -> u32 {
        self.book.lock().upgrade_waiters
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lock_book(&self) -> Result<Book<'_>, LockError> {
        let book = self.book.lock();
        if book.disposed {
            return Err(LockError::Disposed);
        }
        Ok(book)
    }

    fn load_state(&self) -> LockState {
        LockState::decode(self.state.load(Ordering::SeqCst))
    }

    /// Compare-and-swap loop on the state word. `f` returns the successor of
    /// the decoded snapshot, or `None` to give up without writing.
    fn transition(&self, mut f: impl FnMut(LockState) -> Option<LockState>) -> bool {
        let mut cur = self.state.load(Ordering::SeqCst);
        loop {
            let Some(next) = f(LockState::decode(cur)) else {
                return false;
            };
            match self.state.compare_exchange_weak(
                cur,
                next.encode(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    fn release_reader_slot(&self) {
        self.transition(|s| {
            debug_assert!(s.reader_count > 0);
            Some(LockState {
                reader_count: s.reader_count.saturating_sub(1),
                ..s
            })
        });
    }

    /// Mirror the writer/upgrader waiter counts into the state word; the
    /// flags hold back new readers.
    fn publish_waiting_bits(&self, book: &Bookkeeping) {
        let writers_waiting = book.write_waiters > 0;
        let upgrader_waiting = book.write_upgrade_waiters > 0;
        self.transition(|s| {
            Some(LockState {
                writers_waiting,
                upgrader_waiting,
                ..s
            })
        });
    }

    /// Retry `try_acquire` (run under the bookkeeping lock) until it succeeds
    /// or the deadline passes, spinning first and then parking on `kind`'s
    /// event.
    fn acquire<'a>(
        &'a self,
        mut book: Book<'a>,
        deadline: &Deadline,
        kind: WaitKind,
        mut try_acquire: impl FnMut(&mut Bookkeeping) -> bool,
    ) -> Result<bool, LockError> {
        let mut spins = 0u32;
        loop {
            if try_acquire(&mut *book) {
                return Ok(true);
            }
            if deadline.is_expired() {
                return Ok(false);
            }
            if spins < self.spin_count {
                drop(book);
                spins += 1;
                backoff::backoff(spins);
                book = self.lock_book()?;
                continue;
            }
            if book.event_slot(kind).is_none() {
                book = self.lazy_create_event(book, kind)?;
                continue;
            }
            match self.wait_on_event(book, kind, deadline)? {
                Some(b) => book = b,
                None => return Ok(false),
            }
        }
    }

    /// Create `kind`'s event outside the bookkeeping lock, then install it
    /// unless another thread got there first.
    fn lazy_create_event<'a>(
        &'a self,
        book: Book<'a>,
        kind: WaitKind,
    ) -> Result<Book<'a>, LockError> {
        drop(book);
        let fresh = WaitEvent::new(kind.reset_mode())?;
        let mut book = self.lock_book()?;
        let slot = book.event_slot(kind);
        if slot.is_none() {
            trace!("lock {}: created {:?} wait event", self.id, kind);
            *slot = Some(Arc::new(fresh));
        }
        Ok(book)
    }

    /// Park on `kind`'s event. Returns the re-acquired bookkeeping lock when
    /// woken, or `None` on timeout.
    fn wait_on_event<'a>(
        &'a self,
        mut book: Book<'a>,
        kind: WaitKind,
        deadline: &Deadline,
    ) -> Result<Option<Book<'a>>, LockError> {
        let event = book.event_slot(kind).clone();
        let Some(event) = event else {
            return Ok(Some(book));
        };
        event.reset()?;
        *book.waiters_mut(kind) += 1;
        self.publish_waiting_bits(&book);
        drop(book);

        trace!("lock {}: parking {:?} waiter", self.id, kind);
        let waited = event.wait(deadline.remaining_ms());

        let mut book = self.book.lock();
        *book.waiters_mut(kind) -= 1;
        self.publish_waiting_bits(&book);
        match waited {
            Ok(true) => Ok(Some(book)),
            Ok(false) => {
                self.release_blocked_readers(book, kind)?;
                Ok(None)
            }
            Err(e) => {
                self.release_blocked_readers(book, kind)?;
                Err(e.into())
            }
        }
    }

    /// A writer that stops waiting may have been the last thing holding
    /// readers back.
    fn release_blocked_readers(&self, book: Book<'_>, kind: WaitKind) -> Result<(), LockError> {
        if kind.blocks_readers() {
            self.wake_readers(book)
        } else {
            Ok(())
        }
    }

    /// Wake policy, run after a role was released. Priority: the upgrade
    /// owner waiting to write, then one writer, then every reader and
    /// upgrader.
    fn exit_and_wake(&self, book: Book<'_>) -> Result<(), LockError> {
        if !book.has_waiters() {
            return Ok(());
        }
        let s = self.load_state();
        if s.writer_held {
            return Ok(());
        }
        let readers = s.reader_count;

        if book.write_upgrade_waiters > 0 {
            // Upgrader holding a nested read: its two slots are all that remain.
            if book.upgrade_holding_read && readers == 2 {
                return self.signal(book, WaitKind::UpgradeToWrite);
            }
            if readers == 1 {
                return self.signal(book, WaitKind::UpgradeToWrite);
            }
        }
        if readers == 0 && book.write_waiters > 0 {
            return self.signal(book, WaitKind::Write);
        }
        self.wake_readers(book)
    }

    fn wake_readers(&self, book: Book<'_>) -> Result<(), LockError> {
        if book.write_waiters != 0 || book.write_upgrade_waiters != 0 {
            return Ok(());
        }
        let read = if book.read_waiters > 0 {
            book.read_event.clone()
        } else {
            None
        };
        let upgrade = if book.upgrade_waiters > 0
            && self.upgrade_owner.load(Ordering::SeqCst) == NO_OWNER
        {
            book.upgrade_event.clone()
        } else {
            None
        };
        drop(book);

        if let Some(e) = read {
            e.set()?;
        }
        if let Some(e) = upgrade {
            e.set()?;
        }
        Ok(())
    }

    /// Set `kind`'s event after dropping the bookkeeping lock (the wakee
    /// needs it).
    fn signal(&self, mut book: Book<'_>, kind: WaitKind) -> Result<(), LockError> {
        let event = book.event_slot(kind).clone();
        drop(book);
        if let Some(e) = event {
            e.set()?;
        }
        Ok(())
    }
}

impl Default for ReentrantRwLock {
    fn default() -> Self {
        Self::new(RecursionPolicy::NoRecursion)
    }
}

impl fmt::Debug for ReentrantRwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.load_state();
        f.debug_struct("ReentrantRwLock")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("reader_count", &s.reader_count)
            .field("writer_held", &s.writer_held)
            .field("writers_waiting", &s.writers_waiting)
            .field("upgrader_waiting", &s.upgrader_waiting)
            .finish()
    }
}
