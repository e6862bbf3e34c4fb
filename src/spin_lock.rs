// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock-free spin lock with adaptive backoff: pause → yield → sleep.
// Guards the lock's bookkeeping; held only for short critical sections.

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::backoff::adaptive_yield;

/// A simple spin lock with adaptive backoff, owning the data it protects.
///
/// Uses an `AtomicU32` exchanged 0 → 1 on lock and stored to 0 on unlock.
/// Contended acquirers test before retrying the swap, backing off between
/// attempts.
pub struct SpinLock<T: ?Sized> {
    lc: AtomicU32,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `lc`.
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Create a new unlocked spin lock around `data`.
    pub const fn new(data: T) -> Self {
        Self {
            lc: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Consume the lock, returning the protected data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Acquire the lock (spinning with adaptive backoff).
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        if self
            .lc
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_slow();
        }
        SpinLockGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    #[cold]
    fn lock_slow(&self) {
        let mut k = 0u32;
        loop {
            adaptive_yield(&mut k);
            if self.lc.load(Ordering::Relaxed) == 0
                && self
                    .lc
                    .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
        }
    }

    /// Attempt to acquire the lock without spinning.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.lc
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard {
                lock: self,
                _marker: PhantomData,
            })
    }

    /// Whether some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lc.load(Ordering::Relaxed) != 0
    }

    /// Mutable access without locking; the borrow proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// RAII guard: releases the spin lock on drop.
pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
    // Shares `&T` across threads only when `T: Sync`.
    _marker: PhantomData<&'a mut T>,
}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard proves the lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard proves the lock is held.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.lc.store(0, Ordering::Release);
    }
}
