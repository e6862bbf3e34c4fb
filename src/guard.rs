// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// RAII guards: enter a role on construction, exit it on drop.

use std::marker::PhantomData;

use crate::{LockError, ReentrantRwLock, Timeout};

// Roles are owned by the entering thread; guards must not migrate.
type NotSend = PhantomData<*const ()>;

/// Holds the read role until dropped.
#[must_use = "the read role is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: NotSend,
}

/// Holds the write role until dropped.
#[must_use = "the write role is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: NotSend,
}

/// Holds the upgradeable-read role until dropped.
#[must_use = "the upgradeable-read role is released as soon as the guard is dropped"]
pub struct UpgradeableReadGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: NotSend,
}

impl ReentrantRwLock {
    /// Enter the read role, returning a guard that exits it on drop.
    pub fn read(&self) -> Result<ReadGuard<'_>, LockError> {
        self.enter_read()?;
        Ok(ReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Like [`read`](Self::read), giving up after `timeout` with `Ok(None)`.
    pub fn try_read(
        &self,
        timeout: impl Into<Timeout>,
    ) -> Result<Option<ReadGuard<'_>>, LockError> {
        Ok(self.try_enter_read(timeout)?.then(|| ReadGuard {
            lock: self,
            _not_send: PhantomData,
        }))
    }

    /// Enter the write role, returning a guard that exits it on drop.
    pub fn write(&self) -> Result<WriteGuard<'_>, LockError> {
        self.enter_write()?;
        Ok(WriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Like [`write`](Self::write), giving up after `timeout` with `Ok(None)`.
    pub fn try_write(
        &self,
        timeout: impl Into<Timeout>,
    ) -> Result<Option<WriteGuard<'_>>, LockError> {
        Ok(self.try_enter_write(timeout)?.then(|| WriteGuard {
            lock: self,
            _not_send: PhantomData,
        }))
    }

    /// Enter the upgradeable-read role, returning a guard that exits it on drop.
    pub fn upgradeable_read(&self) -> Result<UpgradeableReadGuard<'_>, LockError> {
        self.enter_upgradeable_read()?;
        Ok(UpgradeableReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Like [`upgradeable_read`](Self::upgradeable_read), giving up after
    /// `timeout` with `Ok(None)`.
    pub fn try_upgradeable_read(
        &self,
        timeout: impl Into<Timeout>,
    ) -> Result<Option<UpgradeableReadGuard<'_>>, LockError> {
        Ok(self.try_enter_upgradeable_read(timeout)?.then(|| UpgradeableReadGuard {
            lock: self,
            _not_send: PhantomData,
        }))
    }
}

impl<'a> UpgradeableReadGuard<'a> {
    /// Take the write role without giving up the upgradeable read. Blocks
    /// until the other readers have left.
    pub fn upgrade(&self) -> Result<WriteGuard<'a>, LockError> {
        self.lock.enter_write()?;
        Ok(WriteGuard {
            lock: self.lock,
            _not_send: PhantomData,
        })
    }

    /// Like [`upgrade`](Self::upgrade), giving up after `timeout` with
    /// `Ok(None)`.
    pub fn try_upgrade(
        &self,
        timeout: impl Into<Timeout>,
    ) -> Result<Option<WriteGuard<'a>>, LockError> {
        Ok(self.lock.try_enter_write(timeout)?.then(|| WriteGuard {
            lock: self.lock,
            _not_send: PhantomData,
        }))
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.exit_read();
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.exit_write();
    }
}

impl Drop for UpgradeableReadGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.exit_upgradeable_read();
    }
}
