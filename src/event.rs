// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform binary wait signal.
// Delegates to platform::PlatformEvent (POSIX or Windows).

use std::fmt;
use std::io;

use crate::platform::PlatformEvent;

/// How a signaled event returns to the unsignaled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Stays signaled, releasing every waiter, until [`WaitEvent::reset`].
    Manual,
    /// Releases one waiter and resets itself.
    Auto,
}

/// A process-local, kernel-backed binary wait signal.
///
/// On POSIX this is a `pthread_mutex_t` + `pthread_cond_t` pair guarding a
/// signaled flag. On Windows this is an unnamed event from `CreateEventW`.
pub struct WaitEvent {
    inner: PlatformEvent,
    mode: ResetMode,
}

impl WaitEvent {
    /// Create an unsignaled event.
    pub fn new(mode: ResetMode) -> io::Result<Self> {
        let inner = PlatformEvent::new(mode == ResetMode::Manual)?;
        Ok(Self { inner, mode })
    }

    pub fn mode(&self) -> ResetMode {
        self.mode
    }

    /// Signal the event.
    pub fn set(&self) -> io::Result<()> {
        self.inner.set()
    }

    /// Return the event to the unsignaled state.
    pub fn reset(&self) -> io::Result<()> {
        self.inner.reset()
    }

    /// Block until the event is signaled.
    /// If `timeout_ms` is `None`, blocks indefinitely.
    /// Returns `Ok(true)` if signaled, `Ok(false)` on timeout.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        self.inner.wait(timeout_ms)
    }
}

impl fmt::Debug for WaitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitEvent").field("mode", &self.mode).finish()
    }
}
