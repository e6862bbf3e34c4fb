// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reentrant reader/writer lock with upgradeable reads.
// Lock-free fast path on a packed state word, per-thread recursion
// bookkeeping, and a spin → yield → sleep → kernel-wait escalation.

mod backoff;
mod platform;
mod recursion;
mod state;

mod error;
pub use error::{LockError, Role, Violation};

mod config;
pub use config::{LockConfig, RecursionPolicy, DEFAULT_SPIN_COUNT};

mod timeout;
pub use timeout::{Timeout, MAX_TIMEOUT_MS};

mod spin_lock;
pub use spin_lock::{SpinLock, SpinLockGuard};

mod event;
pub use event::{ResetMode, WaitEvent};

mod rw_lock;
pub use rw_lock::ReentrantRwLock;

mod guard;
pub use guard::{ReadGuard, UpgradeableReadGuard, WriteGuard};
