// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use crate::backoff;

/// Spin rounds before parking on a multi-core host.
pub const DEFAULT_SPIN_COUNT: u32 = 20;

/// Whether a thread may re-enter a role it already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionPolicy {
    /// Re-entering a held role is a [`Violation`](crate::Violation).
    #[default]
    NoRecursion,
    /// Re-entering a held role bumps the thread's recursion count.
    SupportsRecursion,
}

/// Construction-time tuning for [`ReentrantRwLock`](crate::ReentrantRwLock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    pub policy: RecursionPolicy,
    /// Backoff rounds an entry call runs before blocking on a wait signal.
    /// Zero parks on the first failed attempt.
    pub spin_count: u32,
}

impl LockConfig {
    pub fn new(policy: RecursionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_spin_count(mut self, spin_count: u32) -> Self {
        self.spin_count = spin_count;
        self
    }
}

impl Default for LockConfig {
    /// Spinning only pays off when another CPU can release the lock, so a
    /// single-CPU host gets one round.
    fn default() -> Self {
        let spin_count = if backoff::processor_count() > 1 {
            DEFAULT_SPIN_COUNT
        } else {
            1
        };
        Self {
            policy: RecursionPolicy::NoRecursion,
            spin_count,
        }
    }
}
