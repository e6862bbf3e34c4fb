// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for lock misuse. Timeouts are not errors: the `try_*` entry
// points report them as `Ok(false)`.

use std::fmt;
use std::io;

use thiserror::Error;

/// The three roles a thread can hold on a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Read,
    Write,
    UpgradeableRead,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::UpgradeableRead => "upgradeable read",
        })
    }
}

/// An illegal role transition for the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// Read requested while holding write, without recursion support.
    ReadAfterWrite,
    /// Read requested again without recursion support.
    RecursiveRead,
    /// Write requested while holding a plain read. Would deadlock.
    WriteAfterRead,
    /// Write requested again without recursion support.
    RecursiveWrite,
    /// Upgradeable read requested while holding a plain read.
    UpgradeAfterRead,
    /// Upgradeable read requested while holding write, without recursion support.
    UpgradeAfterWrite,
    /// Upgradeable read requested again without recursion support.
    RecursiveUpgrade,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Violation::ReadAfterWrite => {
                "a read lock may not be acquired with the write lock held in this mode"
            }
            Violation::RecursiveRead => "recursive read lock acquisitions not allowed in this mode",
            Violation::WriteAfterRead => {
                "write lock may not be acquired with read lock held; this pattern is prone to deadlocks"
            }
            Violation::RecursiveWrite => {
                "recursive write lock acquisitions not allowed in this mode"
            }
            Violation::UpgradeAfterRead => {
                "upgradeable lock may not be acquired with read lock held"
            }
            Violation::UpgradeAfterWrite => {
                "upgradeable lock may not be acquired with write lock held in this mode"
            }
            Violation::RecursiveUpgrade => {
                "recursive upgradeable lock acquisitions not allowed in this mode"
            }
        })
    }
}

/// Errors raised by [`ReentrantRwLock`](crate::ReentrantRwLock).
///
/// All variants describe misuse detected synchronously at the call site;
/// none are retried internally.
#[derive(Debug, Error)]
pub enum LockError {
    /// Timeout was negative (other than the `-1` infinite sentinel) or larger
    /// than `i32::MAX` milliseconds.
    #[error("invalid timeout: {0} ms")]
    InvalidTimeout(i64),

    /// Illegal role transition for the calling thread.
    #[error("recursion violation: {0}")]
    RecursionViolation(Violation),

    /// Exit for a role the calling thread does not hold.
    #[error("the {0} lock is being released without being held")]
    MismatchedExit(Role),

    /// The lock has been disposed.
    #[error("lock has been disposed")]
    Disposed,

    /// Dispose was attempted while a role was held or a thread was waiting.
    #[error("lock is in use: cannot dispose while held or waited on")]
    DisposeInUse,

    /// The platform wait signal reported a failure.
    #[error("wait signal error: {source}")]
    Os {
        #[from]
        source: io::Error,
    },
}

impl From<Violation> for LockError {
    fn from(v: Violation) -> Self {
        LockError::RecursionViolation(v)
    }
}
