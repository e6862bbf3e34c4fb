// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Timeout arguments and the per-call deadline derived from them.

use std::time::{Duration, Instant};

use crate::LockError;

/// Largest accepted finite timeout, in milliseconds.
pub const MAX_TIMEOUT_MS: i64 = i32::MAX as i64;

/// How long a `try_enter_*` call may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait until the role is granted.
    Infinite,
    /// Give up after the duration. `Duration::ZERO` polls once.
    After(Duration),
}

impl Timeout {
    /// Poll without waiting.
    pub const ZERO: Timeout = Timeout::After(Duration::ZERO);

    /// Parse a millisecond timeout where `-1` means infinite.
    pub fn from_millis(ms: i64) -> Result<Self, LockError> {
        match ms {
            -1 => Ok(Timeout::Infinite),
            0..=MAX_TIMEOUT_MS => Ok(Timeout::After(Duration::from_millis(ms as u64))),
            _ => Err(LockError::InvalidTimeout(ms)),
        }
    }

    fn validate(self) -> Result<Self, LockError> {
        if let Timeout::After(d) = self {
            let ms = d.as_millis();
            if ms > MAX_TIMEOUT_MS as u128 {
                return Err(LockError::InvalidTimeout(
                    i64::try_from(ms).unwrap_or(i64::MAX),
                ));
            }
        }
        Ok(self)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::After(d)
    }
}

/// Absolute deadline for one entry call, computed once on entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn start(timeout: Timeout) -> Result<Self, LockError> {
        let at = match timeout.validate()? {
            Timeout::Infinite => None,
            Timeout::After(d) => Some(Instant::now() + d),
        };
        Ok(Self { at })
    }

    pub(crate) fn is_expired(&self) -> bool {
        matches!(self.at, Some(at) if Instant::now() >= at)
    }

    /// Remaining time in whole milliseconds, rounded up so a short remainder
    /// still blocks instead of spinning. `None` means wait forever.
    pub(crate) fn remaining_ms(&self) -> Option<u64> {
        self.at.map(|at| {
            let left = at.saturating_duration_since(Instant::now());
            let ms = left.as_millis() as u64;
            if left > Duration::from_millis(ms) {
                ms + 1
            } else {
                ms
            }
        })
    }
}
