// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Escalating backoff shared by the internal spin lock and the lock's
// pre-block spin phase: busy spin → yield → sleep(0) → sleep(1ms).

use std::sync::OnceLock;
use std::time::Duration;

/// Rounds below this busy-spin (multi-core hosts only).
pub(crate) const SPIN_ROUNDS: u32 = 5;
/// Rounds below this yield the CPU.
pub(crate) const YIELD_ROUNDS: u32 = 10;
/// Rounds below this `sleep(0)`; everything later sleeps 1ms.
pub(crate) const SLEEP0_ROUNDS: u32 = 17;

/// Pause-instruction iterations per spin round.
const SPIN_CYCLES: u32 = 20;

/// Number of CPUs available to the process, sampled once.
pub(crate) fn processor_count() -> usize {
    static COUNT: OnceLock<usize> = OnceLock::new();
    *COUNT.get_or_init(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// One backoff step for round `k` (1-based).
///
/// - k < 5:  spin `20 * k` pause hints (skipped on single-CPU hosts)
/// - k < 10: thread yield
/// - k < 17: sleep(0)
/// - k >= 17: sleep 1ms
#[inline]
pub(crate) fn backoff(k: u32) {
    if k < SPIN_ROUNDS && processor_count() > 1 {
        for _ in 0..SPIN_CYCLES * k {
            std::hint::spin_loop();
        }
    } else if k < YIELD_ROUNDS {
        std::thread::yield_now();
    } else if k < SLEEP0_ROUNDS {
        std::thread::sleep(Duration::ZERO);
    } else {
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Advance the round counter and back off. The counter stops growing once it
/// reaches the 1ms sleep tier.
#[inline]
pub(crate) fn adaptive_yield(k: &mut u32) {
    if *k < SLEEP0_ROUNDS {
        *k += 1;
    }
    backoff(*k);
}
