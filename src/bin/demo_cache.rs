// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Read-mostly cache guarded by a ReentrantRwLock.
//
// Usage:
//   demo_cache [readers] [keys] [lookups]
//
// Readers look keys up under the read role. A miss re-checks under the
// upgradeable-read role and upgrades to write only if the key is still
// missing, so concurrent misses on the same key fill it once.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use librwlock::{LockError, RecursionPolicy, ReentrantRwLock};

struct Cache {
    lock: ReentrantRwLock,
    map: UnsafeCell<HashMap<u64, u64>>,
    fills: AtomicUsize,
}

// Safety: `map` is only read under a read/upgradeable role and only written
// under the write role.
unsafe impl Sync for Cache {}

fn expensive(key: u64) -> u64 {
    (0..1_000u64).fold(key, |acc, i| acc.wrapping_mul(31).wrapping_add(i))
}

impl Cache {
    fn new() -> Self {
        Self {
            lock: ReentrantRwLock::new(RecursionPolicy::SupportsRecursion),
            map: UnsafeCell::new(HashMap::new()),
            fills: AtomicUsize::new(0),
        }
    }

    fn get(&self, key: u64) -> Result<u64, LockError> {
        {
            let _r = self.lock.read()?;
            if let Some(v) = unsafe { (*self.map.get()).get(&key) } {
                return Ok(*v);
            }
        }

        let up = self.lock.upgradeable_read()?;
        if let Some(v) = unsafe { (*self.map.get()).get(&key) } {
            return Ok(*v);
        }
        let value = expensive(key);
        let _w = up.upgrade()?;
        unsafe { (*self.map.get()).insert(key, value) };
        self.fills.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let arg = |i: usize, default: u64| {
        args.get(i)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(default)
    };
    let readers = arg(1, 4) as usize;
    let keys = arg(2, 64).max(1);
    let lookups = arg(3, 10_000);

    let cache = Arc::new(Cache::new());
    let start = Instant::now();

    let handles: Vec<_> = (0..readers)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut sum = 0u64;
                for i in 0..lookups {
                    let key = (i * 7 + t as u64) % keys;
                    sum = sum.wrapping_add(cache.get(key).expect("cache get"));
                }
                sum
            })
        })
        .collect();

    let mut total = 0u64;
    for h in handles {
        total = total.wrapping_add(h.join().expect("reader thread"));
    }

    println!(
        "readers={readers} keys={keys} lookups={lookups} fills={} checksum={total:#x} elapsed={:?}",
        cache.fills.load(Ordering::Relaxed),
        start.elapsed()
    );
    cache.lock.dispose().expect("dispose");
}
