// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX wait event: a process-private pthread mutex + condition variable
// guarding a signaled flag. Manual-reset events also carry a generation
// counter so that a `reset` racing a `set` cannot strand threads the `set`
// already released.

use std::cell::UnsafeCell;
use std::io;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

struct EventState {
    signaled: bool,
    generation: u64,
}

struct Inner {
    mtx: UnsafeCell<libc::pthread_mutex_t>,
    cond: UnsafeCell<libc::pthread_cond_t>,
    state: UnsafeCell<EventState>,
}

pub struct PlatformEvent {
    // Boxed: pthread objects must not move once in use.
    inner: Box<Inner>,
    manual: bool,
}

// Safety: `state` is only touched with `mtx` held; the pthread objects are
// designed for concurrent use.
unsafe impl Send for PlatformEvent {}
unsafe impl Sync for PlatformEvent {}

/// Absolute `CLOCK_REALTIME` timespec `after` from now, as
/// `pthread_cond_timedwait` expects.
fn abs_timespec(after: Duration) -> libc::timespec {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let deadline = now + after;
    libc::timespec {
        tv_sec: deadline.as_secs() as libc::time_t,
        tv_nsec: deadline.subsec_nanos() as libc::c_long,
    }
}

fn check(eno: libc::c_int) -> io::Result<()> {
    if eno != 0 {
        return Err(io::Error::from_raw_os_error(eno));
    }
    Ok(())
}

impl PlatformEvent {
    /// Create an unsignaled event.
    pub fn new(manual: bool) -> io::Result<Self> {
        Ok(Self {
            inner: Box::new(Inner {
                mtx: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
                cond: UnsafeCell::new(libc::PTHREAD_COND_INITIALIZER),
                state: UnsafeCell::new(EventState {
                    signaled: false,
                    generation: 0,
                }),
            }),
            manual,
        })
    }

    fn lock(&self) -> io::Result<()> {
        check(unsafe { libc::pthread_mutex_lock(self.inner.mtx.get()) })
    }

    fn unlock(&self) -> io::Result<()> {
        check(unsafe { libc::pthread_mutex_unlock(self.inner.mtx.get()) })
    }

    /// Run `f` on the event state with the mutex held.
    fn with_state<R>(&self, f: impl FnOnce(&mut EventState) -> R) -> io::Result<R> {
        self.lock()?;
        // Safety: `mtx` is held.
        let r = f(unsafe { &mut *self.inner.state.get() });
        self.unlock()?;
        Ok(r)
    }

    /// Signal the event. Manual-reset releases every waiter and stays
    /// signaled; auto-reset releases exactly one waiter.
    pub fn set(&self) -> io::Result<()> {
        self.with_state(|s| {
            s.signaled = true;
            s.generation = s.generation.wrapping_add(1);
        })?;
        let cond = self.inner.cond.get();
        if self.manual {
            check(unsafe { libc::pthread_cond_broadcast(cond) })
        } else {
            check(unsafe { libc::pthread_cond_signal(cond) })
        }
    }

    pub fn reset(&self) -> io::Result<()> {
        self.with_state(|s| s.signaled = false)
    }

    /// Block until signaled. `None` waits forever.
    /// Returns `Ok(true)` if signaled, `Ok(false)` on timeout.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        self.lock()?;
        let result = self.wait_locked(deadline);
        self.unlock()?;
        result
    }

    fn wait_locked(&self, deadline: Option<Instant>) -> io::Result<bool> {
        let mtx = self.inner.mtx.get();
        let cond = self.inner.cond.get();
        let state = self.inner.state.get();
        // Safety: every access to `state` below happens with `mtx` held;
        // pthread_cond_*wait re-acquires it before returning.
        let start_gen = unsafe { (*state).generation };
        loop {
            {
                let s = unsafe { &mut *state };
                if s.signaled {
                    if !self.manual {
                        s.signaled = false;
                    }
                    return Ok(true);
                }
                if self.manual && s.generation != start_gen {
                    // Released by a `set` that a later `reset` already undid.
                    return Ok(true);
                }
            }
            match deadline {
                None => check(unsafe { libc::pthread_cond_wait(cond, mtx) })?,
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        return Ok(false);
                    }
                    let ts = abs_timespec(at - now);
                    let eno = unsafe { libc::pthread_cond_timedwait(cond, mtx, &ts) };
                    if eno != 0 && eno != libc::ETIMEDOUT {
                        return Err(io::Error::from_raw_os_error(eno));
                    }
                    // On ETIMEDOUT loop once more: the flag may have been set
                    // right at the deadline, and the Instant check decides.
                }
            }
        }
    }
}

impl Drop for PlatformEvent {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_cond_destroy(self.inner.cond.get());
            libc::pthread_mutex_destroy(self.inner.mtx.get());
        }
    }
}
