// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-thread recursion counts and illegal role transitions under both
// recursion policies.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use librwlock::{LockError, RecursionPolicy, ReentrantRwLock, Role, Timeout, Violation};

fn violation(r: Result<(), LockError>) -> Violation {
    match r {
        Err(LockError::RecursionViolation(v)) => v,
        other => panic!("expected a recursion violation, got {other:?}"),
    }
}

fn mismatched(r: Result<(), LockError>) -> Role {
    match r {
        Err(LockError::MismatchedExit(role)) => role,
        other => panic!("expected a mismatched exit, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// NoRecursion
// ---------------------------------------------------------------------------

#[test]
fn no_recursion_rejects_reentry() {
    let lock = ReentrantRwLock::new(RecursionPolicy::NoRecursion);

    lock.enter_read().unwrap();
    assert_eq!(violation(lock.enter_read()), Violation::RecursiveRead);
    assert_eq!(violation(lock.enter_write()), Violation::WriteAfterRead);
    assert_eq!(
        violation(lock.enter_upgradeable_read()),
        Violation::UpgradeAfterRead
    );
    assert_eq!(lock.recursive_read_count(), 1);
    lock.exit_read().unwrap();

    lock.enter_write().unwrap();
    assert_eq!(violation(lock.enter_write()), Violation::RecursiveWrite);
    assert_eq!(violation(lock.enter_read()), Violation::ReadAfterWrite);
    assert_eq!(
        violation(lock.enter_upgradeable_read()),
        Violation::UpgradeAfterWrite
    );
    assert_eq!(lock.recursive_write_count(), 1);
    lock.exit_write().unwrap();

    lock.enter_upgradeable_read().unwrap();
    assert_eq!(
        violation(lock.enter_upgradeable_read()),
        Violation::RecursiveUpgrade
    );
    lock.exit_upgradeable_read().unwrap();

    assert!(lock.try_enter_write(Timeout::ZERO).unwrap());
    lock.exit_write().unwrap();
}

#[test]
fn violations_leave_state_untouched() {
    let lock = ReentrantRwLock::new(RecursionPolicy::NoRecursion);
    lock.enter_read().unwrap();
    let _ = lock.enter_read();
    let _ = lock.enter_write();
    assert_eq!(lock.current_read_count(), 1);
    assert_eq!(lock.recursive_read_count(), 1);
    lock.exit_read().unwrap();
    assert_eq!(lock.current_read_count(), 0);
    lock.dispose().unwrap();
}

#[test]
fn no_recursion_upgrader_may_read_once() {
    let lock = ReentrantRwLock::new(RecursionPolicy::NoRecursion);
    lock.enter_upgradeable_read().unwrap();
    lock.enter_read().unwrap();
    assert!(lock.is_read_held());
    assert_eq!(violation(lock.enter_read()), Violation::RecursiveRead);
    lock.exit_read().unwrap();
    lock.exit_upgradeable_read().unwrap();
}

// ---------------------------------------------------------------------------
// SupportsRecursion
// ---------------------------------------------------------------------------

#[test]
fn recursive_read_symmetry() {
    let lock = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    for n in 1..=5 {
        lock.enter_read().unwrap();
        assert_eq!(lock.recursive_read_count(), n);
    }
    // Nested reads occupy a single slot.
    assert_eq!(lock.current_read_count(), 1);
    for n in (0..5).rev() {
        lock.exit_read().unwrap();
        assert_eq!(lock.recursive_read_count(), n);
    }
    assert!(!lock.is_read_held());
    assert_eq!(mismatched(lock.exit_read()), Role::Read);
}

#[test]
fn recursive_write_symmetry() {
    let lock = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    lock.enter_write().unwrap();
    lock.enter_write().unwrap();
    lock.enter_write().unwrap();
    assert_eq!(lock.recursive_write_count(), 3);
    lock.exit_write().unwrap();
    lock.exit_write().unwrap();
    assert!(lock.is_write_held());
    lock.exit_write().unwrap();
    assert!(!lock.is_write_held());
    assert_eq!(mismatched(lock.exit_write()), Role::Write);
}

#[test]
fn recursive_upgrade_symmetry() {
    let lock = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    lock.enter_upgradeable_read().unwrap();
    lock.enter_upgradeable_read().unwrap();
    assert_eq!(lock.recursive_upgrade_count(), 2);
    lock.exit_upgradeable_read().unwrap();
    assert!(lock.is_upgradeable_read_held());
    lock.exit_upgradeable_read().unwrap();
    assert!(!lock.is_upgradeable_read_held());
    assert_eq!(
        mismatched(lock.exit_upgradeable_read()),
        Role::UpgradeableRead
    );
}

#[test]
fn write_after_read_rejected_even_with_recursion() {
    let lock = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    lock.enter_read().unwrap();
    assert_eq!(violation(lock.enter_write()), Violation::WriteAfterRead);
    assert_eq!(
        violation(lock.enter_upgradeable_read()),
        Violation::UpgradeAfterRead
    );
    lock.exit_read().unwrap();
}

#[test]
fn writer_downgrades_through_nested_read() {
    let lock = Arc::new(ReentrantRwLock::new(RecursionPolicy::SupportsRecursion));
    lock.enter_write().unwrap();
    lock.enter_read().unwrap();
    assert!(lock.is_write_held());
    assert!(lock.is_read_held());

    lock.exit_write().unwrap();
    assert!(!lock.is_write_held());
    assert!(lock.is_read_held());
    assert_eq!(lock.current_read_count(), 1);

    // Another thread can now share the read role.
    let lock2 = Arc::clone(&lock);
    let other = thread::spawn(move || {
        let got = lock2.try_enter_read(Duration::from_secs(5)).unwrap();
        lock2.exit_read().unwrap();
        got
    });
    assert!(other.join().unwrap());

    lock.exit_read().unwrap();
    assert_eq!(lock.current_read_count(), 0);
}

#[test]
fn writer_may_take_upgrade_role_with_recursion() {
    let lock = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    lock.enter_write().unwrap();
    lock.enter_upgradeable_read().unwrap();
    assert!(lock.is_upgradeable_read_held());

    // Leaving write keeps the upgrade role as an ordinary slot.
    lock.exit_write().unwrap();
    assert!(lock.is_upgradeable_read_held());
    assert_eq!(lock.current_read_count(), 0);

    lock.exit_upgradeable_read().unwrap();
    lock.dispose().unwrap();
}

#[test]
fn mismatched_exit_on_fresh_lock() {
    let lock = ReentrantRwLock::default();
    assert_eq!(mismatched(lock.exit_read()), Role::Read);
    assert_eq!(mismatched(lock.exit_write()), Role::Write);
    assert_eq!(
        mismatched(lock.exit_upgradeable_read()),
        Role::UpgradeableRead
    );
}

#[test]
fn exit_on_wrong_thread_is_mismatched() {
    let lock = Arc::new(ReentrantRwLock::default());
    lock.enter_read().unwrap();

    let lock2 = Arc::clone(&lock);
    let role = thread::spawn(move || mismatched(lock2.exit_read()))
        .join()
        .unwrap();
    assert_eq!(role, Role::Read);

    assert_eq!(lock.current_read_count(), 1);
    lock.exit_read().unwrap();
}

#[test]
fn counts_are_per_lock() {
    let a = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    let b = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);
    a.enter_read().unwrap();
    a.enter_read().unwrap();
    b.enter_read().unwrap();
    assert_eq!(a.recursive_read_count(), 2);
    assert_eq!(b.recursive_read_count(), 1);
    b.exit_read().unwrap();
    a.exit_read().unwrap();
    a.exit_read().unwrap();
    assert_eq!(a.recursive_read_count(), 0);
    assert_eq!(b.recursive_read_count(), 0);
}
