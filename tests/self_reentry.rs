//! Scenario: a thread that already holds L attempts to acquire it again.
//! Using `try_lock` for the second attempt keeps this deterministic — a
//! blocking second `lock()` on a non-reentrant mutex would simply hang the
//! thread against itself, which is not what this scenario is testing.

mod common;

use common::{expect_report, start_reporter, DEADLOCK_TIMEOUT};
use locksmith::{ErrorCode, LockStatus, TrackedMutex};

#[test]
fn reacquiring_an_already_held_lock_is_reported_and_refused() {
    let harness = start_reporter();

    let l = TrackedMutex::with_name(0u32, Some("L"));
    let _first = l.lock();

    let second = l.try_lock();
    assert!(matches!(second, Err(LockStatus::WouldDeadlock)));

    expect_report(&harness, ErrorCode::Deadlk, DEADLOCK_TIMEOUT);
}
