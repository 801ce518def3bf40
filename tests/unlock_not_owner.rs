//! Scenario: T1 locks L; T2 drops T1's guard (the only way to reach
//! `preunlock` from a different thread through the safe API, since a guard
//! is `Send`). The callback must receive exactly one `PERM` report, and
//! from T1's point of view the lock must still look held afterwards — a
//! subsequent `try_lock` on T1 sees its own held set still containing L
//! and reports a self-reentry `DEADLK`, rather than succeeding.

mod common;

use common::{expect_report, start_reporter, DEADLOCK_TIMEOUT};
use locksmith::{ErrorCode, LockStatus, TrackedMutex};

#[test]
fn unlock_by_a_thread_that_does_not_hold_the_lock_is_refused() {
    let harness = start_reporter();

    let l = TrackedMutex::with_name(0u32, Some("L"));
    let guard = l.lock();

    std::thread::scope(|scope| {
        scope.spawn(move || drop(guard));
    });

    expect_report(&harness, ErrorCode::Perm, DEADLOCK_TIMEOUT);

    // T1's thread-local held set was never touched by T2's drop, so T1
    // still sees L as held.
    let retry = l.try_lock();
    assert!(matches!(retry, Err(LockStatus::WouldDeadlock)));
}
