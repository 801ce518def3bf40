//! Scenario: thread T1 acquires L1 then L2, releases both in order; thread
//! T2 acquires L2, then tries L1 with `try_lock`. The trylock must be
//! refused with `WouldDeadlock` and the callback must receive exactly one
//! `DEADLK` report for that attempt.

mod common;

use common::{expect_report, start_reporter, DEADLOCK_TIMEOUT};
use locksmith::{ErrorCode, LockStatus, TrackedMutex};
use std::sync::Arc;
use std::thread;

#[test]
fn trylock_refused_on_ab_ba_inversion() {
    let harness = start_reporter();

    let l1 = Arc::new(TrackedMutex::with_name(0u32, Some("L1")));
    let l2 = Arc::new(TrackedMutex::with_name(0u32, Some("L2")));

    {
        let g1 = l1.lock();
        let g2 = l2.lock();
        drop(g2);
        drop(g1);
    }

    let l1_clone = Arc::clone(&l1);
    let l2_clone = Arc::clone(&l2);
    thread::spawn(move || {
        let _g2 = l2_clone.lock();
        let result = l1_clone.try_lock();
        assert!(matches!(result, Err(LockStatus::WouldDeadlock)));
    })
    .join()
    .unwrap();

    expect_report(&harness, ErrorCode::Deadlk, DEADLOCK_TIMEOUT);
}
