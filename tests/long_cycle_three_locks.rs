//! Scenario: orderings L1->L2, L2->L3 are observed, then an attempt to
//! close the cycle with L3->L1 must be reported exactly once. The
//! lock-order graph records history independent of which thread produced
//! it, so a single thread reproducing the three orderings in sequence
//! exercises the same cycle-closing check as three separate threads would.

mod common;

use common::{expect_report, start_reporter, DEADLOCK_TIMEOUT};
use locksmith::{ErrorCode, LockStatus, TrackedMutex};

#[test]
fn three_lock_cycle_is_reported_on_the_closing_acquisition() {
    let harness = start_reporter();

    let l1 = TrackedMutex::with_name(0u32, Some("L1"));
    let l2 = TrackedMutex::with_name(0u32, Some("L2"));
    let l3 = TrackedMutex::with_name(0u32, Some("L3"));

    {
        let g1 = l1.lock();
        let g2 = l2.lock();
        drop(g2);
        drop(g1);
    }
    {
        let g2 = l2.lock();
        let g3 = l3.lock();
        drop(g3);
        drop(g2);
    }

    let g3 = l3.lock();
    let closing = l1.try_lock();
    assert!(matches!(closing, Err(LockStatus::WouldDeadlock)));
    drop(g3);

    expect_report(&harness, ErrorCode::Deadlk, DEADLOCK_TIMEOUT);
}
