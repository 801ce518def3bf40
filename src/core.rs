//! Interception core (`spec.md` §4.4): the six operations the shim layer
//! calls around a real lock primitive, plus the reentrancy guard that
//! keeps the core's own bookkeeping from being mistaken for application
//! locking.
//!
//! Every public function here takes a [`LockAddress`], never a typed
//! wrapper — callers ([`crate::mutex`], [`crate::spinlock`], and the FFI
//! shims) are responsible for handing back a stable address per live
//! instance.

use crate::held;
use crate::registry::Registry;
use crate::reporter;
use crate::types::{current_thread_id, ErrorCode, LockAddress, LockId, LockOrderViolation, LockStatus};
use lazy_static::lazy_static;
use std::cell::Cell;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

thread_local! {
    // Set for the duration of any call into this module. A second call on
    // the same thread while this is set means a report callback (or some
    // other reentrant caller) is itself taking a tracked lock; the guarded
    // functions short-circuit to `Ok` in that case rather than deadlocking
    // against their own thread-local state or double-reporting.
    static IN_CORE: Cell<bool> = const { Cell::new(false) };
}

fn guard<R>(default_if_reentrant: R, f: impl FnOnce() -> R) -> R {
    if IN_CORE.with(|g| g.replace(true)) {
        return default_if_reentrant;
    }
    let result = f();
    IN_CORE.with(|g| g.set(false));
    result
}

/// `optional_init` (`spec.md` §4.4): intern `address` if it isn't already
/// live. Always signals `AlreadyInitialized` for a re-init of a live
/// address — whether that is an error or a soft success is the calling
/// shim's call (`spec.md` §7), not the core's; lazy callers like
/// [`prelock`] go straight to the registry instead of through here so they
/// never see this signal at all.
pub fn optional_init(address: LockAddress, name: Option<&str>, is_sleepable: bool) -> LockStatus {
    let (_, created) = REGISTRY.intern(address, name, is_sleepable);
    if created {
        LockStatus::Ok
    } else {
        LockStatus::AlreadyInitialized
    }
}

/// `destroy` (`spec.md` §4.4). Reports `BUSY` when refused.
pub fn destroy(address: LockAddress) -> LockStatus {
    guard(LockStatus::Ok, || {
        let status = REGISTRY.destroy(address);
        if matches!(status, LockStatus::Busy) {
            reporter::report(ErrorCode::Busy, format!("destroy of held lock at {address}"));
        }
        status
    })
}

/// `prelock` (`spec.md` §4.4): called before the real lock/trylock, after
/// `optional_init` has ensured the address is interned. Checks the held
/// set for self-recursion and the lock-order graph for a would-be cycle;
/// on either, reports `DEADLK` and returns [`LockStatus::WouldDeadlock`]
/// without touching the underlying primitive.
///
/// `may_fail` distinguishes a blocking lock call (spec §4.4: still reports
/// but lets the caller decide whether to proceed) from a trylock-style
/// call, where the shim must refuse the underlying attempt outright.
pub fn prelock(address: LockAddress, is_sleepable: bool, may_fail: bool) -> LockStatus {
    guard(LockStatus::Ok, || {
        let (id, _) = REGISTRY.intern(address, None, is_sleepable);
        let thread = current_thread_id();

        if held::contains(id) {
            reporter::report(
                ErrorCode::Deadlk,
                format!("{thread} attempted to re-acquire {id} it already holds"),
            );
            return if may_fail {
                LockStatus::WouldDeadlock
            } else {
                LockStatus::Ok
            };
        }

        let held_set = held::snapshot();
        if let Some(cycle) = REGISTRY.check_and_link(id, &held_set) {
            let violation = LockOrderViolation {
                thread,
                acquiring: id,
                cycle: cycle.clone(),
                held_set,
            };
            reporter::report(ErrorCode::Deadlk, format_violation(&violation));
            return if may_fail {
                LockStatus::WouldDeadlock
            } else {
                LockStatus::Ok
            };
        }

        LockStatus::Ok
    })
}

/// `postlock` (`spec.md` §4.4): called after the real lock call returns.
/// `acquired` is the real primitive's own success signal — when it failed
/// (spurious wakeup, timeout, a trylock the shim let through), the core
/// must not record an acquisition that never happened.
pub fn postlock(address: LockAddress, acquired: bool) {
    if !acquired {
        return;
    }
    guard((), || {
        let Some(id) = REGISTRY.lookup(address) else {
            return;
        };
        let thread = current_thread_id();
        REGISTRY.mark_held(id, thread);
        let _ = held::push(id);
    })
}

/// `preunlock` (`spec.md` §4.4): verifies the calling thread is the
/// current holder before the real unlock runs. Returns [`LockStatus::Perm`]
/// without mutating any state if it is not — the caller decides whether to
/// proceed with the real unlock regardless.
pub fn preunlock(address: LockAddress) -> LockStatus {
    guard(LockStatus::Ok, || {
        let Some(id) = REGISTRY.lookup(address) else {
            return LockStatus::Ok;
        };
        let thread = current_thread_id();
        if REGISTRY.held_by(id) != Some(thread) {
            reporter::report(
                ErrorCode::Perm,
                format!("{thread} attempted to unlock {id} it does not hold"),
            );
            return LockStatus::Perm;
        }
        LockStatus::Ok
    })
}

/// `postunlock` (`spec.md` §4.4): called after the real unlock returns.
pub fn postunlock(address: LockAddress) {
    guard((), || {
        let Some(id) = REGISTRY.lookup(address) else {
            return;
        };
        let thread = current_thread_id();
        REGISTRY.clear_held(id, thread);
        let _ = held::remove(id);
    })
}

fn format_violation(v: &LockOrderViolation) -> String {
    let cycle = v
        .cycle
        .iter()
        .map(LockId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    format!(
        "{} would close a lock-order cycle acquiring {}: {}",
        v.thread, v.acquiring, cycle
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: usize) -> LockAddress {
        LockAddress(n)
    }

    #[test]
    fn lock_unlock_round_trip_has_no_violation() {
        let a = addr(0x1000);
        assert_eq!(optional_init(a, Some("a"), true), LockStatus::Ok);
        assert_eq!(prelock(a, true, true), LockStatus::Ok);
        postlock(a, true);
        assert_eq!(preunlock(a), LockStatus::Ok);
        postunlock(a);
        assert_eq!(destroy(a), LockStatus::Ok);
    }

    #[test]
    fn ab_ba_inversion_is_detected_on_trylock() {
        let a = addr(0x2000);
        let b = addr(0x2008);
        optional_init(a, Some("a"), true);
        optional_init(b, Some("b"), true);

        // Establish A -> B.
        assert_eq!(prelock(a, true, true), LockStatus::Ok);
        postlock(a, true);
        assert_eq!(prelock(b, true, true), LockStatus::Ok);
        postlock(b, true);
        assert_eq!(preunlock(b), LockStatus::Ok);
        postunlock(b);
        assert_eq!(preunlock(a), LockStatus::Ok);
        postunlock(a);

        // Reverse order B -> A must be refused for a trylock-style caller.
        assert_eq!(prelock(b, true, true), LockStatus::Ok);
        postlock(b, true);
        assert_eq!(prelock(a, true, true), LockStatus::WouldDeadlock);

        postunlock(b);
        let _ = destroy(a);
        let _ = destroy(b);
    }

    #[test]
    fn destroy_of_a_never_initialized_address_is_not_found() {
        let a = addr(0x9000);
        assert_eq!(destroy(a), LockStatus::NotFound);
    }

    #[test]
    fn destroy_refuses_a_held_lock() {
        let a = addr(0x3000);
        optional_init(a, Some("a"), true);
        prelock(a, true, true);
        postlock(a, true);

        assert_eq!(destroy(a), LockStatus::Busy);

        preunlock(a);
        postunlock(a);
        assert_eq!(destroy(a), LockStatus::Ok);
    }

    #[test]
    fn fresh_address_gets_a_fresh_id_after_destroy() {
        let a = addr(0x4000);
        optional_init(a, Some("first"), true);
        let first = REGISTRY.lookup(a).unwrap();
        destroy(a);
        optional_init(a, Some("second"), true);
        let second = REGISTRY.lookup(a).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unlock_by_non_owner_is_refused() {
        let a = addr(0x5000);
        optional_init(a, Some("a"), true);
        prelock(a, true, true);
        postlock(a, true);

        let status = std::thread::spawn(move || preunlock(a)).join().unwrap();
        assert_eq!(status, LockStatus::Perm);

        preunlock(a);
        postunlock(a);
        let _ = destroy(a);
    }
}
