//! C ABI for a self-contained tracked spinlock (`spec.md` §7), the
//! FFI-facing counterpart of [`crate::spinlock::TrackedSpinlock`]. Mirrors
//! `ffi::mutex`'s shape; see `handler.c`'s `pthread_spin_lock` family for
//! the non-sleepable counterpart this models.

use crate::ffi::core::name_from_c;
use crate::ffi::status_to_c;
use crate::spinlock::TrackedSpinlock;
use std::ffi::c_char;
use std::os::raw::c_int;

pub struct LocksmithSpinlock(TrackedSpinlock<()>);

#[unsafe(no_mangle)]
pub extern "C" fn locksmith_spin_create(name: *const c_char) -> *mut LocksmithSpinlock {
    let name = unsafe { name_from_c(name) };
    let spin = TrackedSpinlock::with_name((), name.as_deref());
    Box::into_raw(Box::new(LocksmithSpinlock(spin)))
}

/// # Safety
/// `handle` must have been returned by [`locksmith_spin_create`] and not
/// already destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_spin_destroy(handle: *mut LocksmithSpinlock) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// # Safety
/// `handle` must be a live pointer from [`locksmith_spin_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_spin_lock(handle: *mut LocksmithSpinlock) -> c_int {
    let spin = unsafe { &(*handle).0 };
    std::mem::forget(spin.lock());
    status_to_c(crate::types::LockStatus::Ok)
}

/// # Safety
/// `handle` must be a live pointer from [`locksmith_spin_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_spin_trylock(handle: *mut LocksmithSpinlock) -> c_int {
    let spin = unsafe { &(*handle).0 };
    match spin.try_lock() {
        Ok(guard) => {
            std::mem::forget(guard);
            status_to_c(crate::types::LockStatus::Ok)
        }
        Err(status) => status_to_c(status),
    }
}

/// # Safety
/// `handle` must be a live pointer from [`locksmith_spin_create`], and the
/// calling thread must currently hold it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_spin_unlock(handle: *mut LocksmithSpinlock) -> c_int {
    let spin = unsafe { &(*handle).0 };
    let status = unsafe { spin.force_unlock() };
    status_to_c(status)
}
