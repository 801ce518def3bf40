//! C ABI for a self-contained tracked mutex (`spec.md` §7), the
//! FFI-facing counterpart of [`crate::mutex::TrackedMutex`]. Grounded on
//! the teacher's `ffi/mutex.rs` opaque-pointer pattern
//! (`deloxide_create_mutex` / `deloxide_lock_mutex`) and on `handler.c`'s
//! `pthread_mutex_lock`/`pthread_mutex_trylock`/`pthread_mutex_unlock`
//! shims, which this mirrors one call at a time rather than interposing on
//! the real `pthread_mutex_t` ABI.

use crate::ffi::core::name_from_c;
use crate::ffi::status_to_c;
use crate::mutex::TrackedMutex;
use std::ffi::c_char;
use std::os::raw::c_int;

/// Opaque handle returned by [`locksmith_mutex_create`]. Never dereference
/// from C; pass it back unchanged to the other `locksmith_mutex_*`
/// functions.
pub struct LocksmithMutex(TrackedMutex<()>);

#[unsafe(no_mangle)]
pub extern "C" fn locksmith_mutex_create(name: *const c_char) -> *mut LocksmithMutex {
    let name = unsafe { name_from_c(name) };
    let mutex = TrackedMutex::with_name((), name.as_deref());
    Box::into_raw(Box::new(LocksmithMutex(mutex)))
}

/// # Safety
/// `handle` must have been returned by [`locksmith_mutex_create`] and not
/// already destroyed, and no guard obtained through `handle` may still be
/// outstanding.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_mutex_destroy(handle: *mut LocksmithMutex) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// # Safety
/// `handle` must be a live pointer from [`locksmith_mutex_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_mutex_lock(handle: *mut LocksmithMutex) -> c_int {
    let mutex = unsafe { &(*handle).0 };
    std::mem::forget(mutex.lock());
    status_to_c(crate::types::LockStatus::Ok)
}

/// # Safety
/// `handle` must be a live pointer from [`locksmith_mutex_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_mutex_trylock(handle: *mut LocksmithMutex) -> c_int {
    let mutex = unsafe { &(*handle).0 };
    match mutex.try_lock() {
        Ok(guard) => {
            std::mem::forget(guard);
            status_to_c(crate::types::LockStatus::Ok)
        }
        Err(status) => status_to_c(status),
    }
}

/// Unlocks a mutex previously locked through [`locksmith_mutex_lock`] or
/// [`locksmith_mutex_trylock`] on the same thread.
///
/// # Safety
/// `handle` must be a live pointer from [`locksmith_mutex_create`], and the
/// calling thread must currently hold it — acquired through one of the
/// lock functions above without an intervening unlock.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_mutex_unlock(handle: *mut LocksmithMutex) -> c_int {
    let mutex = unsafe { &(*handle).0 };
    let status = unsafe { mutex.force_unlock() };
    status_to_c(status)
}
