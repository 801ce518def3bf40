//! Tracked mutex (`spec.md` §6): a `parking_lot::Mutex`-backed RAII
//! wrapper that runs the interception core's six hooks around every lock
//! and unlock, grounded on the teacher's `core/tracked_mutex.rs`.
//!
//! Uses `parking_lot` rather than `std::sync::Mutex` for the same reason
//! the teacher does: no poisoning to thread through `LockStatus`, and (with
//! the manual `Send` impl below) a guard that can be released from a
//! different stack frame than the one that acquired it if a caller chooses
//! to (the core itself never relies on that).

use crate::core;
use crate::types::{LockAddress, LockStatus};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};

/// A mutex that reports lock-order violations through the global error
/// callback before they can deadlock.
pub struct TrackedMutex<T: ?Sized> {
    address: LockAddress,
    inner: Box<Mutex<T>>,
}

impl<T> TrackedMutex<T> {
    /// Creates a tracked mutex and interns it under a name derived from its
    /// own address. Use [`TrackedMutex::with_name`] to give it a
    /// human-readable one instead.
    pub fn new(value: T) -> Self {
        Self::with_name(value, None)
    }

    pub fn with_name(value: T, name: Option<&str>) -> Self {
        // Boxed so `address` is the stable heap address of the backing
        // `Mutex`, taken after allocation — not the address of a stack local
        // that would move (and whose slot could be reused by the next call
        // to this same monomorphization) once it's folded into `Self`.
        let inner = Box::new(Mutex::new(value));
        let address = LockAddress::from_ptr(&*inner);
        core::optional_init(address, name, true);
        TrackedMutex { address, inner }
    }
}

impl<T: ?Sized> TrackedMutex<T> {
    /// Blocks until the lock is acquired. A lock-order violation is
    /// reported but does not stop the acquisition — callers that want
    /// trylock-style refusal should use [`TrackedMutex::try_lock`].
    pub fn lock(&self) -> TrackedMutexGuard<'_, T> {
        core::prelock(self.address, true, false);
        let guard = self.inner.lock();
        core::postlock(self.address, true);
        TrackedMutexGuard {
            address: self.address,
            guard: Some(guard),
        }
    }

    /// Releases the mutex without going through a guard. For FFI callers
    /// that hand a lock/unlock pair across the C ABI boundary, where the
    /// guard returned by `lock`/`try_lock` has already been forgotten on
    /// the Rust side.
    ///
    /// # Safety
    /// The calling thread must currently hold the lock, acquired through
    /// `lock`/`try_lock` with no corresponding release since.
    pub unsafe fn force_unlock(&self) -> LockStatus {
        let status = core::preunlock(self.address);
        unsafe { self.inner.force_unlock() };
        core::postunlock(self.address);
        status
    }

    /// Attempts to acquire the lock without blocking. Refuses outright —
    /// without touching the underlying mutex — if doing so would close a
    /// lock-order cycle or the thread already holds it.
    pub fn try_lock(&self) -> Result<TrackedMutexGuard<'_, T>, LockStatus> {
        let status = core::prelock(self.address, true, true);
        if status != LockStatus::Ok {
            return Err(status);
        }
        match self.inner.try_lock() {
            Some(guard) => {
                core::postlock(self.address, true);
                Ok(TrackedMutexGuard {
                    address: self.address,
                    guard: Some(guard),
                })
            }
            None => Err(LockStatus::Busy),
        }
    }
}

impl<T: ?Sized> Drop for TrackedMutex<T> {
    fn drop(&mut self) {
        core::destroy(self.address);
    }
}

/// RAII guard for [`TrackedMutex`]. Runs `preunlock`/`postunlock` around
/// the real unlock on drop.
pub struct TrackedMutexGuard<'a, T: ?Sized> {
    address: LockAddress,
    guard: Option<MutexGuard<'a, T>>,
}

// `parking_lot::Mutex`'s raw mutex is not reentrant and does not require
// release from the acquiring thread, so handing the guard to another thread
// for release (as `tests/unlock_not_owner.rs` does) is sound; only the
// `send_guard` feature's blanket `GuardSend` would be overkill here since we
// only need this one guard type to cross threads, not every parking_lot
// guard in the binary.
unsafe impl<T: ?Sized + Send> Send for TrackedMutexGuard<'_, T> {}

impl<T: ?Sized> Deref for TrackedMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.guard.as_ref().expect("guard taken before drop")
    }
}

impl<T: ?Sized> DerefMut for TrackedMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.as_mut().expect("guard taken before drop")
    }
}

impl<T: ?Sized> Drop for TrackedMutexGuard<'_, T> {
    fn drop(&mut self) {
        core::preunlock(self.address);
        self.guard.take();
        core::postunlock(self.address);
    }
}
