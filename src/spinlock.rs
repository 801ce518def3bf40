//! Tracked spinlock (`spec.md` §6): a busy-wait primitive with the same
//! tracked-acquisition shape as [`crate::mutex::TrackedMutex`], but
//! `is_sleepable = false` so the core and any downstream tooling can tell
//! it apart from a blocking mutex (`spec.md` §3 glossary: sleepable vs.
//! spin locks participate in the same lock-order graph but are reported
//! distinctly).
//!
//! The teacher has no spinlock type to ground this on directly; the
//! busy-wait loop follows the standard `AtomicBool::compare_exchange_weak`
//! + `spin_loop` idiom, and the tracked-acquisition shape mirrors
//! [`crate::mutex::TrackedMutex`] exactly.

use crate::core;
use crate::types::{LockAddress, LockStatus};
use std::cell::UnsafeCell;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct TrackedSpinlock<T: ?Sized> {
    address: LockAddress,
    locked: Box<AtomicBool>,
    value: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for TrackedSpinlock<T> {}
unsafe impl<T: ?Sized + Send> Sync for TrackedSpinlock<T> {}

impl<T> TrackedSpinlock<T> {
    pub fn new(value: T) -> Self {
        Self::with_name(value, None)
    }

    pub fn with_name(value: T, name: Option<&str>) -> Self {
        // Boxed for the same reason as `TrackedMutex::with_name`: `address`
        // must be the stable heap address of `locked`, taken after
        // allocation, not the address of a stack local that moves into
        // `Self` (and whose slot a sequential call at the same call site
        // could reuse).
        let locked = Box::new(AtomicBool::new(false));
        let address = LockAddress::from_ptr(&*locked);
        core::optional_init(address, name, false);
        TrackedSpinlock {
            address,
            locked,
            value: UnsafeCell::new(value),
        }
    }
}

impl<T: ?Sized> TrackedSpinlock<T> {
    pub fn lock(&self) -> TrackedSpinlockGuard<'_, T> {
        core::prelock(self.address, false, false);
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
        core::postlock(self.address, true);
        TrackedSpinlockGuard { lock: self }
    }

    pub fn try_lock(&self) -> Result<TrackedSpinlockGuard<'_, T>, LockStatus> {
        let status = core::prelock(self.address, false, true);
        if status != LockStatus::Ok {
            return Err(status);
        }
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            core::postlock(self.address, true);
            Ok(TrackedSpinlockGuard { lock: self })
        } else {
            Err(LockStatus::Busy)
        }
    }
}

impl<T: ?Sized> TrackedSpinlock<T> {
    /// Releases the spinlock without going through a guard, for FFI callers
    /// that forgot the guard returned by `lock`/`try_lock` on the Rust side.
    ///
    /// # Safety
    /// The calling thread must currently hold the lock, acquired through
    /// `lock`/`try_lock` with no corresponding release since.
    pub unsafe fn force_unlock(&self) -> LockStatus {
        let status = core::preunlock(self.address);
        self.locked.store(false, Ordering::Release);
        core::postunlock(self.address);
        status
    }
}

impl<T: ?Sized> Drop for TrackedSpinlock<T> {
    fn drop(&mut self) {
        core::destroy(self.address);
    }
}

pub struct TrackedSpinlockGuard<'a, T: ?Sized> {
    lock: &'a TrackedSpinlock<T>,
}

impl<T: ?Sized> Deref for TrackedSpinlockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<T: ?Sized> DerefMut for TrackedSpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T: ?Sized> Drop for TrackedSpinlockGuard<'_, T> {
    fn drop(&mut self) {
        core::preunlock(self.lock.address);
        self.lock.locked.store(false, Ordering::Release);
        core::postunlock(self.lock.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_lock_unlock() {
        let s = TrackedSpinlock::new(0u32);
        *s.lock() = 7;
        assert_eq!(*s.lock(), 7);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let s = TrackedSpinlock::new(0u32);
        let _g = s.lock();
        assert!(matches!(s.try_lock(), Err(LockStatus::Busy)));
    }
}
