//! Core identifier and status types shared by the registry, the graph, and
//! the interception core.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque handle for a live lock, assigned by the name registry on first
/// use. The same memory address reused after `destroy` gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockId(NonZeroUsize);

impl LockId {
    pub(crate) fn from_raw(n: usize) -> Self {
        LockId(NonZeroUsize::new(n).expect("lock id counter must never yield zero"))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// Identifier for a native thread, stable for the thread's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(NonZeroUsize);

impl ThreadId {
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static THIS_THREAD_ID: ThreadId = {
        let n = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        ThreadId(NonZeroUsize::new(n).expect("thread id counter must never yield zero"))
    };
}

/// Returns the current thread's stable identifier, assigning one on first
/// call. Unlike `std::thread::Thread::id`, this is a plain monotonic
/// counter so it is comparable and orderable without depending on
/// unstable standard-library internals.
pub fn current_thread_id() -> ThreadId {
    THIS_THREAD_ID.with(|id| *id)
}

/// The address identity of a lock instance, as seen by the shim layer
/// (a `pthread_mutex_t*`-equivalent opaque handle). Compared only by
/// value; the core never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockAddress(pub usize);

impl LockAddress {
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        LockAddress(ptr as usize)
    }
}

impl std::fmt::Display for LockAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Status codes returned by the core's public operations. Distinct from
/// [`ErrorCode`]: a `LockStatus` is the protocol the shim layer branches on
/// (including soft signals like `NotFound` that are not errors), while an
/// `ErrorCode` is what gets reported to the error callback.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The operation completed with no violation.
    Ok,
    /// A cycle would close (or the thread already holds the lock); for a
    /// trylock-style caller this aborts the acquisition.
    WouldDeadlock,
    /// Destroy was refused because some thread still holds the lock.
    Busy,
    /// `preunlock` by a thread that is not the current holder.
    Perm,
    /// `destroy` of an address the registry never interned — not an error.
    NotFound,
    /// `optional_init` on an address that already has a live record.
    AlreadyInitialized,
    /// An internal invariant was violated.
    Inval,
}

impl LockStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, LockStatus::Ok)
    }
}

/// Error codes surfaced to the user-installed error callback. A strict
/// subset of [`LockStatus`]: `NotFound` and a non-strict `AlreadyInitialized`
/// are signals, not errors, and are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Deadlk,
    Busy,
    Perm,
    Inval,
    AlreadyInitialized,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::Deadlk => "DEADLK",
            ErrorCode::Busy => "BUSY",
            ErrorCode::Perm => "PERM",
            ErrorCode::Inval => "INVAL",
            ErrorCode::AlreadyInitialized => "ALREADY_INITIALIZED",
        };
        f.write_str(s)
    }
}

/// Detail attached to a `DEADLK` report: the cycle that would have closed
/// in the lock-order graph, and the held set that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockOrderViolation {
    /// Thread that attempted the acquisition that would close the cycle.
    pub thread: ThreadId,
    /// Lock being acquired when the violation was detected.
    pub acquiring: LockId,
    /// The cycle in the lock-order graph, starting and ending at `acquiring`.
    pub cycle: Vec<LockId>,
    /// The full held set of `thread` at the moment of the attempt.
    pub held_set: Vec<LockId>,
}

/// Verbosity knob for the default stderr error formatter (spec's "optional
/// sink for the default error formatter").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// One line per report: code and message.
    Quiet,
    /// Also print the held set and candidate cycle, when available.
    Detailed,
}
