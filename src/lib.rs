//! # Locksmith
//!
//! A runtime lock-order verifier for native threads.
//!
//! Locksmith tracks the order in which a process's mutexes and spinlocks
//! are acquired and maintains a directed graph of the orderings it has
//! observed. An acquisition that would close a cycle in that graph — the
//! classic AB/BA inversion — is reported through a user-installable
//! callback before it can deadlock the process, and for non-blocking
//! (trylock) callers the acquisition itself is made to fail.
//!
//! ## Usage Example
//!
//! ```rust
//! use locksmith::{Locksmith, TrackedMutex};
//! use std::sync::Arc;
//! use std::thread;
//!
//! Locksmith::new()
//!     .callback(|code, message| {
//!         eprintln!("lock-order violation ({code}): {message}");
//!     })
//!     .start()
//!     .expect("locksmith already started");
//!
//! let mutex_a = Arc::new(TrackedMutex::with_name((), Some("A")));
//! let mutex_b = Arc::new(TrackedMutex::with_name((), Some("B")));
//!
//! let (a, b) = (Arc::clone(&mutex_a), Arc::clone(&mutex_b));
//! let t1 = thread::spawn(move || {
//!     let _g1 = a.lock();
//!     let _g2 = b.lock();
//! });
//! t1.join().unwrap();
//!
//! // Locking in reverse order is a reported (and, via `try_lock`, refused)
//! // inversion — it does not run here to keep the doctest deterministic.
//! ```

mod core;
mod graph;
mod held;
mod mutex;
mod registry;
mod reporter;
mod spinlock;
mod types;

pub mod ffi;

pub use mutex::{TrackedMutex, TrackedMutexGuard};
pub use reporter::set_error_callback;
pub use spinlock::{TrackedSpinlock, TrackedSpinlockGuard};
pub use types::{ErrorCode, LockAddress, LockId, LockOrderViolation, LockStatus, ThreadId, Verbosity};

use std::sync::atomic::{AtomicBool, Ordering};

static STARTED: AtomicBool = AtomicBool::new(false);

/// Builder for process-wide setup, mirroring the teacher's `Deloxide`
/// builder: a callback and a verbosity knob are configured, then `start`
/// installs them exactly once.
#[derive(Default)]
pub struct Locksmith {
    callback: Option<Box<dyn Fn(ErrorCode, &str) + Send + Sync>>,
    verbosity: Option<Verbosity>,
}

impl Locksmith {
    pub fn new() -> Self {
        Locksmith::default()
    }

    /// Installs `f` as the process-wide error callback once [`start`] runs.
    /// Without this, reports go to the default stderr formatter.
    ///
    /// [`start`]: Locksmith::start
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(ErrorCode, &str) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Installs the configured callback and verbosity. Only the first call
    /// in a process's lifetime has any effect; later calls return an error
    /// rather than silently clobbering a callback another part of the
    /// program already relies on.
    pub fn start(self) -> anyhow::Result<()> {
        if STARTED.swap(true, Ordering::SeqCst) {
            anyhow::bail!("Locksmith::start called more than once in this process");
        }
        if let Some(callback) = self.callback {
            reporter::set_error_callback(move |code, message| callback(code, message));
        }
        if let Some(verbosity) = self.verbosity {
            reporter::set_verbosity(verbosity);
        }
        Ok(())
    }
}
