//! Error reporter (`spec.md` §4.5): a user-replaceable callback plus a
//! default stderr formatter, both thread-safe. [`report`] invokes the
//! callback synchronously, on the thread that detected the violation,
//! after the registry lock has been dropped — `spec.md` §5 requires the
//! callback to fire strictly between `prelock`'s graph check and its
//! return, which a background dispatch thread (the shape of the teacher's
//! `Dispatcher` in `core/detector.rs`) cannot guarantee. Reentrancy when the
//! callback itself takes a tracked lock is handled by the thread-local "in
//! core" flag in [`crate::core`], not by moving execution to another thread.

use crate::types::{ErrorCode, Verbosity};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

type Callback = Arc<dyn Fn(ErrorCode, &str) + Send + Sync>;

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Quiet as u8);

// Last-writer-wins: replacing the callback while a report is in flight is
// racy by design (`spec.md` §5), so a plain mutex over the slot is enough.
static CALLBACK: Mutex<Option<Callback>> = Mutex::new(None);

/// Installs a process-global error callback. Overwrites whatever was
/// previously installed, including the default handler.
pub fn set_error_callback<F>(callback: F)
where
    F: Fn(ErrorCode, &str) + Send + Sync + 'static,
{
    *CALLBACK.lock() = Some(Arc::new(callback));
}

/// Sets the verbosity of the default stderr formatter. Has no effect once
/// a custom callback has been installed via [`set_error_callback`].
pub fn set_verbosity(verbosity: Verbosity) {
    VERBOSITY.store(verbosity as u8, Ordering::Relaxed);
}

/// Formats and invokes the callback (or the default handler) synchronously.
/// Never invoked with the registry lock held (`spec.md` §4.5) — callers
/// must drop it first. Returns only after the callback has run.
pub fn report(code: ErrorCode, message: impl Into<String>) {
    let message = message.into();
    let cb = CALLBACK.lock().clone();
    match cb {
        Some(cb) => cb(code, &message),
        None => default_handler(code, &message),
    }
}

fn default_handler(code: ErrorCode, message: &str) {
    let now = Utc::now().to_rfc3339();
    if verbosity() >= Verbosity::Detailed {
        eprintln!("[locksmith {now}] {code}: {message}");
    } else {
        eprintln!("[locksmith] {code}: {message}");
    }
}

fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        n if n == Verbosity::Detailed as u8 => Verbosity::Detailed,
        _ => Verbosity::Quiet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn callback_receives_reports_synchronously_on_the_calling_thread() {
        let (tx, rx) = mpsc::channel();
        let caller = std::thread::current().id();
        set_error_callback(move |code, message| {
            assert_eq!(std::thread::current().id(), caller);
            let _ = tx.send((code, message.to_string()));
        });

        report(ErrorCode::Deadlk, "test violation");

        // The callback already ran by the time `report` returned above, so
        // this is a sanity check on content, not a wait for async delivery.
        let (code, message) = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("callback should fire");
        assert_eq!(code, ErrorCode::Deadlk);
        assert_eq!(message, "test violation");
    }
}
