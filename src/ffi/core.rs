//! C ABI entry points for process-wide setup (`spec.md` §7): installing the
//! error callback and tuning the default formatter's verbosity. Grounded on
//! the teacher's `ffi/core.rs` (`deloxide_init`) and on `handler.c`'s
//! `lksmith_set_error_cb`.

use crate::reporter;
use crate::types::{ErrorCode, Verbosity};
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Signature of the C error callback: an error code, a NUL-terminated
/// message owned by the core for the duration of the call, and an opaque
/// user pointer threaded through unchanged.
pub type LocksmithErrorCallback =
    unsafe extern "C" fn(code: c_int, message: *const c_char, user_data: *mut c_void);

struct UserData(*mut c_void);
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

/// Idempotent process-wide initialization. Safe to call more than once;
/// only the first call has any effect, mirroring `lksmith_optional_init`.
#[unsafe(no_mangle)]
pub extern "C" fn locksmith_init() {
    INITIALIZED.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn locksmith_is_initialized() -> c_int {
    INITIALIZED.load(Ordering::SeqCst) as c_int
}

/// Installs a C callback as the process-wide error handler. Passing a
/// null `callback` restores the default stderr formatter.
///
/// # Safety
/// `callback`, if non-null, must be a valid function pointer with the
/// [`LocksmithErrorCallback`] signature, callable from any thread at any
/// later point in the process's lifetime. `user_data` must remain valid
/// for as long as the callback might fire.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn locksmith_set_error_callback(
    callback: Option<LocksmithErrorCallback>,
    user_data: *mut c_void,
) {
    let Some(callback) = callback else {
        reporter::set_error_callback(|code, message| {
            eprintln!("[locksmith] {code}: {message}");
        });
        return;
    };
    let user_data = UserData(user_data);
    reporter::set_error_callback(move |code, message| {
        let c_message = match std::ffi::CString::new(message) {
            Ok(s) => s,
            Err(_) => return,
        };
        unsafe { callback(error_code_to_c(code), c_message.as_ptr(), user_data.0) };
    });
}

/// `0` = quiet, `1` = detailed. Unrecognized values are ignored.
#[unsafe(no_mangle)]
pub extern "C" fn locksmith_set_verbosity(level: c_int) {
    match level {
        0 => reporter::set_verbosity(Verbosity::Quiet),
        1 => reporter::set_verbosity(Verbosity::Detailed),
        _ => {}
    }
}

fn error_code_to_c(code: ErrorCode) -> c_int {
    match code {
        ErrorCode::Deadlk => 1,
        ErrorCode::Busy => 2,
        ErrorCode::Perm => 3,
        ErrorCode::Inval => 4,
        ErrorCode::AlreadyInitialized => 5,
    }
}

/// Helper for shims that need to turn a C string name into an `Option<&str>`
/// without panicking on non-UTF8 input.
pub(crate) unsafe fn name_from_c(name: *const c_char) -> Option<String> {
    if name.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(name) }.to_str().ok().map(str::to_owned)
}
