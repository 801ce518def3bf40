//! Foreign Function Interface for driving Locksmith from C and C++,
//! modeled on `lksmith`'s `handler.c` shim layer: every exported function
//! composes the interception core's hooks around a real lock primitive,
//! never the other way around.
//!
//! All functions are `unsafe extern "C"` because the compiler cannot check
//! the pointer-validity and single-ownership contracts FFI callers must
//! uphold; each function's doc comment states exactly what those are.

pub mod core;
pub mod mutex;
pub mod spin;

use crate::types::LockStatus;
use std::os::raw::c_int;

/// Maps a [`LockStatus`] to the integer codes the C ABI returns. `0` always
/// means success, mirroring the POSIX `pthread_*` convention the original
/// `lksmith` shims follow.
pub(crate) fn status_to_c(status: LockStatus) -> c_int {
    match status {
        LockStatus::Ok => 0,
        LockStatus::WouldDeadlock => libc_like::EDEADLK,
        LockStatus::Busy => libc_like::EBUSY,
        LockStatus::Perm => libc_like::EPERM,
        LockStatus::NotFound => libc_like::ENOENT,
        LockStatus::AlreadyInitialized => libc_like::EALREADY,
        LockStatus::Inval => libc_like::EINVAL,
    }
}

/// The handful of `errno.h` values this ABI surfaces, spelled out locally
/// so the crate does not need to depend on `libc` just for five constants.
mod libc_like {
    use std::os::raw::c_int;
    pub const EPERM: c_int = 1;
    pub const EBUSY: c_int = 16;
    pub const EINVAL: c_int = 22;
    pub const EDEADLK: c_int = 35;
    pub const EALREADY: c_int = 114;
    pub const ENOENT: c_int = 2;
}
