//! Held-set tracker (`spec.md` §4.2): a thread-local, acquisition-ordered
//! list of the locks the current thread holds. Only the owning thread ever
//! touches its own list, so no lock is needed here — the registry lock
//! guards the shared graph, not this.

use crate::types::LockId;
use std::cell::RefCell;

#[derive(Debug, Default)]
struct ThreadHeld {
    held: Vec<LockId>,
}

impl ThreadHeld {
    fn push(&mut self, id: LockId) -> Result<(), &'static str> {
        if self.held.contains(&id) {
            return Err("already held");
        }
        self.held.push(id);
        Ok(())
    }

    fn remove(&mut self, id: LockId) -> Result<(), &'static str> {
        let Some(pos) = self.held.iter().position(|&h| h == id) else {
            return Err("not held");
        };
        self.held.remove(pos);
        Ok(())
    }
}

thread_local! {
    static HELD: RefCell<ThreadHeld> = RefCell::new(ThreadHeld::default());
}

/// Appends `id` to the current thread's held set. Errors if already held
/// (recursive holding is disallowed by policy, `spec.md` T1).
pub fn push(id: LockId) -> Result<(), &'static str> {
    HELD.with(|h| h.borrow_mut().push(id))
}

/// Removes `id` from the current thread's held set.
pub fn remove(id: LockId) -> Result<(), &'static str> {
    HELD.with(|h| h.borrow_mut().remove(id))
}

/// Returns whether the current thread currently holds `id`.
pub fn contains(id: LockId) -> bool {
    HELD.with(|h| h.borrow().held.contains(&id))
}

/// A copy of the current thread's held set, in acquisition order, so the
/// caller can release the thread-local borrow before taking the registry
/// lock to update the graph (`spec.md` §4.2).
pub fn snapshot() -> Vec<LockId> {
    HELD.with(|h| h.borrow().held.clone())
}
