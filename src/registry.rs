//! Name registry (`spec.md` §4.1) and the lock record store it interns
//! into. Everything here is serialized by one `parking_lot::Mutex`
//! ("the registry lock" in `spec.md` §4.3/§5): hash lookups, predecessor-set
//! inserts, and lock-order-graph cycle checks are all bounded,
//! pointer-light work, never held while user code — including the error
//! callback — runs.

use crate::graph::LockOrderGraph;
use crate::types::{LockAddress, LockId, LockStatus, ThreadId};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A live lock instance (`spec.md` §3). Owned by the [`Registry`], keyed by
/// [`LockId`]; looked up by address through `Registry`'s `by_address` map.
#[derive(Debug, Clone)]
pub struct LockRecord {
    pub id: LockId,
    pub address: LockAddress,
    pub name: String,
    pub is_sleepable: bool,
    /// `p ∈ predecessors` means some thread held `p` and then acquired this
    /// lock, at some point in the process's lifetime.
    pub predecessors: FxHashSet<LockId>,
    /// Thread currently holding this lock, if any. Mutual exclusion itself
    /// is guaranteed by the underlying primitive (`spec.md` T2); this field
    /// is the core's own mirror of that fact, needed to answer "is anyone
    /// holding this lock" at destroy time without polling every thread.
    pub held_by: Option<ThreadId>,
}

struct Inner {
    by_address: FxHashMap<LockAddress, LockId>,
    records: FxHashMap<LockId, LockRecord>,
    graph: LockOrderGraph,
}

pub struct Registry {
    inner: Mutex<Inner>,
    next_id: AtomicUsize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: Mutex::new(Inner {
                by_address: FxHashMap::default(),
                records: FxHashMap::default(),
                graph: LockOrderGraph::new(),
            }),
            next_id: AtomicUsize::new(1),
        }
    }

    /// `intern` (`spec.md` §4.1): idempotent per live record. Returns the
    /// existing id if `address` is already live; a freshly-counted one
    /// otherwise.
    pub fn intern(
        &self,
        address: LockAddress,
        suggested_name: Option<&str>,
        is_sleepable: bool,
    ) -> (LockId, bool) {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.by_address.get(&address) {
            return (id, false);
        }
        let id = LockId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = suggested_name
            .map(str::to_owned)
            .unwrap_or_else(|| address.to_string());
        inner.by_address.insert(address, id);
        inner.records.insert(
            id,
            LockRecord {
                id,
                address,
                name,
                is_sleepable,
                predecessors: FxHashSet::default(),
                held_by: None,
            },
        );
        (id, true)
    }

    pub fn lookup(&self, address: LockAddress) -> Option<LockId> {
        self.inner.lock().by_address.get(&address).copied()
    }

    /// `forget` (`spec.md` §4.1). Caller (the interception core's
    /// `destroy`) must already have verified the lock is unheld.
    fn forget_locked(inner: &mut Inner, id: LockId) {
        let Some(record) = inner.records.remove(&id) else {
            return;
        };
        inner.by_address.remove(&record.address);
        // Locks for which `id` was a predecessor still carry it in their
        // own record; since history should be forgotten along with the
        // vertex, drop those back-references too. Must be read before
        // `remove_vertex` drops `id`'s successor-set entry.
        let successors: Vec<LockId> = inner.graph.successors_of(id).collect();
        inner.graph.remove_vertex(id, &record.predecessors);
        for succ in successors {
            if let Some(succ_record) = inner.records.get_mut(&succ) {
                succ_record.predecessors.remove(&id);
            }
        }
    }

    /// Check whether acquiring `new` while `held` is already held would
    /// close a cycle; if not, record the edges. Single lock acquisition so
    /// the check and the insert are atomic (`spec.md` §4.3 rationale).
    pub fn check_and_link(&self, new: LockId, held: &[LockId]) -> Option<Vec<LockId>> {
        let mut inner = self.inner.lock();
        if let Some(cycle) = inner.graph.would_add_cycle(new, held) {
            return Some(cycle);
        }
        let Inner {
            graph, records, ..
        } = &mut *inner;
        graph.add_edges(new, held, |n, h| {
            if let Some(record) = records.get_mut(&n) {
                record.predecessors.insert(h);
            }
        });
        None
    }

    pub fn mark_held(&self, id: LockId, thread: ThreadId) {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.records.get_mut(&id) {
            record.held_by = Some(thread);
        }
    }

    pub fn clear_held(&self, id: LockId, thread: ThreadId) {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.records.get_mut(&id) {
            if record.held_by == Some(thread) {
                record.held_by = None;
            }
        }
    }

    pub fn held_by(&self, id: LockId) -> Option<ThreadId> {
        self.inner.lock().records.get(&id).and_then(|r| r.held_by)
    }

    /// `destroy` (`spec.md` §4.4): removes the vertex and forgets the
    /// record, but only if unheld. Returns `NotFound`/`Busy`/`Ok` to let the
    /// caller decide on reporting — the registry itself never reports.
    pub fn destroy(&self, address: LockAddress) -> LockStatus {
        let mut inner = self.inner.lock();
        let Some(&id) = inner.by_address.get(&address) else {
            return LockStatus::NotFound;
        };
        if inner.records.get(&id).and_then(|r| r.held_by).is_some() {
            return LockStatus::Busy;
        }
        Self::forget_locked(&mut inner, id);
        LockStatus::Ok
    }

    pub fn name_of(&self, id: LockId) -> Option<String> {
        self.inner.lock().records.get(&id).map(|r| r.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::current_thread_id;

    #[test]
    fn intern_is_idempotent_for_a_live_address() {
        let registry = Registry::new();
        let addr = LockAddress(0x1000);
        let (first, created) = registry.intern(addr, Some("a"), true);
        assert!(created);
        let (second, created_again) = registry.intern(addr, Some("a"), true);
        assert_eq!(first, second);
        assert!(!created_again);
    }

    #[test]
    fn destroy_assigns_a_fresh_id_and_forgets_edges() {
        let registry = Registry::new();
        let a = LockAddress(0x2000);
        let m = LockAddress(0x2008);

        let (id_a, _) = registry.intern(a, Some("a"), true);
        let (id_m, _) = registry.intern(m, Some("m"), true);
        assert!(registry.check_and_link(id_m, &[id_a]).is_none());

        assert_eq!(registry.destroy(a), LockStatus::Ok);

        let (id_a2, _) = registry.intern(a, Some("a2"), true);
        assert_ne!(id_a, id_a2);
        // The old a -> m edge must be gone; acquiring m then the new a
        // must not falsely report a cycle.
        assert!(registry.check_and_link(id_a2, &[id_m]).is_none());
    }

    #[test]
    fn destroy_refuses_a_held_lock() {
        let registry = Registry::new();
        let addr = LockAddress(0x3000);
        let (id, _) = registry.intern(addr, Some("a"), true);
        let thread = current_thread_id();
        registry.mark_held(id, thread);

        assert_eq!(registry.destroy(addr), LockStatus::Busy);

        registry.clear_held(id, thread);
        assert_eq!(registry.destroy(addr), LockStatus::Ok);
    }
}
