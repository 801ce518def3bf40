//! Lock-order graph: a directed graph over live [`LockId`]s recording
//! observed acquisition orderings.
//!
//! An edge `A -> B` means some thread held `A` and then acquired `B`. The
//! graph never removes an edge once recorded (an ordering observed once is
//! a constraint; see `spec.md` §4.4) — edges disappear only when one of
//! their endpoints is destroyed, via [`LockOrderGraph::remove_vertex`].

use crate::types::LockId;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Adjacency for the lock-order graph. Stores only the successor
/// direction; predecessor sets live on the [`crate::registry::LockRecord`]
/// each vertex belongs to (the canonical data per `spec.md` §3), so this
/// type never owns lock metadata, only edges.
#[derive(Debug, Default)]
pub struct LockOrderGraph {
    successors: FxHashMap<LockId, FxHashSet<LockId>>,
}

impl LockOrderGraph {
    pub fn new() -> Self {
        LockOrderGraph {
            successors: FxHashMap::default(),
        }
    }

    /// Check whether adding edges `h -> new` for every `h` in `held` would
    /// close a cycle, without mutating the graph.
    ///
    /// Adding `h -> new` closes a cycle iff a path `new -> ... -> h`
    /// already exists. Returns the first such cycle found, scanning `held`
    /// in acquisition order so the reported cycle corresponds to the
    /// earliest-acquired conflicting lock.
    pub fn would_add_cycle(&self, new: LockId, held: &[LockId]) -> Option<Vec<LockId>> {
        for &h in held {
            if h == new {
                continue; // self-edges are handled by the caller as re-entrancy, not here
            }
            if let Some(mut path) = self.find_path(new, h) {
                path.push(new); // close the cycle: new -> ... -> h -> new
                return Some(path);
            }
        }
        None
    }

    /// Record edges `h -> new` for every `h` in `held`. Caller must have
    /// already confirmed via [`would_add_cycle`] that none of these close a
    /// cycle; this method does not re-check.
    ///
    /// `records` supplies the mutable predecessor set on each [`LockId`]'s
    /// lock record so the two views of the graph (successor sets here,
    /// predecessor sets on the record) stay in sync.
    pub fn add_edges<F>(&mut self, new: LockId, held: &[LockId], mut add_predecessor: F)
    where
        F: FnMut(LockId, LockId),
    {
        for &h in held {
            if h == new {
                continue;
            }
            if self.successors.entry(h).or_default().insert(new) {
                add_predecessor(new, h);
            }
        }
        self.successors.entry(new).or_default();
    }

    /// Remove every edge touching `lock_id`, ahead of forgetting its
    /// record. `predecessors` is the record's own predecessor set (so we
    /// can clear the reverse edges in the successor maps without scanning
    /// every vertex).
    pub fn remove_vertex(&mut self, lock_id: LockId, predecessors: &FxHashSet<LockId>) {
        for &p in predecessors {
            if let Some(succs) = self.successors.get_mut(&p) {
                succs.remove(&lock_id);
            }
        }
        // `lock_id`'s own successor set can simply be dropped: the locks it
        // pointed to keep `lock_id` in their predecessor set on the record
        // side, which the registry clears itself (it reads this vertex's
        // successors before calling this method, since that set disappears
        // here).
        self.successors.remove(&lock_id);
    }

    /// BFS for a path from `start` to `end` following successor edges.
    fn find_path(&self, start: LockId, end: LockId) -> Option<Vec<LockId>> {
        if start == end {
            return Some(vec![start]);
        }
        if !self.successors.contains_key(&start) {
            return None;
        }

        let mut queue = VecDeque::new();
        let mut parent: FxHashMap<LockId, LockId> = FxHashMap::default();
        let mut visited = FxHashSet::default();

        queue.push_back(start);
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = self.successors.get(&current) else {
                continue;
            };
            for &next in neighbors {
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, current);
                if next == end {
                    let mut path = vec![end];
                    let mut node = end;
                    while let Some(&prev) = parent.get(&node) {
                        path.push(prev);
                        node = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Direct successors of `lock_id`, for destroy-time bookkeeping that
    /// must clear the reverse predecessor entry on each of them.
    pub fn successors_of(&self, lock_id: LockId) -> impl Iterator<Item = LockId> + '_ {
        self.successors
            .get(&lock_id)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> LockId {
        LockId::from_raw(n)
    }

    fn link(graph: &mut LockOrderGraph, preds: &mut FxHashMap<LockId, FxHashSet<LockId>>, new: LockId, held: &[LockId]) {
        graph.add_edges(new, held, |n, h| {
            preds.entry(n).or_default().insert(h);
        });
    }

    #[test]
    fn no_cycle_on_linear_chain() {
        let mut graph = LockOrderGraph::new();
        let mut preds = FxHashMap::default();

        assert!(graph.would_add_cycle(id(2), &[id(1)]).is_none());
        link(&mut graph, &mut preds, id(2), &[id(1)]);

        assert!(graph.would_add_cycle(id(3), &[id(2)]).is_none());
        link(&mut graph, &mut preds, id(3), &[id(2)]);

        // 1 -> 3 directly is redundant but not a cycle.
        assert!(graph.would_add_cycle(id(3), &[id(1)]).is_none());
    }

    #[test]
    fn detects_direct_ab_ba_cycle() {
        let mut graph = LockOrderGraph::new();
        let mut preds = FxHashMap::default();

        assert!(graph.would_add_cycle(id(2), &[id(1)]).is_none());
        link(&mut graph, &mut preds, id(2), &[id(1)]);

        let cycle = graph.would_add_cycle(id(1), &[id(2)]);
        assert!(cycle.is_some());
        let cycle = cycle.unwrap();
        assert!(cycle.contains(&id(1)));
        assert!(cycle.contains(&id(2)));
    }

    #[test]
    fn detects_long_cycle() {
        let mut graph = LockOrderGraph::new();
        let mut preds = FxHashMap::default();

        link(&mut graph, &mut preds, id(2), &[id(1)]); // 1 -> 2
        link(&mut graph, &mut preds, id(3), &[id(2)]); // 2 -> 3

        // 3 -> 1 would close the cycle 1 -> 2 -> 3 -> 1
        let cycle = graph.would_add_cycle(id(1), &[id(3)]);
        assert!(cycle.is_some());
    }

    #[test]
    fn remove_vertex_forgets_history() {
        let mut graph = LockOrderGraph::new();
        let mut preds: FxHashMap<LockId, FxHashSet<LockId>> = FxHashMap::default();

        link(&mut graph, &mut preds, id(2), &[id(1)]); // 1 -> 2
        let lock2_preds = preds.get(&id(2)).cloned().unwrap_or_default();
        graph.remove_vertex(id(2), &lock2_preds);
        preds.remove(&id(2));

        // Re-adding 1 -> 2 after 2 was destroyed must not see stale history.
        assert!(graph.would_add_cycle(id(2), &[id(1)]).is_none());
    }
}
