//! TEAM_450: Child-Set Tracker.
//!
//! The tids a process spawned and must reap. Membership validates a wait()
//! target, and at exit every tracked child's registry record is released.

use los_utils::{HashSet, RelaxStrategy};

use super::process_registry::{ProcessError, ProcessRegistry};
use super::Tid;

/// TEAM_450: Set of child tids owned by one process. The set is created on first use.
#[derive(Debug, Default)]
pub struct ChildSet {
    tids: Option<HashSet<Tid>>,
}

impl ChildSet {
    pub const fn new() -> Self {
        Self { tids: None }
    }

    pub fn track(&mut self, tid: Tid) {
        if !self.tids.get_or_insert_with(HashSet::new).insert(tid) {
            log::warn!("[PROCESS] child tid {} tracked twice", tid);
        }
    }

    pub fn is_tracked(&self, tid: Tid) -> bool {
        self.tids.as_ref().is_some_and(|set| set.contains(&tid))
    }

    /// Release the registry record of every tracked child and discard the set.
    ///
    /// Returns how many records were released. Children whose record is already
    /// gone are skipped.
    pub fn release_all<R: RelaxStrategy>(&mut self, registry: &ProcessRegistry<R>) -> usize {
        let Some(tids) = self.tids.take() else {
            return 0;
        };
        let mut released = 0;
        for tid in tids {
            match registry.release(tid) {
                Ok(()) => released += 1,
                Err(ProcessError::NotRegistered) => {
                    log::debug!("[PROCESS] child tid {} had no record to release", tid);
                }
                Err(e) => log::warn!("[PROCESS] releasing child tid {}: {}", tid, e),
            }
        }
        released
    }

    pub fn len(&self) -> usize {
        self.tids.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
