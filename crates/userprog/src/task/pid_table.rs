//! TEAM_450: Pid Translation Table - pid handed out by exec() to child tid.

use los_utils::HashMap;

use super::{Pid, Tid};

/// TEAM_450: Per-process pid to tid map. The map is created on first insert.
#[derive(Debug, Default)]
pub struct PidTable {
    map: Option<HashMap<Pid, Tid>>,
}

impl PidTable {
    pub const fn new() -> Self {
        Self { map: None }
    }

    pub fn insert(&mut self, pid: Pid, tid: Tid) {
        if let Some(old) = self.map.get_or_insert_with(HashMap::new).insert(pid, tid) {
            log::warn!("[PROCESS] pid {} remapped from tid {} to tid {}", pid, old, tid);
        }
    }

    pub fn lookup(&self, pid: Pid) -> Option<Tid> {
        self.map.as_ref()?.get(&pid).copied()
    }

    /// Forget `pid`. Afterwards it resolves exactly like a pid that was never mapped.
    pub fn remove(&mut self, pid: Pid) -> Option<Tid> {
        self.map.as_mut()?.remove(&pid)
    }

    /// Drop every remaining mapping.
    pub fn destroy(&mut self) {
        self.map = None;
    }

    pub fn len(&self) -> usize {
        self.map.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
