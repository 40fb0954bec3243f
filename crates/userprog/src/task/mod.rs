//! TEAM_450: Per-process state and the cross-process registry.
//!
//! Only [`process_registry::ProcessRegistry`] is shared between threads. The
//! three tables held by [`Process`] belong to the thread running that process
//! and are never locked.

pub mod child_set;
pub mod fd_table;
mod lifecycle;
pub mod pid_table;
pub mod process_registry;

use alloc::boxed::Box;
use alloc::string::String;

use crate::memory::user::AddressSpace;
use child_set::ChildSet;
use fd_table::FdTable;
use pid_table::PidTable;

/// TEAM_450: Internal thread identifier.
pub type Tid = i32;

/// TEAM_450: Process identifier handed to user space by exec().
pub type Pid = i32;

/// Returned by [`ProcessControl::spawn`] when no thread could be created.
pub const TID_ERROR: Tid = -1;

/// Pid of a child that failed to load.
pub const PID_ERROR: Pid = -1;

/// Exit status meaning "not yet available, or already consumed".
pub const EXIT_STATUS_NONE: i32 = -1;

/// TEAM_450: Thread lifecycle collaborator.
///
/// `spawn` must call [`crate::Kernel::thread_created`] for the new tid before
/// the child runs, and the child must call [`crate::Kernel::load_finished`]
/// exactly once when its load attempt completes.
pub trait ProcessControl: Send + Sync {
    /// Start a thread that will load and run `cmdline`. Returns [`TID_ERROR`] on failure.
    fn spawn(&self, cmdline: &str) -> Tid;

    /// Turn the machine off. Does not return on real hardware.
    fn power_off(&self);
}

/// TEAM_450: State owned by one user process.
pub struct Process {
    pub(crate) tid: Tid,
    pub(crate) pid: Pid,
    pub(crate) name: String,
    pub(crate) address_space: Box<dyn AddressSpace + Send>,
    pub(crate) children: ChildSet,
    pub(crate) pids: PidTable,
    pub(crate) files: FdTable,
    pub(crate) exit_status: i32,
}

impl Process {
    /// Build the process for thread `tid` running `cmdline`.
    ///
    /// The process name is the first whitespace-separated token of the command line.
    pub fn new(tid: Tid, cmdline: &str, address_space: Box<dyn AddressSpace + Send>) -> Self {
        let name = cmdline.split_whitespace().next().unwrap_or_default();
        Self {
            tid,
            pid: PID_ERROR,
            name: String::from(name),
            address_space,
            children: ChildSet::new(),
            pids: PidTable::new(),
            files: FdTable::new(),
            exit_status: EXIT_STATUS_NONE,
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// Pid assigned at load, or [`PID_ERROR`] before then.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn set_pid(&mut self, pid: Pid) {
        self.pid = pid;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address_space(&self) -> &dyn AddressSpace {
        &*self.address_space
    }

    pub fn children(&self) -> &ChildSet {
        &self.children
    }

    pub fn pids(&self) -> &PidTable {
        &self.pids
    }

    pub fn files(&self) -> &FdTable {
        &self.files
    }

    /// Status recorded by the last exit() call, or [`EXIT_STATUS_NONE`].
    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("tid", &self.tid)
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("pids", &self.pids.len())
            .field("files", &self.files.len())
            .field("exit_status", &self.exit_status)
            .finish_non_exhaustive()
    }
}
