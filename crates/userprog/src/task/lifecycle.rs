//! TEAM_450: Thread creation, load completion and exit teardown.

use alloc::format;

use los_utils::RelaxStrategy;

use super::{Pid, Process, Tid, PID_ERROR};
use crate::kernel::Kernel;
use crate::task::process_registry::ProcessError;

impl<R: RelaxStrategy> Kernel<R> {
    /// TEAM_450: Register the registry record of a newly created thread.
    ///
    /// Must run before the thread can be named by any other call.
    pub fn thread_created(&self, tid: Tid) {
        self.registry.register(tid);
    }

    /// TEAM_450: Report the outcome of `tid`'s program load and wake its parent.
    ///
    /// A successful load gets a fresh pid; a failed one reports [`PID_ERROR`].
    /// Returns the pid the thread now carries.
    pub fn load_finished(&self, tid: Tid, loaded: bool) -> Pid {
        let pid = if loaded { self.allocate_pid() } else { PID_ERROR };
        if let Err(e) = self.registry.report_load(tid, pid) {
            log::warn!("[PROCESS] load of tid {} reported without a record: {}", tid, e);
        }
        pid
    }

    /// TEAM_450: Tear down `process` as its thread exits.
    ///
    /// Prints the exit line, wakes a waiting parent, releases the records of
    /// all children, drops the pid map and closes every open file under one
    /// acquisition of the filesystem lock.
    pub fn process_exit(&self, mut process: Process) {
        let line = format!("{}: exit({})\n", process.name, process.exit_status);
        self.console.putbuf(line.as_bytes());

        match self.registry.signal_exit(process.tid) {
            Ok(()) => {}
            Err(ProcessError::NotRegistered) => {
                log::debug!("[PROCESS] tid {} exiting after its record was released", process.tid);
            }
            Err(e) => log::warn!("[PROCESS] signal_exit for tid {}: {}", process.tid, e),
        }

        let released = process.children.release_all(&self.registry);
        process.pids.destroy();
        let closed = process.files.destroy_all(&self.filesys);
        log::debug!(
            "[PROCESS] tid {} torn down: {} child records released, {} files closed",
            process.tid,
            released,
            closed
        );
    }

    /// TEAM_450: Free every registry record left at power-off.
    pub fn shutdown(&self) {
        let remaining = self.registry.clear();
        log::debug!("[PROCESS] shutdown freed {} registry records", remaining);
    }
}
