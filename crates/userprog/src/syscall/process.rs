//! TEAM_450: Process syscalls - halt, exit, exec, wait.

use los_utils::RelaxStrategy;

use super::{Disposition, SyscallError, SyscallResult};
use crate::kernel::Kernel;
use crate::memory::user::read_user_cstring;
use crate::task::process_registry::ProcessError;
use crate::task::{Pid, Process, PID_ERROR, TID_ERROR};

impl<R: RelaxStrategy> Kernel<R> {
    /// TEAM_450: halt() - power the machine off.
    pub(super) fn sys_halt(&self) -> Disposition {
        log::info!("[SYSCALL] halt requested");
        self.control.power_off();
        Disposition::PowerOff
    }

    /// TEAM_450: exit(status) - record the status for the parent and end the process.
    pub(super) fn sys_exit(&self, process: &mut Process, status: i32) -> Disposition {
        if let Err(e) = self.registry.set_exit_status(process.tid, status) {
            log::debug!("[SYSCALL] exit status of tid {} not recorded: {}", process.tid, e);
        }
        process.exit_status = status;
        Disposition::Exit(status)
    }

    /// TEAM_450: exec(cmdline) - spawn a child and block until its load completes.
    ///
    /// The child is tracked before blocking, so its record is released at
    /// our exit even if the load fails.
    pub(super) fn sys_exec(&self, process: &mut Process, cmdline: usize) -> SyscallResult {
        let cmdline = read_user_cstring(&*process.address_space, cmdline)?;

        let tid = self.control.spawn(&cmdline);
        if tid == TID_ERROR {
            log::debug!("[PROCESS] spawn of {:?} failed", cmdline);
            return Err(ProcessError::SpawnFailed.into());
        }
        process.children.track(tid);

        let pid = self.registry.await_pid(tid)?;
        if pid == PID_ERROR {
            log::debug!("[PROCESS] child tid {} failed to load {:?}", tid, cmdline);
            return Err(SyscallError::LoadFailure);
        }

        process.pids.insert(pid, tid);
        log::debug!("[PROCESS] tid {} exec'd pid {} (tid {})", process.tid, pid, tid);
        Ok(Disposition::Return(pid))
    }

    /// TEAM_450: wait(pid) - block until a child exits and take its status.
    pub(super) fn sys_wait(&self, process: &mut Process, pid: Pid) -> SyscallResult {
        let tid = process
            .pids
            .lookup(pid)
            .ok_or(SyscallError::ResourceNotFound)?;
        if !process.children.is_tracked(tid) {
            return Err(SyscallError::ResourceNotFound);
        }

        let status = self.registry.await_exit(tid)?;
        process.pids.remove(pid);
        Ok(Disposition::Return(status))
    }
}
