//! TEAM_450: Syscall gateway for user programs.
//!
//! Entry ABI: the syscall number is the 32-bit word at the caller's stack
//! pointer, arguments are the words at `esp + 4`, `esp + 8` and `esp + 12`,
//! and the result goes back in `eax`. Every byte of every word is validated
//! before it is read.
//!
//! Handlers return a [`SyscallResult`]. Only [`Kernel::syscall`] decides
//! whether a failure becomes `-1`, is dropped, or kills the caller.

mod fs;
mod helpers;
mod process;

pub use helpers::SyscallArgs;

use los_error::define_kernel_error;
use los_utils::RelaxStrategy;

use crate::kernel::Kernel;
use crate::memory::user::MemoryError;
use crate::task::process_registry::ProcessError;
use crate::task::{Process, EXIT_STATUS_NONE};

/// Level used for per-call tracing.
const TRACE_LEVEL: log::Level = if cfg!(feature = "verbose-syscalls") {
    log::Level::Info
} else {
    log::Level::Trace
};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallNumber {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Wait = 3,
    Create = 4,
    Remove = 5,
    Open = 6,
    Filesize = 7,
    Read = 8,
    Write = 9,
    Seek = 10,
    Tell = 11,
    Close = 12,
}

/// TEAM_450: What a handler failure turns into for one syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Deliver -1 in `eax`.
    ReturnError,
    /// Kill the caller.
    Terminate,
    /// Return normally, `eax` untouched.
    Ignore,
}

impl SyscallNumber {
    pub fn from_u32(n: u32) -> Option<Self> {
        match n {
            0 => Some(Self::Halt),
            1 => Some(Self::Exit),
            2 => Some(Self::Exec),
            3 => Some(Self::Wait),
            4 => Some(Self::Create),
            5 => Some(Self::Remove),
            6 => Some(Self::Open),
            7 => Some(Self::Filesize),
            8 => Some(Self::Read),
            9 => Some(Self::Write),
            10 => Some(Self::Seek),
            11 => Some(Self::Tell),
            12 => Some(Self::Close),
            _ => None,
        }
    }

    /// Policy for a logical failure (missing resource, failed load, double wait).
    ///
    /// Bad user memory always terminates regardless of this value.
    pub const fn failure_policy(self) -> FailurePolicy {
        match self {
            Self::Exec | Self::Wait | Self::Open | Self::Read | Self::Write => {
                FailurePolicy::ReturnError
            }
            Self::Filesize | Self::Seek | Self::Tell => FailurePolicy::Terminate,
            Self::Halt | Self::Exit | Self::Create | Self::Remove | Self::Close => {
                FailurePolicy::Ignore
            }
        }
    }
}

define_kernel_error! {
    /// TEAM_450: Failures a syscall handler can report.
    pub enum SyscallError(0x05) {
        /// A user address or range failed validation
        InvalidMemoryAccess(MemoryError) = 0x01 => "Invalid user memory access",
        /// Unknown fd, or pid that is not a live child
        ResourceNotFound = 0x02 => "Resource not found",
        /// Child could not be loaded
        LoadFailure = 0x03 => "Child load failed",
        /// Exit status already taken
        DoubleConsumption = 0x04 => "Exit status already consumed",
        /// No handler for the syscall number
        UnknownSyscall = 0x05 => "Unknown syscall number",
    }
}

impl From<MemoryError> for SyscallError {
    fn from(e: MemoryError) -> Self {
        Self::InvalidMemoryAccess(e)
    }
}

impl From<ProcessError> for SyscallError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::NotRegistered => Self::ResourceNotFound,
            ProcessError::AlreadyConsumed => Self::DoubleConsumption,
            ProcessError::SpawnFailed => Self::LoadFailure,
        }
    }
}

/// TEAM_450: Successful handler result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Store the value in `eax` and resume the caller.
    Return(i32),
    /// Resume the caller with `eax` untouched.
    NoValue,
    /// exit() with this status.
    Exit(i32),
    /// halt().
    PowerOff,
}

pub type SyscallResult = Result<Disposition, SyscallError>;

/// TEAM_450: The part of the trapped register frame the gateway reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallFrame {
    /// User stack pointer at the trap.
    pub esp: usize,
    /// Return value register.
    pub eax: u32,
}

impl SyscallFrame {
    pub const fn new(esp: usize) -> Self {
        Self { esp, eax: 0 }
    }

    pub fn set_return(&mut self, value: i32) {
        self.eax = value as u32;
    }

    pub fn return_value(&self) -> i32 {
        self.eax as i32
    }
}

/// TEAM_450: What the trap glue must do after a syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Return to user mode, `eax` holds the result if there is one.
    Continue,
    /// Kill the caller; the glue follows with [`Kernel::process_exit`].
    Terminate { status: i32 },
    /// halt() was called.
    PowerOff,
}

impl<R: RelaxStrategy> Kernel<R> {
    /// TEAM_450: Validate, dispatch and resolve one syscall from `process`.
    pub fn syscall(&self, process: &mut Process, frame: &mut SyscallFrame) -> SyscallOutcome {
        let nr = match SyscallArgs::new(process.address_space(), frame.esp).number() {
            Ok(nr) => nr,
            Err(e) => {
                log::warn!(
                    "[SYSCALL] tid {} bad stack pointer {:#x}: {}",
                    process.tid(),
                    frame.esp,
                    e
                );
                return Self::kill(process);
            }
        };

        let Some(number) = SyscallNumber::from_u32(nr) else {
            log::warn!(
                "[SYSCALL] tid {}: {} ({})",
                process.tid(),
                SyscallError::UnknownSyscall,
                nr
            );
            return Self::kill(process);
        };

        log::log!(TRACE_LEVEL, "[SYSCALL] tid {} {:?}", process.tid(), number);

        match self.dispatch(number, process, frame.esp) {
            Ok(Disposition::Return(value)) => {
                frame.set_return(value);
                SyscallOutcome::Continue
            }
            Ok(Disposition::NoValue) => SyscallOutcome::Continue,
            Ok(Disposition::Exit(status)) => {
                frame.set_return(status);
                SyscallOutcome::Terminate { status }
            }
            Ok(Disposition::PowerOff) => SyscallOutcome::PowerOff,
            Err(e) => Self::resolve_failure(number, e, process, frame),
        }
    }

    fn dispatch(&self, number: SyscallNumber, process: &mut Process, esp: usize) -> SyscallResult {
        let args = SyscallArgs::new(process.address_space(), esp);
        match number {
            SyscallNumber::Halt => Ok(self.sys_halt()),
            SyscallNumber::Exit => {
                let status = args.int(1)?;
                Ok(self.sys_exit(process, status))
            }
            SyscallNumber::Exec => {
                let cmdline = args.pointer(1)?;
                self.sys_exec(process, cmdline)
            }
            SyscallNumber::Wait => {
                let pid = args.int(1)?;
                self.sys_wait(process, pid)
            }
            SyscallNumber::Create => {
                let (name, size) = (args.pointer(1)?, args.uint(2)?);
                self.sys_create(process, name, size)
            }
            SyscallNumber::Remove => {
                let name = args.pointer(1)?;
                self.sys_remove(process, name)
            }
            SyscallNumber::Open => {
                let name = args.pointer(1)?;
                self.sys_open(process, name)
            }
            SyscallNumber::Filesize => {
                let fd = args.int(1)?;
                self.sys_filesize(process, fd)
            }
            SyscallNumber::Read => {
                let (fd, buf, len) = (args.int(1)?, args.pointer(2)?, args.uint(3)?);
                self.sys_read(process, fd, buf, len)
            }
            SyscallNumber::Write => {
                let (fd, buf, len) = (args.int(1)?, args.pointer(2)?, args.uint(3)?);
                self.sys_write(process, fd, buf, len)
            }
            SyscallNumber::Seek => {
                let (fd, pos) = (args.int(1)?, args.uint(2)?);
                self.sys_seek(process, fd, pos)
            }
            SyscallNumber::Tell => {
                let fd = args.int(1)?;
                self.sys_tell(process, fd)
            }
            SyscallNumber::Close => {
                let fd = args.int(1)?;
                Ok(self.sys_close(process, fd))
            }
        }
    }

    fn resolve_failure(
        number: SyscallNumber,
        err: SyscallError,
        process: &Process,
        frame: &mut SyscallFrame,
    ) -> SyscallOutcome {
        if matches!(
            err,
            SyscallError::InvalidMemoryAccess(_) | SyscallError::UnknownSyscall
        ) {
            log::warn!("[SYSCALL] tid {} {:?} killed: {}", process.tid(), number, err);
            return Self::kill(process);
        }

        match number.failure_policy() {
            FailurePolicy::ReturnError => {
                log::debug!("[SYSCALL] tid {} {:?} -> -1: {}", process.tid(), number, err);
                frame.set_return(-1);
                SyscallOutcome::Continue
            }
            FailurePolicy::Terminate => {
                log::warn!("[SYSCALL] tid {} {:?} killed: {}", process.tid(), number, err);
                Self::kill(process)
            }
            FailurePolicy::Ignore => {
                log::debug!("[SYSCALL] tid {} {:?} ignored: {}", process.tid(), number, err);
                SyscallOutcome::Continue
            }
        }
    }

    /// Kill without touching the registry status, so a waiter reads the sentinel.
    fn kill(process: &Process) -> SyscallOutcome {
        log::debug!("[SYSCALL] terminating tid {}", process.tid());
        SyscallOutcome::Terminate {
            status: EXIT_STATUS_NONE,
        }
    }
}
