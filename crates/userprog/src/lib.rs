//! TEAM_450: User-program layer of LevitateOS.
//!
//! Bookkeeping that lets user processes exec, wait and use files:
//! - [`task::process_registry`]: the shared exec/wait handshake table
//! - [`task::child_set`], [`task::pid_table`], [`task::fd_table`]: per-process tables
//! - [`syscall`]: the validated syscall gateway
//!
//! Scheduling, page tables, program loading, the filesystem and the console
//! are collaborators reached through the traits in [`memory::user`], [`fs`],
//! [`console`] and [`task`].

#![no_std]

extern crate alloc;

pub mod console;
pub mod fs;
pub mod kernel;
pub mod logger;
pub mod memory;
pub mod syscall;
pub mod task;


pub use kernel::Kernel;
pub use syscall::{SyscallFrame, SyscallOutcome};
pub use task::Process;
