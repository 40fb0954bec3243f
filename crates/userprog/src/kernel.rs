//! TEAM_450: Kernel context shared by every kernel thread.

use alloc::boxed::Box;
use core::sync::atomic::{AtomicI32, Ordering};

use los_utils::{RelaxStrategy, Spin};

use crate::console::Console;
use crate::fs::{FileSystem, Filesys};
use crate::task::process_registry::ProcessRegistry;
use crate::task::{Pid, ProcessControl};

/// TEAM_450: Process registry, filesystem lock and collaborators in one place.
///
/// Shared by reference between all kernel threads. Per-process state lives in
/// [`crate::Process`] and is passed to each call explicitly.
pub struct Kernel<R: RelaxStrategy = Spin> {
    pub(crate) registry: ProcessRegistry<R>,
    pub(crate) filesys: Filesys,
    pub(crate) console: Box<dyn Console>,
    pub(crate) control: Box<dyn ProcessControl>,
    next_pid: AtomicI32,
}

impl<R: RelaxStrategy> Kernel<R> {
    pub fn new(
        fs: Box<dyn FileSystem>,
        console: Box<dyn Console>,
        control: Box<dyn ProcessControl>,
    ) -> Self {
        Self {
            registry: ProcessRegistry::new(),
            filesys: Filesys::new(fs),
            console,
            control,
            next_pid: AtomicI32::new(1),
        }
    }

    pub fn registry(&self) -> &ProcessRegistry<R> {
        &self.registry
    }

    pub fn filesys(&self) -> &Filesys {
        &self.filesys
    }

    pub fn console(&self) -> &dyn Console {
        &*self.console
    }

    pub(crate) fn allocate_pid(&self) -> Pid {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }
}

impl<R: RelaxStrategy> core::fmt::Debug for Kernel<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("registry", &self.registry)
            .field("filesys", &self.filesys)
            .field("next_pid", &self.next_pid.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
