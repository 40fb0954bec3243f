//! TEAM_450: File Descriptor Table.
//!
//! Per-process map from fd to an owned open file. Descriptors come from a
//! counter that starts at [`FD_BASE`] and only grows, so a closed fd is never
//! handed out again. fds 0 and 1 are the console and never appear in the table.

use los_utils::HashMap;

use crate::fs::{FileHandle, Filesys};

/// TEAM_450: File descriptor number as seen by user space.
pub type Fd = i32;

/// Console input.
pub const STDIN_FILENO: Fd = 0;
/// Console output.
pub const STDOUT_FILENO: Fd = 1;
/// First descriptor returned by open().
pub const FD_BASE: Fd = 2;

/// TEAM_450: Per-process file descriptor table. The map is created on first insert.
pub struct FdTable {
    entries: Option<HashMap<Fd, FileHandle>>,
    next_fd: Fd,
}

impl FdTable {
    pub const fn new() -> Self {
        Self {
            entries: None,
            next_fd: FD_BASE,
        }
    }

    /// Store `handle` under the next free descriptor and return it.
    pub fn alloc(&mut self, handle: FileHandle) -> Fd {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.insert(fd, handle);
        fd
    }

    /// Store `handle` under `fd`, returning any handle it displaced.
    ///
    /// A displaced handle is still open; the caller closes it under the filesystem lock.
    pub fn insert(&mut self, fd: Fd, handle: FileHandle) -> Option<FileHandle> {
        let displaced = self
            .entries
            .get_or_insert_with(HashMap::new)
            .insert(fd, handle);
        if displaced.is_some() {
            log::warn!("[FDTABLE] fd {} replaced an open handle", fd);
        }
        displaced
    }

    pub fn lookup(&mut self, fd: Fd) -> Option<&mut FileHandle> {
        self.entries.as_mut()?.get_mut(&fd)
    }

    pub fn contains(&self, fd: Fd) -> bool {
        self.entries.as_ref().is_some_and(|e| e.contains_key(&fd))
    }

    /// Remove `fd` and close its file under the filesystem lock.
    ///
    /// Returns false, without touching the lock, if `fd` is not open.
    pub fn remove_and_close(&mut self, fd: Fd, filesys: &Filesys) -> bool {
        let Some(handle) = self.entries.as_mut().and_then(|e| e.remove(&fd)) else {
            return false;
        };
        let _fs = filesys.lock();
        drop(handle);
        log::trace!("[FDTABLE] closed fd {}", fd);
        true
    }

    /// Close every remaining file with one acquisition of the filesystem lock,
    /// then discard the table. Returns how many files were closed.
    pub fn destroy_all(&mut self, filesys: &Filesys) -> usize {
        let Some(entries) = self.entries.take() else {
            return 0;
        };
        let count = entries.len();
        if count > 0 {
            let _fs = filesys.lock();
            drop(entries);
        }
        log::trace!("[FDTABLE] closed {} descriptors at teardown", count);
        count
    }

    /// Descriptor the next open() will receive.
    pub fn next_fd(&self) -> Fd {
        self.next_fd
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FdTable {
    fn drop(&mut self) {
        if !self.is_empty() {
            log::warn!(
                "[FDTABLE] {} descriptors dropped without destroy_all",
                self.len()
            );
        }
    }
}
