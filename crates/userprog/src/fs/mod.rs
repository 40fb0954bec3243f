//! TEAM_450: Filesystem collaborator and the coarse filesystem lock.
//!
//! The on-disk filesystem lives outside this crate. It is reached through
//! [`FileSystem`] and [`OpenFile`], and every call into it, including reads
//! and writes on an already open file, is made while holding the single
//! [`Filesys`] lock. That lock gives all file operations one total order.

use alloc::boxed::Box;

use los_utils::{Mutex, MutexGuard};

/// TEAM_450: An open file owned by exactly one descriptor.
///
/// Closing is dropping. Callers drop handles while holding the [`Filesys`] lock.
pub trait OpenFile: Send {
    /// Read up to `buf.len()` bytes at the current position, returning the count.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write up to `buf.len()` bytes at the current position, returning the count.
    fn write(&mut self, buf: &[u8]) -> usize;

    fn seek(&mut self, pos: u32);

    fn tell(&self) -> u32;

    /// Length of the file in bytes.
    fn length(&self) -> u32;
}

/// TEAM_450: Owned open-file handle as stored in a descriptor table.
pub type FileHandle = Box<dyn OpenFile>;

/// TEAM_450: Name-based filesystem operations.
pub trait FileSystem: Send {
    /// Create `name` with `initial_size` zero bytes. False if it exists or on failure.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    fn remove(&mut self, name: &str) -> bool;

    fn open(&mut self, name: &str) -> Option<FileHandle>;
}

/// TEAM_450: The filesystem behind its global serializing lock.
pub struct Filesys {
    inner: Mutex<Box<dyn FileSystem>>,
    #[cfg(test)]
    acquisitions: core::sync::atomic::AtomicUsize,
}

/// TEAM_450: Proof that the filesystem lock is held.
pub type FilesysGuard<'a> = MutexGuard<'a, Box<dyn FileSystem>>;

impl Filesys {
    pub fn new(fs: Box<dyn FileSystem>) -> Self {
        Self {
            inner: Mutex::new(fs),
            #[cfg(test)]
            acquisitions: core::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Acquire the filesystem lock. Released when the guard drops.
    pub fn lock(&self) -> FilesysGuard<'_> {
        #[cfg(test)]
        self.acquisitions
            .fetch_add(1, core::sync::atomic::Ordering::Relaxed);
        self.inner.lock()
    }

    /// Number of times the lock has been taken.
    #[cfg(test)]
    pub(crate) fn acquisitions(&self) -> usize {
        self.acquisitions.load(core::sync::atomic::Ordering::Relaxed)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl core::fmt::Debug for Filesys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Filesys")
            .field("locked", &self.inner.is_locked())
            .finish()
    }
}
