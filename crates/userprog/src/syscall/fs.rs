//! TEAM_450: File syscalls.
//!
//! Every call into the filesystem, including reads and writes on an open
//! file, happens while holding the filesystem lock. User buffers are
//! validated in full before the filesystem is touched and data moves through
//! a kernel buffer.

use alloc::vec;

use los_utils::RelaxStrategy;

use super::{Disposition, SyscallError, SyscallResult};
use crate::kernel::Kernel;
use crate::memory::user::{
    copy_from_user, copy_to_user, read_user_cstring, validate_user_buffer, validate_user_byte,
    AddressSpace, MemoryError,
};
use crate::task::fd_table::{Fd, STDIN_FILENO, STDOUT_FILENO};
use crate::task::Process;

/// The first byte of a read or write buffer is checked even when the length is zero.
fn first_byte(space: &dyn AddressSpace, buf: usize) -> Result<usize, MemoryError> {
    validate_user_byte(space, buf)?;
    Ok(buf)
}

impl<R: RelaxStrategy> Kernel<R> {
    /// TEAM_450: create(name, initial_size) - true if the file was created.
    pub(super) fn sys_create(&self, process: &mut Process, name: usize, size: u32) -> SyscallResult {
        let name = read_user_cstring(&*process.address_space, name)?;
        let created = self.filesys.lock().create(&name, size);
        log::debug!("[SYSCALL] create {:?} ({} bytes): {}", name, size, created);
        Ok(Disposition::Return(i32::from(created)))
    }

    /// TEAM_450: remove(name) - the result is not delivered to the caller.
    pub(super) fn sys_remove(&self, process: &mut Process, name: usize) -> SyscallResult {
        let name = read_user_cstring(&*process.address_space, name)?;
        let removed = self.filesys.lock().remove(&name);
        log::debug!("[SYSCALL] remove {:?}: {}", name, removed);
        Ok(Disposition::NoValue)
    }

    /// TEAM_450: open(name) - a fresh descriptor for the opened file.
    pub(super) fn sys_open(&self, process: &mut Process, name: usize) -> SyscallResult {
        let name = read_user_cstring(&*process.address_space, name)?;
        let handle = self
            .filesys
            .lock()
            .open(&name)
            .ok_or(SyscallError::ResourceNotFound)?;
        let fd = process.files.alloc(handle);
        log::debug!("[FDTABLE] tid {} opened {:?} as fd {}", process.tid, name, fd);
        Ok(Disposition::Return(fd))
    }

    /// TEAM_450: filesize(fd).
    pub(super) fn sys_filesize(&self, process: &mut Process, fd: Fd) -> SyscallResult {
        let _fs = self.filesys.lock();
        let file = process
            .files
            .lookup(fd)
            .ok_or(SyscallError::ResourceNotFound)?;
        Ok(Disposition::Return(file.length() as i32))
    }

    /// TEAM_450: read(fd, buf, len).
    ///
    /// fd 0 takes `len` bytes from the console, validating each destination
    /// byte before blocking for input. A fault part way through kills the
    /// caller with no partial count.
    pub(super) fn sys_read(&self, process: &mut Process, fd: Fd, buf: usize, len: u32) -> SyscallResult {
        let space = &*process.address_space;
        let buf = first_byte(space, buf)?;
        let len = len as usize;

        if fd == STDIN_FILENO {
            for offset in 0..len {
                let va = buf.checked_add(offset).ok_or(MemoryError::KernelAddress)?;
                let dst = validate_user_byte(space, va)?;
                let byte = self.console.getc();
                // SAFETY: validate_user_byte ensures the address is mapped and valid.
                unsafe {
                    *dst = byte;
                }
            }
            return Ok(Disposition::Return(len as i32));
        }

        validate_user_buffer(space, buf, len)?;
        let mut kbuf = vec![0u8; len];
        let count = {
            let _fs = self.filesys.lock();
            let file = process
                .files
                .lookup(fd)
                .ok_or(SyscallError::ResourceNotFound)?;
            file.read(&mut kbuf).min(len)
        };
        copy_to_user(space, buf, &kbuf[..count])?;
        Ok(Disposition::Return(count as i32))
    }

    /// TEAM_450: write(fd, buf, len).
    ///
    /// fd 1 goes to the console in one `putbuf` and always reports `len`.
    pub(super) fn sys_write(&self, process: &mut Process, fd: Fd, buf: usize, len: u32) -> SyscallResult {
        let space = &*process.address_space;
        let buf = first_byte(space, buf)?;
        let len = len as usize;

        validate_user_buffer(space, buf, len)?;
        let mut kbuf = vec![0u8; len];
        copy_from_user(space, buf, &mut kbuf)?;

        if fd == STDOUT_FILENO {
            self.console.putbuf(&kbuf);
            return Ok(Disposition::Return(len as i32));
        }

        let _fs = self.filesys.lock();
        let file = process
            .files
            .lookup(fd)
            .ok_or(SyscallError::ResourceNotFound)?;
        Ok(Disposition::Return(file.write(&kbuf) as i32))
    }

    /// TEAM_450: seek(fd, position).
    pub(super) fn sys_seek(&self, process: &mut Process, fd: Fd, pos: u32) -> SyscallResult {
        let _fs = self.filesys.lock();
        process
            .files
            .lookup(fd)
            .ok_or(SyscallError::ResourceNotFound)?
            .seek(pos);
        Ok(Disposition::NoValue)
    }

    /// TEAM_450: tell(fd).
    pub(super) fn sys_tell(&self, process: &mut Process, fd: Fd) -> SyscallResult {
        let _fs = self.filesys.lock();
        let file = process
            .files
            .lookup(fd)
            .ok_or(SyscallError::ResourceNotFound)?;
        Ok(Disposition::Return(file.tell() as i32))
    }

    /// TEAM_450: close(fd). Unknown descriptors are ignored.
    pub(super) fn sys_close(&self, process: &mut Process, fd: Fd) -> Disposition {
        if !process.files.remove_and_close(fd, &self.filesys) {
            log::debug!("[FDTABLE] tid {} close of unknown fd {}", process.tid, fd);
        }
        Disposition::NoValue
    }
}
