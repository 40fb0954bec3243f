//! TEAM_450: User address validation for the syscall gateway.
//!
//! Every user-supplied address is checked one byte at a time: the byte must be
//! non-null, below [`layout::PHYS_BASE`], and mapped in the caller's page
//! directory. A buffer that spans a partially unmapped region is caught at the
//! first bad byte, whatever its alignment.
//!
//! The page directory itself is an external collaborator, consumed through
//! [`AddressSpace::translate`].

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use los_error::define_kernel_error;

/// TEAM_450: User address space layout constants.
pub mod layout {
    /// First kernel virtual address. Everything at or above belongs to the kernel.
    pub const PHYS_BASE: usize = 0xC000_0000;

    /// Page size of the user address space.
    pub const PAGE_SIZE: usize = 4096;

    /// Longest NUL-terminated string accepted from user space, terminator included.
    pub const USER_STRING_MAX: usize = PAGE_SIZE;
}

define_kernel_error! {
    /// TEAM_450: Reasons a user address failed validation.
    pub enum MemoryError(0x02) {
        /// Address zero
        NullPointer = 0x01 => "Null user pointer",
        /// Address at or above PHYS_BASE
        KernelAddress = 0x02 => "Address inside kernel region",
        /// No page mapped at the address
        NotMapped = 0x03 => "User page not mapped",
        /// No NUL within USER_STRING_MAX bytes
        UnterminatedString = 0x04 => "User string not terminated",
    }
}

/// TEAM_450: Page directory of one process, as seen by the kernel.
pub trait AddressSpace {
    /// Translate a user virtual address to a kernel-visible pointer to the same
    /// byte, or `None` if no page is mapped there.
    ///
    /// The returned pointer stays valid for as long as the mapping exists.
    fn translate(&self, user_va: usize) -> Option<*mut u8>;
}

impl<T: AddressSpace + ?Sized> AddressSpace for Arc<T> {
    fn translate(&self, user_va: usize) -> Option<*mut u8> {
        (**self).translate(user_va)
    }
}

/// TEAM_450: True if `va` lies in the kernel's reserved region.
#[inline]
pub const fn is_kernel_vaddr(va: usize) -> bool {
    va >= layout::PHYS_BASE
}

/// TEAM_450: Validate a single user byte and return its kernel-visible location.
pub fn validate_user_byte(space: &dyn AddressSpace, va: usize) -> Result<*mut u8, MemoryError> {
    if va == 0 {
        return Err(MemoryError::NullPointer);
    }
    if is_kernel_vaddr(va) {
        return Err(MemoryError::KernelAddress);
    }
    space.translate(va).ok_or(MemoryError::NotMapped)
}

/// TEAM_450: Validate every byte of `[ptr, ptr + len)`.
///
/// A zero-length range is trivially valid.
pub fn validate_user_buffer(
    space: &dyn AddressSpace,
    ptr: usize,
    len: usize,
) -> Result<(), MemoryError> {
    for offset in 0..len {
        let va = ptr.checked_add(offset).ok_or(MemoryError::KernelAddress)?;
        if let Err(e) = validate_user_byte(space, va) {
            log::trace!("[USERMEM] byte {:#x} of range {:#x}+{} rejected: {}", va, ptr, len, e);
            return Err(e);
        }
    }
    Ok(())
}

pub fn read_user_byte(space: &dyn AddressSpace, va: usize) -> Result<u8, MemoryError> {
    let ptr = validate_user_byte(space, va)?;
    // SAFETY: validate_user_byte ensures the address is mapped and valid.
    Ok(unsafe { *ptr })
}

pub fn write_user_byte(space: &dyn AddressSpace, va: usize, byte: u8) -> Result<(), MemoryError> {
    let ptr = validate_user_byte(space, va)?;
    // SAFETY: validate_user_byte ensures the address is mapped and valid.
    unsafe {
        *ptr = byte;
    }
    Ok(())
}

/// TEAM_450: Read a little-endian 32-bit word, validating all four bytes first.
pub fn read_user_u32(space: &dyn AddressSpace, va: usize) -> Result<u32, MemoryError> {
    validate_user_buffer(space, va, 4)?;
    let mut bytes = [0u8; 4];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = read_user_byte(space, va + i)?;
    }
    Ok(u32::from_le_bytes(bytes))
}

/// TEAM_450: Copy `dst.len()` bytes out of user memory starting at `src`.
pub fn copy_from_user(space: &dyn AddressSpace, src: usize, dst: &mut [u8]) -> Result<(), MemoryError> {
    for (i, byte) in dst.iter_mut().enumerate() {
        let va = src.checked_add(i).ok_or(MemoryError::KernelAddress)?;
        *byte = read_user_byte(space, va)?;
    }
    Ok(())
}

/// TEAM_450: Copy `src` into user memory starting at `dst`.
pub fn copy_to_user(space: &dyn AddressSpace, dst: usize, src: &[u8]) -> Result<(), MemoryError> {
    for (i, &byte) in src.iter().enumerate() {
        let va = dst.checked_add(i).ok_or(MemoryError::KernelAddress)?;
        write_user_byte(space, va, byte)?;
    }
    Ok(())
}

/// TEAM_450: Read a NUL-terminated string from user space.
///
/// Every byte up to and including the terminator is validated. Invalid UTF-8
/// is replaced rather than rejected, since the caller only needs a name.
pub fn read_user_cstring(space: &dyn AddressSpace, ptr: usize) -> Result<String, MemoryError> {
    let mut bytes = Vec::new();
    for offset in 0..layout::USER_STRING_MAX {
        let va = ptr.checked_add(offset).ok_or(MemoryError::KernelAddress)?;
        match read_user_byte(space, va)? {
            0 => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            byte => bytes.push(byte),
        }
    }
    Err(MemoryError::UnterminatedString)
}
