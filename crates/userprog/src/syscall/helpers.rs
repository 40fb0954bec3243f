//! TEAM_450: Syscall argument access.

use crate::memory::user::{read_user_u32, AddressSpace, MemoryError};

/// Size of one argument slot on the user stack.
const WORD: usize = 4;

/// TEAM_450: The argument words on a trapped user stack.
///
/// Slot 0 is the syscall number; slots 1 to 3 hold the arguments in order.
pub struct SyscallArgs<'a> {
    space: &'a dyn AddressSpace,
    esp: usize,
}

impl<'a> SyscallArgs<'a> {
    pub fn new(space: &'a dyn AddressSpace, esp: usize) -> Self {
        Self { space, esp }
    }

    /// Raw word in `slot`, with all four bytes validated.
    pub fn word(&self, slot: usize) -> Result<u32, MemoryError> {
        let va = self
            .esp
            .checked_add(slot * WORD)
            .ok_or(MemoryError::KernelAddress)?;
        read_user_u32(self.space, va)
    }

    pub fn number(&self) -> Result<u32, MemoryError> {
        self.word(0)
    }

    pub fn int(&self, slot: usize) -> Result<i32, MemoryError> {
        self.word(slot).map(|w| w as i32)
    }

    pub fn uint(&self, slot: usize) -> Result<u32, MemoryError> {
        self.word(slot)
    }

    /// User address in `slot`. Not dereferenced here.
    pub fn pointer(&self, slot: usize) -> Result<usize, MemoryError> {
        self.word(slot).map(|w| w as usize)
    }
}
