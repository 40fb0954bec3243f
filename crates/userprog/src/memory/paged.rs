//! TEAM_450: Sparse page-backed address space for hosted runs.
//!
//! Pages are heap blocks keyed by their base address and never move once
//! mapped, so a translated pointer stays valid for the life of the space.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::UnsafeCell;

use los_utils::{HashMap, Mutex};

use super::user::layout::PAGE_SIZE;
use super::user::{copy_from_user, copy_to_user, AddressSpace, MemoryError};

type Page = Box<UnsafeCell<[u8; PAGE_SIZE]>>;

/// TEAM_450: User address space made of individually mapped zeroed pages.
#[derive(Default)]
pub struct PagedMemory {
    pages: Mutex<HashMap<usize, Page>>,
}

impl PagedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the page containing `va`. Already mapped pages keep their contents.
    pub fn map_page(&self, va: usize) {
        let base = va & !(PAGE_SIZE - 1);
        self.pages
            .lock()
            .entry(base)
            .or_insert_with(|| Box::new(UnsafeCell::new([0; PAGE_SIZE])));
    }

    pub fn is_mapped(&self, va: usize) -> bool {
        self.pages.lock().contains_key(&(va & !(PAGE_SIZE - 1)))
    }

    /// Store `bytes` at `va` with the same checks the syscall gateway applies.
    pub fn poke(&self, va: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        copy_to_user(self, va, bytes)
    }

    pub fn peek(&self, va: usize, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut out = vec![0u8; len];
        copy_from_user(self, va, &mut out)?;
        Ok(out)
    }

    pub fn mapped_pages(&self) -> usize {
        self.pages.lock().len()
    }
}

impl AddressSpace for PagedMemory {
    fn translate(&self, user_va: usize) -> Option<*mut u8> {
        let base = user_va & !(PAGE_SIZE - 1);
        let pages = self.pages.lock();
        let page = pages.get(&base)?;
        // SAFETY: the offset is below PAGE_SIZE and the boxed page never moves.
        Some(unsafe { page.get().cast::<u8>().add(user_va - base) })
    }
}

impl core::fmt::Debug for PagedMemory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagedMemory")
            .field("pages", &self.mapped_pages())
            .finish()
    }
}
