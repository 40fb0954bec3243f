#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

// TEAM_211: Re-export spin crate types as our lock API
// Note: spin::Mutex is re-exported as Mutex for API compatibility
pub use spin::relax::{RelaxStrategy, Spin};
pub use spin::Once;
pub use spin::{Mutex, MutexGuard};

// TEAM_212: Re-export hashbrown collections
pub use hashbrown::{HashMap, HashSet};

/// TEAM_450: Condition variable paired with a [`Mutex`] (monitor pattern).
///
/// A waiter samples the generation counter while it still holds the lock,
/// releases the lock, and relaxes until a notifier bumps the counter. Notifiers
/// are expected to hold the same lock when they change the guarded state, so a
/// notification can never fall between the waiter's check and its sleep.
///
/// Every waiter observes every bump, so `notify_one` may wake more than one
/// thread. Callers re-check their predicate in a loop.
pub struct Condvar<R = Spin> {
    generation: AtomicUsize,
    relax: PhantomData<fn() -> R>,
}

impl<R: RelaxStrategy> Condvar<R> {
    pub const fn new() -> Self {
        Self {
            generation: AtomicUsize::new(0),
            relax: PhantomData,
        }
    }

    /// Release `guard`, block until notified, then reacquire `mutex`.
    ///
    /// `guard` must have been obtained from `mutex`.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        let seen = self.generation.load(Ordering::Acquire);
        drop(guard);

        while self.generation.load(Ordering::Acquire) == seen {
            R::relax();
        }

        mutex.lock()
    }

    /// Block while `condition` holds, returning the guard once it is false.
    pub fn wait_while<'a, T, F>(
        &self,
        mut guard: MutexGuard<'a, T>,
        mutex: &'a Mutex<T>,
        mut condition: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut *guard) {
            guard = self.wait(guard, mutex);
        }
        guard
    }

    pub fn notify_one(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn notify_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl<R: RelaxStrategy> Default for Condvar<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> core::fmt::Debug for Condvar<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Condvar")
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

/// TEAM_450: Relax strategy that hands the CPU back to the host scheduler.
#[cfg(feature = "std")]
pub struct Yield;

#[cfg(feature = "std")]
impl RelaxStrategy for Yield {
    fn relax() {
        std::thread::yield_now();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
