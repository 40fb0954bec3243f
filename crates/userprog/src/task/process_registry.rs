//! TEAM_450: Process Registry - exec/wait handshake state for every thread.
//!
//! One record per tid, created when the thread is created and released by the
//! process that reaps it. All records live behind one monitor lock; each record
//! carries its own load and exit conditions, both paired with that lock.
//!
//! Protocol obligations on callers:
//! - `register(tid)` happens before any other call naming `tid`.
//! - `report_load` and `signal_exit` fire exactly once per tid.
//! - `release(tid)` only once nobody is or will be blocked on `tid`.

use alloc::sync::Arc;

use los_error::define_kernel_error;
use los_utils::{Condvar, HashMap, Mutex, RelaxStrategy, Spin};

use super::{Pid, Tid, EXIT_STATUS_NONE, PID_ERROR};

define_kernel_error! {
    /// TEAM_450: Process registry errors.
    pub enum ProcessError(0x03) {
        /// No record for the tid
        NotRegistered = 0x01 => "Thread not registered",
        /// Exit status was already taken by a waiter
        AlreadyConsumed = 0x02 => "Exit status already consumed",
        /// Thread creation or program load failed
        SpawnFailed = 0x03 => "Process spawn failed",
    }
}

/// TEAM_450: Handshake state of one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    /// `PID_ERROR` until load completes, and forever if the load failed.
    pub pid: Pid,
    /// Set once by `report_load`, never cleared.
    pub load_done: bool,
    /// Pending status. Reset to `EXIT_STATUS_NONE` once read.
    pub exit_status: i32,
    /// Set once by `signal_exit`.
    pub exit_done: bool,
    /// Set when a waiter has taken the exit status.
    pub exit_consumed: bool,
}

impl ProcessInfo {
    const fn new() -> Self {
        Self {
            pid: PID_ERROR,
            load_done: false,
            exit_status: EXIT_STATUS_NONE,
            exit_done: false,
            exit_consumed: false,
        }
    }
}

struct Signals<R> {
    load: Condvar<R>,
    exit: Condvar<R>,
}

struct Record<R> {
    info: ProcessInfo,
    signals: Arc<Signals<R>>,
}

type Table<R> = HashMap<Tid, Record<R>>;

/// TEAM_450: Shared table of [`ProcessInfo`] records keyed by tid.
///
/// `R` picks how a blocked waiter spends its time; the kernel spins, hosted
/// builds can yield to the OS scheduler.
pub struct ProcessRegistry<R: RelaxStrategy = Spin> {
    table: Mutex<Table<R>>,
}

impl<R: RelaxStrategy> ProcessRegistry<R> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a fresh record for `tid`.
    ///
    /// A stale record left under the same tid is replaced.
    pub fn register(&self, tid: Tid) {
        let record = Record {
            info: ProcessInfo::new(),
            signals: Arc::new(Signals {
                load: Condvar::new(),
                exit: Condvar::new(),
            }),
        };
        if self.table.lock().insert(tid, record).is_some() {
            log::warn!("[PROCESS] tid {} registered twice, stale record replaced", tid);
        }
        log::trace!("[PROCESS] registered tid {}", tid);
    }

    /// Block until `tid` has reported its load result, then return its pid.
    ///
    /// Returns at once if the load already completed.
    pub fn await_pid(&self, tid: Tid) -> Result<Pid, ProcessError> {
        let mut table = self.table.lock();
        loop {
            let record = table.get(&tid).ok_or(ProcessError::NotRegistered)?;
            if record.info.load_done {
                return Ok(record.info.pid);
            }
            let signals = Arc::clone(&record.signals);
            table = signals.load.wait(table, &self.table);
        }
    }

    /// Publish the load result of `tid` and wake its waiter.
    pub fn report_load(&self, tid: Tid, pid: Pid) -> Result<(), ProcessError> {
        let mut table = self.table.lock();
        let record = table.get_mut(&tid).ok_or(ProcessError::NotRegistered)?;
        record.info.pid = pid;
        record.info.load_done = true;
        record.signals.load.notify_one();
        log::trace!("[PROCESS] tid {} loaded with pid {}", tid, pid);
        Ok(())
    }

    /// Block until `tid` has exited, then take its exit status.
    ///
    /// The status is handed out once. Later calls fail with
    /// [`ProcessError::AlreadyConsumed`] instead of reading the sentinel.
    pub fn await_exit(&self, tid: Tid) -> Result<i32, ProcessError> {
        let mut table = self.table.lock();
        loop {
            let record = table.get_mut(&tid).ok_or(ProcessError::NotRegistered)?;
            if record.info.exit_consumed {
                return Err(ProcessError::AlreadyConsumed);
            }
            if record.info.exit_done {
                let status = record.info.exit_status;
                record.info.exit_status = EXIT_STATUS_NONE;
                record.info.exit_consumed = true;
                return Ok(status);
            }
            let signals = Arc::clone(&record.signals);
            table = signals.exit.wait(table, &self.table);
        }
    }

    /// Store the pending exit status of `tid`. Last write before `signal_exit` wins.
    pub fn set_exit_status(&self, tid: Tid, status: i32) -> Result<(), ProcessError> {
        let mut table = self.table.lock();
        let record = table.get_mut(&tid).ok_or(ProcessError::NotRegistered)?;
        record.info.exit_status = status;
        Ok(())
    }

    /// Mark `tid` as exited and wake everyone waiting on it.
    pub fn signal_exit(&self, tid: Tid) -> Result<(), ProcessError> {
        let mut table = self.table.lock();
        let record = table.get_mut(&tid).ok_or(ProcessError::NotRegistered)?;
        record.info.exit_done = true;
        record.signals.exit.notify_all();
        log::trace!("[PROCESS] tid {} signalled exit", tid);
        Ok(())
    }

    /// Remove and free the record of `tid`.
    pub fn release(&self, tid: Tid) -> Result<(), ProcessError> {
        self.table
            .lock()
            .remove(&tid)
            .map(|_| ())
            .ok_or(ProcessError::NotRegistered)
    }

    /// Free every remaining record, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut table = self.table.lock();
        let count = table.len();
        table.clear();
        count
    }

    /// Snapshot of the record for `tid`.
    pub fn info(&self, tid: Tid) -> Option<ProcessInfo> {
        self.table.lock().get(&tid).map(|r| r.info)
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.table.lock().contains_key(&tid)
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: RelaxStrategy> Default for ProcessRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RelaxStrategy> core::fmt::Debug for ProcessRegistry<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("records", &self.len())
            .finish()
    }
}
