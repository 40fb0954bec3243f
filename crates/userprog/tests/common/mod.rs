//! Fake kernel used by the integration tests.
//!
//! Each spawned child runs a registered Rust closure on its own `std::thread`,
//! issuing syscalls through [`User`] exactly as a trapped user program would:
//! arguments are written to a fake user stack and the gateway reads them back
//! through the process's address space.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use los_userprog::console::Console;
use los_userprog::fs::{FileHandle, FileSystem, OpenFile};
use los_userprog::memory::user::layout::PAGE_SIZE;
use los_userprog::memory::paged::PagedMemory;
use los_userprog::syscall::SyscallNumber;
use los_userprog::task::{ProcessControl, Tid, TID_ERROR};
use los_userprog::{Kernel, Process, SyscallFrame, SyscallOutcome};
use los_utils::Yield;

pub type TestKernel = Kernel<Yield>;

pub const STACK_PAGE: usize = 0xbfff_f000;
pub const USER_ESP: usize = 0xbfff_ff00;
pub const DATA_BASE: usize = 0x0804_8000;
pub const DATA_PAGES: usize = 4;
pub const DATA_END: usize = DATA_BASE + DATA_PAGES * PAGE_SIZE;

// ============================================================================
// User memory
// ============================================================================

/// Stack page plus a few data pages, like a freshly loaded program.
pub fn user_memory() -> Arc<PagedMemory> {
    let mem = PagedMemory::new();
    mem.map_page(STACK_PAGE);
    for page in 0..DATA_PAGES {
        mem.map_page(DATA_BASE + page * PAGE_SIZE);
    }
    Arc::new(mem)
}

// ============================================================================
// Filesystem
// ============================================================================

type FileData = Arc<Mutex<Vec<u8>>>;

/// Flat in-memory filesystem. Files have a fixed length set at creation.
#[derive(Clone, Default)]
pub struct MemFs {
    files: Arc<Mutex<HashMap<String, FileData>>>,
    open_handles: Arc<AtomicUsize>,
}

impl MemFs {
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().unwrap();
        files.get(name).map(|f| f.lock().unwrap().clone())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl FileSystem for MemFs {
    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        let mut files = self.files.lock().unwrap();
        if name.is_empty() || files.contains_key(name) {
            return false;
        }
        files.insert(
            name.to_string(),
            Arc::new(Mutex::new(vec![0; initial_size as usize])),
        );
        true
    }

    fn remove(&mut self, name: &str) -> bool {
        self.files.lock().unwrap().remove(name).is_some()
    }

    fn open(&mut self, name: &str) -> Option<FileHandle> {
        let data = self.files.lock().unwrap().get(name)?.clone();
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MemFile {
            data,
            pos: 0,
            open_handles: self.open_handles.clone(),
        }))
    }
}

struct MemFile {
    data: FileData,
    pos: u32,
    open_handles: Arc<AtomicUsize>,
}

impl OpenFile for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let data = self.data.lock().unwrap();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u32;
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let mut data = self.data.lock().unwrap();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        data[start..start + n].copy_from_slice(&buf[..n]);
        self.pos += n as u32;
        n
    }

    fn seek(&mut self, pos: u32) {
        self.pos = pos;
    }

    fn tell(&self) -> u32 {
        self.pos
    }

    fn length(&self) -> u32 {
        self.data.lock().unwrap().len() as u32
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Console
// ============================================================================

#[derive(Default)]
pub struct ScriptedConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
    reads: AtomicUsize,
}

impl ScriptedConsole {
    pub fn feed(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend(bytes.iter().copied());
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock().unwrap()).into_owned()
    }

    /// Number of bytes handed out by `getc`.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

struct ConsoleHandle(Arc<ScriptedConsole>);

impl Console for ConsoleHandle {
    fn getc(&self) -> u8 {
        loop {
            if let Some(b) = self.0.input.lock().unwrap().pop_front() {
                self.0.reads.fetch_add(1, Ordering::SeqCst);
                return b;
            }
            thread::yield_now();
        }
    }

    fn putbuf(&self, buf: &[u8]) {
        self.0.output.lock().unwrap().extend_from_slice(buf);
    }
}

// ============================================================================
// Process control
// ============================================================================

/// Body of a fake user program.
pub type Program = Arc<dyn Fn(&mut User<'_>) -> Result<(), Stop> + Send + Sync>;

#[derive(Default)]
struct Spawner {
    kernel: OnceLock<Weak<TestKernel>>,
    programs: Mutex<HashMap<String, Program>>,
    next_tid: AtomicI32,
    threads: Mutex<Vec<JoinHandle<()>>>,
    load_delay_ms: AtomicUsize,
    powered_off: AtomicBool,
}

struct SpawnerHandle(Arc<Spawner>);

impl ProcessControl for SpawnerHandle {
    fn spawn(&self, cmdline: &str) -> Tid {
        let spawner = &self.0;
        let Some(kernel) = spawner.kernel.get().and_then(Weak::upgrade) else {
            return TID_ERROR;
        };
        if cmdline.trim().is_empty() {
            return TID_ERROR;
        }

        let tid = spawner.next_tid.fetch_add(1, Ordering::SeqCst);
        kernel.thread_created(tid);

        let name = cmdline.split_whitespace().next().unwrap_or_default();
        let program = spawner.programs.lock().unwrap().get(name).cloned();
        let delay = spawner.load_delay_ms.load(Ordering::SeqCst) as u64;
        let cmdline = cmdline.to_string();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(delay));
            run_process(&kernel, tid, &cmdline, program);
        });
        spawner.threads.lock().unwrap().push(handle);
        tid
    }

    fn power_off(&self) {
        self.0.powered_off.store(true, Ordering::SeqCst);
    }
}

/// Load `cmdline` as `tid`, run it if the load succeeded, then tear it down.
fn run_process(kernel: &TestKernel, tid: Tid, cmdline: &str, program: Option<Program>) {
    let mem = user_memory();
    let mut process = Process::new(tid, cmdline, Box::new(mem.clone()));
    let pid = kernel.load_finished(tid, program.is_some());
    process.set_pid(pid);

    if let Some(program) = program {
        let mut user = User::new(kernel, &mut process, mem);
        if program(&mut user).is_ok() {
            let _ = user.exit(0);
        }
    }
    kernel.process_exit(process);
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub kernel: Arc<TestKernel>,
    pub console: Arc<ScriptedConsole>,
    pub fs: MemFs,
    spawner: Arc<Spawner>,
}

impl Harness {
    pub fn new() -> Self {
        let console = Arc::new(ScriptedConsole::default());
        let fs = MemFs::default();
        let spawner = Arc::new(Spawner::default());
        spawner.next_tid.store(100, Ordering::SeqCst);

        let kernel = Arc::new(TestKernel::new(
            Box::new(fs.clone()),
            Box::new(ConsoleHandle(console.clone())),
            Box::new(SpawnerHandle(spawner.clone())),
        ));
        spawner
            .kernel
            .set(Arc::downgrade(&kernel))
            .unwrap_or_else(|_| unreachable!());

        Self {
            kernel,
            console,
            fs,
            spawner,
        }
    }

    /// Make `name` loadable by exec().
    pub fn program<F>(&self, name: &str, body: F) -> &Self
    where
        F: Fn(&mut User<'_>) -> Result<(), Stop> + Send + Sync + 'static,
    {
        self.spawner
            .programs
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(body));
        self
    }

    /// Delay every child's load report by `ms`.
    pub fn load_delay(&self, ms: usize) {
        self.spawner.load_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn powered_off(&self) -> bool {
        self.spawner.powered_off.load(Ordering::SeqCst)
    }

    /// Run `body` as an initial process on the calling thread.
    ///
    /// Returns how the program stopped. The process is torn down afterwards.
    pub fn run<F>(&self, cmdline: &str, body: F) -> Stop
    where
        F: FnOnce(&mut User<'_>) -> Result<(), Stop>,
    {
        let tid = self.spawner.next_tid.fetch_add(1, Ordering::SeqCst);
        self.kernel.thread_created(tid);
        let mem = user_memory();
        let mut process = Process::new(tid, cmdline, Box::new(mem.clone()));
        let pid = self.kernel.load_finished(tid, true);
        process.set_pid(pid);

        let stop = {
            let mut user = User::new(&self.kernel, &mut process, mem);
            match body(&mut user) {
                Ok(()) => user.exit(0).unwrap_err(),
                Err(stop) => stop,
            }
        };
        self.kernel.process_exit(process);
        stop
    }

    /// Wait for every spawned thread, including ones spawned while waiting.
    pub fn join_all(&self) {
        loop {
            let next = self.spawner.threads.lock().unwrap().pop();
            match next {
                Some(handle) => handle.join().expect("child thread panicked"),
                None => break,
            }
        }
    }
}

// ============================================================================
// User side
// ============================================================================

/// Why a program stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Terminated with this status, either by exit() or by the kernel (-1).
    Exit(i32),
    PowerOff,
}

/// A running user program: its process, its memory and a bump allocator.
pub struct User<'a> {
    pub kernel: &'a TestKernel,
    pub process: &'a mut Process,
    pub mem: Arc<PagedMemory>,
    brk: usize,
}

impl<'a> User<'a> {
    pub fn new(kernel: &'a TestKernel, process: &'a mut Process, mem: Arc<PagedMemory>) -> Self {
        Self {
            kernel,
            process,
            mem,
            brk: DATA_BASE,
        }
    }

    /// Reserve `len` bytes of mapped user memory.
    pub fn alloc(&mut self, len: usize) -> usize {
        let addr = self.brk;
        self.brk += len.max(1);
        assert!(self.brk <= DATA_END, "user data area exhausted");
        addr
    }

    pub fn bytes(&mut self, data: &[u8]) -> usize {
        let addr = self.alloc(data.len());
        self.mem.poke(addr, data).unwrap();
        addr
    }

    pub fn cstr(&mut self, s: &str) -> usize {
        let addr = self.alloc(s.len() + 1);
        self.mem.poke(addr, s.as_bytes()).unwrap();
        self.mem.poke(addr + s.len(), &[0]).unwrap();
        addr
    }

    /// Trap with the stack pointer at `esp`, whatever is there.
    pub fn trap(&mut self, esp: usize) -> (SyscallOutcome, SyscallFrame) {
        let mut frame = SyscallFrame::new(esp);
        let outcome = self.kernel.syscall(self.process, &mut frame);
        (outcome, frame)
    }

    /// Push `nr` and `args` on the user stack and trap.
    ///
    /// `Ok` carries `eax` after a normal return.
    pub fn syscall_raw(&mut self, nr: u32, args: &[u32]) -> Result<i32, Stop> {
        self.mem.poke(USER_ESP, &nr.to_le_bytes()).unwrap();
        for (i, arg) in args.iter().enumerate() {
            self.mem.poke(USER_ESP + 4 * (i + 1), &arg.to_le_bytes()).unwrap();
        }
        match self.trap(USER_ESP) {
            (SyscallOutcome::Continue, frame) => Ok(frame.return_value()),
            (SyscallOutcome::Terminate { status }, _) => Err(Stop::Exit(status)),
            (SyscallOutcome::PowerOff, _) => Err(Stop::PowerOff),
        }
    }

    pub fn syscall(&mut self, nr: SyscallNumber, args: &[u32]) -> Result<i32, Stop> {
        self.syscall_raw(nr as u32, args)
    }

    pub fn halt(&mut self) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Halt, &[])
    }

    pub fn exit(&mut self, status: i32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Exit, &[status as u32])
    }

    pub fn exec(&mut self, cmdline: &str) -> Result<i32, Stop> {
        let ptr = self.cstr(cmdline);
        self.syscall(SyscallNumber::Exec, &[ptr as u32])
    }

    pub fn wait(&mut self, pid: i32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Wait, &[pid as u32])
    }

    pub fn create(&mut self, name: &str, size: u32) -> Result<i32, Stop> {
        let ptr = self.cstr(name);
        self.syscall(SyscallNumber::Create, &[ptr as u32, size])
    }

    pub fn remove(&mut self, name: &str) -> Result<i32, Stop> {
        let ptr = self.cstr(name);
        self.syscall(SyscallNumber::Remove, &[ptr as u32])
    }

    pub fn open(&mut self, name: &str) -> Result<i32, Stop> {
        let ptr = self.cstr(name);
        self.syscall(SyscallNumber::Open, &[ptr as u32])
    }

    pub fn filesize(&mut self, fd: i32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Filesize, &[fd as u32])
    }

    pub fn read(&mut self, fd: i32, buf: usize, len: u32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Read, &[fd as u32, buf as u32, len])
    }

    pub fn write(&mut self, fd: i32, buf: usize, len: u32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Write, &[fd as u32, buf as u32, len])
    }

    pub fn seek(&mut self, fd: i32, pos: u32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Seek, &[fd as u32, pos])
    }

    pub fn tell(&mut self, fd: i32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Tell, &[fd as u32])
    }

    pub fn close(&mut self, fd: i32) -> Result<i32, Stop> {
        self.syscall(SyscallNumber::Close, &[fd as u32])
    }
}
