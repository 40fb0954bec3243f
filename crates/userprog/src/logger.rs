//! TEAM_450: Console logger.
//!
//! Implements the `log::Log` trait to route log messages to the console
//! collaborator, one `putbuf` per record so lines from different threads
//! never interleave.

use alloc::format;

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use los_utils::{Once, RelaxStrategy};

use crate::console::Console;
use crate::kernel::Kernel;

/// Global logger instance
static LOGGER: ConsoleLogger = ConsoleLogger;

/// Console every record goes to, fixed by the first `init`.
static SINK: Once<&'static dyn Console> = Once::new();

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && SINK.is_completed()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = SINK.get() {
            let line = format!("{}\n", record.args());
            console.putbuf(line.as_bytes());
        }
    }

    fn flush(&self) {}
}

/// Initialize the logger.
///
/// The sink must outlive every log call. A kernel that owns its console logs
/// through [`Kernel::init_logger`] instead of handing over a second console.
///
/// # Arguments
/// * `console` - Where log lines are written.
/// * `max_level` - The maximum log level to display.
pub fn init(console: &'static dyn Console, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    SINK.call_once(|| console);
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}

impl<R: RelaxStrategy> Kernel<R> {
    /// TEAM_450: Send log records to this kernel's console.
    pub fn init_logger(&'static self, max_level: LevelFilter) -> Result<(), SetLoggerError> {
        init(self.console(), max_level)
    }
}
