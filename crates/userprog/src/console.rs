//! TEAM_450: Console collaborator.

/// TEAM_450: Console byte I/O.
pub trait Console: Send + Sync {
    /// Block until one byte of input is available and return it.
    fn getc(&self) -> u8;

    /// Write `buf` to the console as one uninterrupted unit.
    fn putbuf(&self, buf: &[u8]);
}
