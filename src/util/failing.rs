//! In-memory writer that fails on demand

use std::io::{self, Cursor, Seek, SeekFrom, Write};

/// Cursor that breaks down once.
///
/// The `skip + 1`-th write whose buffer starts with `trigger` stores at
/// most `partial` bytes and then fails with `WriteZero`. Every other write
/// goes through.
pub struct FailOnce {
    inner: Cursor<Vec<u8>>,
    trigger: Vec<u8>,
    skip: usize,
    partial: usize,
    fired: bool,
}

impl FailOnce {
    pub fn new(trigger: &[u8], skip: usize, partial: usize) -> Self {
        FailOnce {
            inner: Cursor::new(Vec::new()),
            trigger: trigger.to_vec(),
            skip,
            partial,
            fired: false,
        }
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Write for FailOnce {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.fired && buf.starts_with(&self.trigger) {
            if self.skip == 0 {
                self.fired = true;
                let stored = self.partial.min(buf.len());
                self.inner.write_all(&buf[..stored])?;
                return Err(io::Error::new(io::ErrorKind::WriteZero, "device full"));
            }
            self.skip -= 1;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FailOnce {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
