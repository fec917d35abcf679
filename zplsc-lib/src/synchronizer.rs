use std::io::{ErrorKind, Read};

use tracing::trace;

use crate::bytes::Bytes;
use crate::{Error, Result};

/// Delimiter marking the start of each profile record.
pub const DELIMITER: [u8; 2] = [0xfd, 0x02];

/// A synchronized record location.
#[derive(Debug, PartialEq)]
pub struct Loc {
    /// Offset (0-based) of the first byte after the delimiter.
    pub offset: usize,
    /// Number of bytes discarded before the delimiter was found.
    pub skipped: usize,
}

/// Synchronizer scans a byte stream for records indicated by [DELIMITER] and provides
/// access to the bytes following it.
///
/// Bytes that do not start a delimiter are discarded one at a time until the stream is
/// aligned again, so garbage or a partial record between two good records only costs the
/// bytes in between.
pub struct Synchronizer<R>
where
    R: Read + Send,
{
    bytes: Bytes<R>,
    // Bytes discarded by the most recent scan
    skipped: usize,
}

impl<R> Synchronizer<R>
where
    R: Read + Send,
{
    pub fn new(reader: R) -> Self {
        Synchronizer {
            bytes: Bytes::new(reader),
            skipped: 0,
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        match self.bytes.next() {
            Ok(b) => Ok(Some(b)),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Scan the stream until the next delimiter and return a [Loc] positioned immediately
    /// after it. At end-of-stream returns `Ok(None)`.
    ///
    /// Use [Synchronizer::skipped] to find out how many bytes were discarded, which is also
    /// set when the scan ran into the end of the stream.
    ///
    /// # Errors
    /// [Error::Io] for any read error other than end-of-stream.
    pub fn scan(&mut self) -> Result<Option<Loc>> {
        self.skipped = 0;

        let mut window: Vec<u8> = Vec::with_capacity(DELIMITER.len());
        while window.len() < DELIMITER.len() {
            match self.next_byte()? {
                Some(b) => window.push(b),
                None => break,
            }
        }

        while !window.is_empty() && window[..] != DELIMITER[..] {
            window.remove(0);
            self.skipped += 1;
            if let Some(b) = self.next_byte()? {
                window.push(b);
            }
        }

        if self.skipped > 0 {
            trace!(
                skipped = self.skipped,
                offset = self.bytes.offset(),
                "discarded misaligned bytes"
            );
        }

        if window.is_empty() {
            return Ok(None);
        }

        Ok(Some(Loc {
            offset: self.bytes.offset(),
            skipped: self.skipped,
        }))
    }

    /// Number of bytes discarded by the most recent [Synchronizer::scan].
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Fill `buf` from the bytes following the current position. Returns `false` if the
    /// stream ended before `buf` could be filled.
    ///
    /// # Errors
    /// [Error::Io] on read errors.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<bool> {
        Ok(self.bytes.fill(buf)?)
    }

    /// Up to `n` of the next bytes, fewer only at end-of-stream. Nothing is consumed.
    ///
    /// # Errors
    /// [Error::Io] on read errors.
    pub fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        let next = self.bytes.read(n)?;
        self.bytes.push(&next);
        Ok(next)
    }

    /// Push bytes back such that `dat[0]` is the next byte read or scanned.
    pub fn push(&mut self, dat: &[u8]) {
        self.bytes.push(dat);
    }

    /// Read up to `n` bytes; fewer only at end-of-stream.
    ///
    /// # Errors
    /// [Error::Io] on read errors.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.bytes.read(n)?)
    }

    /// Current offset into the stream.
    pub fn offset(&self) -> usize {
        self.bytes.offset()
    }
}
