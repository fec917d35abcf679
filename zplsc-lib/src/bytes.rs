use std::io::{self, ErrorKind, Read};

/// Bytes provides forward-only reads from a reader with the ability to push bytes back
/// if they are not needed, i.e., peek-and-push. The original order of the bytes is
/// preserved when pushing bytes back.
pub struct Bytes<R>
where
    R: Read + Send,
{
    reader: R,
    num_read: usize,
    // Pushed back bytes, last element is the next byte out
    cache: Vec<u8>,
}

impl<R> Bytes<R>
where
    R: Read + Send,
{
    pub fn new(reader: R) -> Self {
        Bytes {
            reader,
            num_read: 0,
            cache: Vec::new(),
        }
    }

    /// Read as many bytes as are available up to `buf.len()`, returning the number read.
    /// Only returns less than `buf.len()` at end-of-stream.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            if let Some(b) = self.cache.pop() {
                buf[n] = b;
                n += 1;
                continue;
            }
            match self.reader.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(k) => {
                    n += k;
                    self.num_read += k;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(n)
    }

    /// Next single byte.
    ///
    /// # Errors
    /// [ErrorKind::UnexpectedEof] at end-of-stream, otherwise any error from the reader.
    pub fn next(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        if self.read_available(&mut buf)? == 0 {
            return Err(io::Error::from(ErrorKind::UnexpectedEof));
        }
        Ok(buf[0])
    }

    /// Read the next `n` bytes. Fewer than `n` bytes are returned only at end-of-stream.
    ///
    /// # Errors
    /// Any error from the reader.
    pub fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let got = self.read_available(&mut buf)?;
        buf.truncate(got);
        Ok(buf)
    }

    /// Fill `buf` completely. Returns `false` if the stream ended first, in which case
    /// the remaining bytes have been consumed and the contents of `buf` are partial.
    ///
    /// # Errors
    /// Any error from the reader.
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        Ok(self.read_available(buf)? == buf.len())
    }

    /// Push bytes back such that `dat[0]` is the next byte read.
    pub fn push(&mut self, dat: &[u8]) {
        self.cache.extend(dat.iter().rev());
    }

    /// Logical offset into the stream, i.e., bytes read less bytes pushed back.
    pub fn offset(&self) -> usize {
        self.num_read - self.cache.len()
    }
}
