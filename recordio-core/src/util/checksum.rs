use std::io::{Result, Write};

/// Forwards writes to `inner` while folding them into a CRC-32 (IEEE).
pub struct ChecksumForward<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
    pub counted: u64,
}

impl<W: Write> ChecksumForward<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            counted: 0,
        }
    }

    pub fn finish(self) -> (W, u32) {
        (self.inner, self.hasher.finalize())
    }
}

impl<W: Write> Write for ChecksumForward<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.counted += n as u64;
        Ok(n)
    }
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
