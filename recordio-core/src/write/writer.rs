use crate::container::chunk::Chunk;
use crate::error::{RecordIoError, Result};
use crate::options::WriterOptions;
use std::io::Write;
use tracing::{debug, warn};

/// Appends records to a sink, batching them into compressed chunks.
///
/// Every chunk written holds at most `max_chunk_bytes` of raw record bytes.
/// The writer owns the sink for its whole life; `into_inner` hands it back.
pub struct Writer<W: Write> {
    sink: Option<W>,
    chunk: Chunk,
    opts: WriterOptions,
    max_chunk_bytes: usize,
    closed: bool,
    // Set by the first failed flush; the sink may hold a partial chunk.
    failed: Option<String>,
    chunks_written: u64,
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, opts: WriterOptions) -> Self {
        let max_chunk_bytes = opts.effective_max_chunk_bytes();
        Self {
            sink: Some(sink),
            chunk: Chunk::new(),
            opts,
            max_chunk_bytes,
            closed: false,
            failed: None,
            chunks_written: 0,
        }
    }

    /// Buffers one record, flushing the pending chunk first if the record
    /// would push it past the budget. Returns the number of bytes accepted.
    pub fn write(&mut self, record: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(RecordIoError::Closed);
        }
        self.check_failed()?;
        if record.len() >= self.max_chunk_bytes {
            return Err(RecordIoError::Oversize {
                len: record.len(),
                max: self.max_chunk_bytes,
            });
        }
        if self.chunk.num_bytes() + record.len() > self.max_chunk_bytes {
            self.flush_chunk()?;
        }
        self.chunk.add(record.to_vec());
        Ok(record.len())
    }

    /// Flushes whatever is pending and rejects further writes. Closing twice
    /// is a no-op, unless an earlier flush failed.
    pub fn close(&mut self) -> Result<()> {
        self.check_failed()?;
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.flush_chunk()?;
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush() {
                self.failed = Some(e.to_string());
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// True once a flush to the sink has failed. Such a writer refuses all
    /// further writes and closes.
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    fn check_failed(&self) -> Result<()> {
        match &self.failed {
            Some(msg) => Err(RecordIoError::Poisoned(msg.clone())),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }

    pub fn options(&self) -> &WriterOptions {
        &self.opts
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    /// Closes the writer and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        self.sink.take().ok_or(RecordIoError::Closed)
    }

    fn flush_chunk(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let pending = self.chunk.len();
        let raw = self.chunk.num_bytes();
        let written = self
            .chunk
            .write_to(sink, self.opts.compressor, self.opts.level)
            .inspect_err(|e| self.failed = Some(e.to_string()))?;
        if let Some(h) = written {
            self.chunks_written += 1;
            debug!(
                records = pending,
                raw_bytes = raw,
                compressed_bytes = h.compressed_size,
                codec = %self.opts.compressor,
                "flushed chunk"
            );
        }
        Ok(())
    }
}

impl<W: Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.closed || self.failed.is_some() || self.sink.is_none() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(error = %e, "writer dropped without close; final chunk lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecId;
    use crate::container::chunk::read_chunk;

    fn opts(max: usize) -> WriterOptions {
        WriterOptions::default()
            .with_max_chunk_bytes(max)
            .with_compressor(CodecId::None)
    }

    fn chunks_of(buf: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let mut r = buf;
        let mut out = Vec::new();
        while let Some((_, records)) = read_chunk(&mut r).unwrap() {
            out.push(records);
        }
        out
    }

    #[test]
    fn close_without_writes_emits_nothing() {
        let w = Writer::new(Vec::new(), opts(10));
        let buf = w.into_inner().unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn write_after_close_is_rejected() {
        let mut w = Writer::new(Vec::new(), opts(10));
        w.write(b"abc").unwrap();
        w.close().unwrap();
        assert!(matches!(w.write(b"x"), Err(RecordIoError::Closed)));
        // second close is harmless
        w.close().unwrap();
        assert_eq!(chunks_of(&w.into_inner().unwrap()).len(), 1);
    }

    #[test]
    fn record_at_or_over_budget_is_rejected() {
        let mut w = Writer::new(Vec::new(), opts(10));
        assert!(matches!(
            w.write(&[0u8; 10]),
            Err(RecordIoError::Oversize { len: 10, max: 10 })
        ));
        assert_eq!(w.write(&[0u8; 9]).unwrap(), 9);
    }

    #[test]
    fn chunks_never_exceed_budget() {
        let mut w = Writer::new(Vec::new(), opts(10));
        for len in [3usize, 4, 3, 1, 9, 0, 0, 5, 5, 6] {
            assert_eq!(w.write(&vec![1u8; len]).unwrap(), len);
        }
        let buf = w.into_inner().unwrap();
        let chunks = chunks_of(&buf);
        let sizes: Vec<usize> = chunks
            .iter()
            .map(|c| c.iter().map(Vec::len).sum())
            .collect();
        assert_eq!(sizes, vec![10, 10, 10, 6]);
        assert!(sizes.iter().all(|&s| s <= 10));
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 10);
    }

    #[test]
    fn zero_budget_falls_back_to_default() {
        let w = Writer::new(Vec::new(), opts(0));
        assert_eq!(
            w.max_chunk_bytes,
            crate::options::DEFAULT_MAX_CHUNK_BYTES
        );
    }

    /// Accepts `budget` bytes, then fails every write.
    struct ShortSink {
        buf: Vec<u8>,
        budget: usize,
    }

    impl Write for ShortSink {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                return Err(std::io::Error::other("disk full"));
            }
            let n = data.len().min(self.budget);
            self.buf.extend_from_slice(&data[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_flush_poisons_writer() {
        let sink = ShortSink { buf: Vec::new(), budget: 22 };
        let mut w = Writer::new(sink, opts(10));
        w.write(b"abcdefgh").unwrap();
        // forces the first chunk out; only its header and two payload bytes land
        assert!(matches!(w.write(b"ijklmnop"), Err(RecordIoError::Io(_))));
        assert!(w.is_failed());
        assert!(matches!(w.write(b"qr"), Err(RecordIoError::Poisoned(_))));
        assert!(matches!(w.close(), Err(RecordIoError::Poisoned(_))));
        assert!(matches!(w.close(), Err(RecordIoError::Poisoned(_))));
        let Some(sink) = w.get_ref() else {
            panic!("sink still owned by writer");
        };
        assert_eq!(sink.buf.len(), 22);
    }

    #[test]
    fn drop_flushes_pending_chunk() {
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf, opts(100));
            w.write(b"kept").unwrap();
        }
        assert_eq!(chunks_of(&buf), vec![vec![b"kept".to_vec()]]);
    }
}
