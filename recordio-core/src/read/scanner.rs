use super::index::Index;
use crate::container::chunk::read_chunk;
use crate::error::{RecordIoError, Result};
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    BeforeStart,
    Positioned,
    Exhausted,
}

/// Random-access reader over the records `[start, start + len)` of a file.
///
/// The chunk holding the cursor is decoded whole the first time one of its
/// records is needed and kept until the cursor leaves it.
pub struct Scanner<R> {
    reader: R,
    index: Arc<Index>,
    start: u64,
    end: u64,
    cur: u64,
    slot: usize,
    chunk_index: Option<usize>,
    records: Vec<Vec<u8>>,
    state: ScanState,
    err: Option<RecordIoError>,
}

/// Resolves a signed `(start, len)` window against `total` records. A
/// negative start means 0; a negative or overflowing length means "to the end".
pub(crate) fn clamp_window(start: i64, len: i64, total: u64) -> (u64, u64) {
    let start = u64::try_from(start).unwrap_or(0).min(total);
    let end = match u64::try_from(len) {
        Ok(len) => start.saturating_add(len).min(total),
        Err(_) => total,
    };
    (start, end)
}

impl<R: Read + Seek> Scanner<R> {
    pub fn new(reader: R, index: Arc<Index>, start: i64, len: i64) -> Self {
        let (start, end) = clamp_window(start, len, index.num_records());
        Self {
            reader,
            index,
            start,
            end,
            cur: start,
            slot: 0,
            chunk_index: None,
            records: Vec::new(),
            state: ScanState::BeforeStart,
            err: None,
        }
    }

    /// Advances the cursor by one record. Returns `false` once the window is
    /// exhausted or a chunk fails to load; `error` then tells which.
    pub fn scan(&mut self) -> bool {
        let next = match self.state {
            ScanState::Exhausted => return false,
            ScanState::BeforeStart => self.start,
            ScanState::Positioned => self.cur + 1,
        };
        self.cur = next;
        if next >= self.end {
            self.state = ScanState::Exhausted;
            return false;
        }
        match self.position_at(next) {
            Ok(slot) => {
                self.slot = slot;
                self.state = ScanState::Positioned;
                true
            }
            Err(e) => {
                self.err = Some(e);
                self.state = ScanState::Exhausted;
                false
            }
        }
    }

    fn position_at(&mut self, record: u64) -> Result<usize> {
        let (ci, slot) = self.index.locate(record).ok_or_else(|| {
            RecordIoError::format(format!("record {record} is outside the index"))
        })?;
        if self.chunk_index != Some(ci) {
            self.chunk_index = None;
            let offset = self.index.chunk_offset(ci).ok_or_else(|| {
                RecordIoError::format(format!("chunk {ci} is outside the index"))
            })?;
            self.reader.seek(SeekFrom::Start(offset))?;
            let (_, records) = read_chunk(&mut self.reader)?.ok_or_else(|| {
                RecordIoError::format(format!("chunk {ci} vanished from the file"))
            })?;
            let declared = self.index.chunk_records(ci).unwrap_or(0) as usize;
            if records.len() != declared {
                return Err(RecordIoError::format(format!(
                    "chunk {ci} holds {} records, index says {declared}",
                    records.len()
                )));
            }
            trace!(chunk = ci, records = declared, "loaded chunk");
            self.records = records;
            self.chunk_index = Some(ci);
        }
        Ok(slot)
    }

    /// The record under the cursor. Only meaningful after `scan` returned
    /// `true`; otherwise an empty slice.
    pub fn record(&self) -> &[u8] {
        match self.state {
            ScanState::Positioned => &self.records[self.slot],
            _ => &[],
        }
    }

    /// The error that ended the scan; `None` after a clean exhaustion.
    pub fn error(&self) -> Option<&RecordIoError> {
        self.err.as_ref()
    }

    /// Moves the latched error out, leaving `None` behind.
    pub fn take_error(&mut self) -> Option<RecordIoError> {
        self.err.take()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// File-local number of the record under the cursor.
    pub fn position(&self) -> Option<u64> {
        (self.state == ScanState::Positioned).then_some(self.cur)
    }

    pub fn window(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Borrowing iterator over a scanner's remaining records. A failure is
/// yielded once, after which the iterator is fused.
pub struct Records<'a, R> {
    scanner: &'a mut Scanner<R>,
}

impl<R: Read + Seek> Scanner<R> {
    pub fn records(&mut self) -> Records<'_, R> {
        Records { scanner: self }
    }
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.scanner.scan() {
            return Some(Ok(self.scanner.record().to_vec()));
        }
        self.scanner.take_error().map(Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecId;
    use crate::options::WriterOptions;
    use crate::write::writer::Writer;
    use std::io::Cursor;

    fn file(n: usize, max_chunk: usize) -> Vec<u8> {
        let opts = WriterOptions::default()
            .with_max_chunk_bytes(max_chunk)
            .with_compressor(CodecId::Snappy);
        let mut w = Writer::new(Vec::new(), opts);
        for i in 0..n {
            w.write(format!("record-{i:03}").as_bytes()).unwrap();
        }
        w.into_inner().unwrap()
    }

    fn scanner(buf: &[u8], start: i64, len: i64) -> Scanner<Cursor<&[u8]>> {
        let idx = Index::load(&mut Cursor::new(buf)).unwrap();
        Scanner::new(Cursor::new(buf), Arc::new(idx), start, len)
    }

    #[test]
    fn window_clamping() {
        assert_eq!(clamp_window(-5, -1, 10), (0, 10));
        assert_eq!(clamp_window(3, 4, 10), (3, 7));
        assert_eq!(clamp_window(3, 100, 10), (3, 10));
        assert_eq!(clamp_window(12, 2, 10), (10, 10));
        assert_eq!(clamp_window(5, i64::MAX, 10), (5, 10));
    }

    #[test]
    fn scans_a_middle_range_across_chunks() {
        let buf = file(30, 25);
        let mut s = scanner(&buf, 7, 11);
        assert_eq!(s.state(), ScanState::BeforeStart);
        assert!(s.record().is_empty());

        let mut seen = Vec::new();
        while s.scan() {
            seen.push(String::from_utf8(s.record().to_vec()).unwrap());
        }
        let want: Vec<String> = (7..18).map(|i| format!("record-{i:03}")).collect();
        assert_eq!(seen, want);
        assert_eq!(s.state(), ScanState::Exhausted);
        assert!(s.error().is_none());
        assert!(!s.scan());
    }

    #[test]
    fn start_past_end_is_immediately_exhausted() {
        let buf = file(5, 1024);
        let mut s = scanner(&buf, 9, -1);
        assert!(!s.scan());
        assert!(s.error().is_none());
    }

    #[test]
    fn corrupt_chunk_latches_integrity_error() {
        let mut buf = file(10, 1 << 20);
        let last = buf.len() - 1;
        buf[last] ^= 0x10;
        let mut s = scanner(&buf, 0, -1);
        assert!(!s.scan());
        assert!(matches!(s.error(), Some(RecordIoError::Integrity { .. })));
        assert!(!s.scan());
    }

    #[test]
    fn iterator_reports_error_once() {
        let mut buf = file(3, 1 << 20);
        let last = buf.len() - 1;
        buf[last] ^= 0x01;
        let mut s = scanner(&buf, 0, -1);
        let items: Vec<_> = s.records().collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert_eq!(s.state(), ScanState::Exhausted);
        assert!(s.records().next().is_none());
    }
}
