use super::FileList;
use crate::container::chunk::read_chunk;
use crate::error::{RecordIoError, Result};
use crate::options::ScanOptions;
use crate::read::scanner::clamp_window;
use flume::{Receiver, SendTimeoutError, Sender};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// How long a producer blocked on a full channel waits before re-checking
/// the stop flag.
const STOP_POLL: Duration = Duration::from_millis(20);

/// Streams records `[start, start + len)` of a `FileList`, in global order,
/// from one background thread into a bounded channel.
///
/// The channel closes exactly once, when the producer exits. Whether it
/// exited cleanly is known from `join` (or `finish`) afterwards.
pub struct FileListScanner {
    rx: Receiver<Vec<u8>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<u64>>>,
    outcome: Option<Result<u64>>,
    start: u64,
    end: u64,
}

impl FileListScanner {
    pub fn new(fl: Arc<FileList>, start: i64, len: i64) -> Result<Self> {
        Self::with_options(fl, start, len, &ScanOptions::default())
    }

    pub fn with_options(
        fl: Arc<FileList>,
        start: i64,
        len: i64,
        opts: &ScanOptions,
    ) -> Result<Self> {
        let (start, end) = clamp_window(start, len, fl.total_records());
        let (tx, rx) = flume::bounded(opts.channel_capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));

        let producer = Producer {
            fl,
            tx,
            stop: stop.clone(),
        };
        let worker = std::thread::Builder::new()
            .name("recordio-scan".into())
            .spawn(move || producer.run(start, end))?;

        Ok(Self {
            rx,
            stop,
            worker: Some(worker),
            outcome: None,
            start,
            end,
        })
    }

    pub fn receiver(&self) -> &Receiver<Vec<u8>> {
        &self.rx
    }

    /// Blocking iterator over the records; ends when the channel closes.
    pub fn iter(&self) -> flume::Iter<'_, Vec<u8>> {
        self.rx.iter()
    }

    pub fn window(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    /// Asks the producer to stop before its next emission. Records already
    /// in the channel stay readable.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Waits for the producer to exit and returns the error that ended the
    /// scan, if any. Only call this once the channel has been drained or
    /// `stop` was requested, or it waits for a consumer that never comes.
    pub fn join(&mut self) -> Option<&RecordIoError> {
        if let Some(worker) = self.worker.take() {
            let outcome = worker.join().unwrap_or_else(|_| {
                Err(std::io::Error::other("scan worker panicked").into())
            });
            self.outcome = Some(outcome);
        }
        self.outcome.as_ref().and_then(|o| o.as_ref().err())
    }

    /// Waits for the producer and returns how many records it emitted.
    pub fn finish(mut self) -> Result<u64> {
        self.join();
        self.outcome.take().unwrap_or(Ok(0))
    }
}

impl Drop for FileListScanner {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
            self.join();
        }
    }
}

struct Producer {
    fl: Arc<FileList>,
    tx: Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
}

impl Producer {
    // Consumes self so the sender drops, closing the channel, on every exit.
    fn run(self, start: u64, end: u64) -> Result<u64> {
        let res = self.scan(start, end);
        match &res {
            Ok(n) => debug!(records = n, "file list scan complete"),
            Err(RecordIoError::Stopped) => debug!("file list scan stopped"),
            Err(e) => warn!(error = %e, "file list scan failed"),
        }
        res
    }

    fn scan(&self, start: u64, end: u64) -> Result<u64> {
        if start >= end {
            return Ok(0);
        }
        let Some((mut file, mut chunk, mut record)) = self.fl.locate(start) else {
            return Ok(0);
        };
        let mut todo = end - start;
        let mut done = 0u64;
        while todo > 0 {
            if file >= self.fl.num_files() {
                return Err(RecordIoError::format(format!(
                    "file list ran out of records with {todo} still expected"
                )));
            }
            let n = self.scan_file(file, chunk, record, todo)?;
            todo -= n;
            done += n;
            file += 1;
            // From the second file on, read from its first record.
            chunk = 0;
            record = 0;
        }
        Ok(done)
    }

    /// Emits at most `todo` records of `file`, beginning at `record` of
    /// `chunk`. Returns how many were emitted.
    fn scan_file(&self, file: usize, chunk: usize, mut record: usize, mut todo: u64) -> Result<u64> {
        let (Some(idx), Some(path)) = (self.fl.index(file), self.fl.file(file)) else {
            return Ok(0);
        };
        let Some(offset) = idx.chunk_offset(chunk) else {
            return Ok(0);
        };
        let mut f = BufReader::new(File::open(path)?);
        f.seek(SeekFrom::Start(offset))?;

        let mut done = 0u64;
        for ci in chunk..idx.num_chunks() {
            if todo == 0 {
                break;
            }
            let (_, records) = read_chunk(&mut f)?.ok_or_else(|| {
                RecordIoError::format(format!(
                    "{} ended before chunk {ci} of {}",
                    path.display(),
                    idx.num_chunks()
                ))
            })?;
            let declared = idx.chunk_records(ci).unwrap_or(0) as usize;
            if records.len() != declared {
                return Err(RecordIoError::format(format!(
                    "{} chunk {ci}: decoded {} records, index says {declared}",
                    path.display(),
                    records.len()
                )));
            }
            for r in records.into_iter().skip(record) {
                if todo == 0 {
                    break;
                }
                self.emit(r)?;
                done += 1;
                todo -= 1;
            }
            record = 0;
        }
        Ok(done)
    }

    fn emit(&self, mut record: Vec<u8>) -> Result<()> {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return Err(RecordIoError::Stopped);
            }
            match self.tx.send_timeout(record, STOP_POLL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(r)) => record = r,
                // Nobody is listening any more.
                Err(SendTimeoutError::Disconnected(_)) => return Err(RecordIoError::Stopped),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filelist::tests::synthesize;

    fn expected(nfiles: usize) -> Vec<Vec<u8>> {
        (0..nfiles)
            .flat_map(|i| (0..i).map(|j| vec![j as u8; j * 10]))
            .collect()
    }

    #[test]
    fn streams_everything_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let fl = Arc::new(FileList::new(synthesize(dir.path(), 10)).unwrap());
        let mut s = FileListScanner::new(fl, -1, -1).unwrap();
        let got: Vec<Vec<u8>> = s.iter().collect();
        assert_eq!(got, expected(10));
        assert!(s.join().is_none());
        assert_eq!(s.finish().unwrap(), 45);
    }

    #[test]
    fn streams_a_window_spanning_files() {
        let dir = tempfile::tempdir().unwrap();
        let fl = Arc::new(FileList::new(synthesize(dir.path(), 10)).unwrap());
        for (start, len) in [(0i64, 1i64), (2, 5), (5, 30), (44, 10), (45, 3)] {
            let s = FileListScanner::new(fl.clone(), start, len).unwrap();
            let got: Vec<Vec<u8>> = s.iter().collect();
            let all = expected(10);
            let from = (start as usize).min(all.len());
            let to = (from + len as usize).min(all.len());
            assert_eq!(got, all[from..to].to_vec(), "window {start}+{len}");
            assert_eq!(s.finish().unwrap(), (to - from) as u64);
        }
    }

    #[test]
    fn stop_closes_the_channel_and_reports_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let fl = Arc::new(FileList::new(synthesize(dir.path(), 40)).unwrap());
        let total = fl.total_records();
        let opts = ScanOptions {
            channel_capacity: 2,
        };
        let mut s = FileListScanner::with_options(fl, 0, -1, &opts).unwrap();

        let mut seen = 0u64;
        for _ in 0..3 {
            s.receiver().recv().unwrap();
            seen += 1;
        }
        s.stop();
        seen += s.iter().count() as u64;

        assert!(seen < total);
        // at most one in-flight send completes after the consumer's last recv
        assert!(seen <= 3 + opts.channel_capacity as u64 + 1);
        assert!(matches!(s.join(), Some(RecordIoError::Stopped)));
    }

    #[test]
    fn dropping_an_undrained_scanner_does_not_hang() {
        let dir = tempfile::tempdir().unwrap();
        let fl = Arc::new(FileList::new(synthesize(dir.path(), 20)).unwrap());
        let opts = ScanOptions {
            channel_capacity: 1,
        };
        let s = FileListScanner::with_options(fl, 0, -1, &opts).unwrap();
        assert!(s.receiver().recv().is_ok());
        drop(s);
    }

    #[test]
    fn corrupt_file_ends_scan_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = synthesize(dir.path(), 6);
        let fl = Arc::new(FileList::new(files.clone()).unwrap());

        // flip a payload byte of file 2's only chunk after indexing
        let mut bytes = std::fs::read(&files[2]).unwrap();
        let n = bytes.len();
        bytes[n - 1] ^= 0xff;
        std::fs::write(&files[2], bytes).unwrap();

        let mut s = FileListScanner::new(fl, 0, -1).unwrap();
        let got = s.iter().count();
        // only file 1's single record precedes the damage
        assert_eq!(got, 1);
        assert!(matches!(s.join(), Some(RecordIoError::Integrity { .. })));
    }
}
