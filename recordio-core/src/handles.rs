//! Handle arena for callers that cannot hold Rust values directly, such as
//! foreign-language bindings. Each operation is a thin shim over the typed
//! API; handles are opaque integers and are never reused.

use crate::error::{RecordIoError, Result};
use crate::options::WriterOptions;
use crate::read::index::Index;
use crate::read::scanner::Scanner;
use crate::write::writer::Writer;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type Handle = u64;

enum Resource {
    Writer(Writer<BufWriter<File>>),
    Index(Arc<Index>),
    Scanner(Scanner<BufReader<File>>),
}

#[derive(Default)]
struct Slots {
    next: Handle,
    map: HashMap<Handle, Resource>,
}

#[derive(Default)]
pub struct Registry {
    slots: Mutex<Slots>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }

    fn insert(&self, r: Resource) -> Result<Handle> {
        let mut slots = self.lock()?;
        let h = slots.next;
        slots.next += 1;
        slots.map.insert(h, r);
        Ok(h)
    }

    pub fn create_writer(&self, path: &Path, opts: WriterOptions) -> Result<Handle> {
        let f = File::create(path)?;
        self.insert(Resource::Writer(Writer::new(BufWriter::new(f), opts)))
    }

    pub fn write(&self, h: Handle, record: &[u8]) -> Result<usize> {
        match self.lock()?.map.get_mut(&h) {
            Some(Resource::Writer(w)) => w.write(record),
            _ => Err(RecordIoError::UnknownHandle(h)),
        }
    }

    /// Flushes and closes a writer; the handle stays valid until released.
    pub fn close(&self, h: Handle) -> Result<()> {
        match self.lock()?.map.get_mut(&h) {
            Some(Resource::Writer(w)) => w.close(),
            _ => Err(RecordIoError::UnknownHandle(h)),
        }
    }

    pub fn build_index(&self, path: &Path) -> Result<Handle> {
        let idx = Index::load_path(path)?;
        self.insert(Resource::Index(Arc::new(idx)))
    }

    pub fn index_record_count(&self, h: Handle) -> Result<u64> {
        match self.lock()?.map.get(&h) {
            Some(Resource::Index(idx)) => Ok(idx.num_records()),
            _ => Err(RecordIoError::UnknownHandle(h)),
        }
    }

    pub fn create_scanner(&self, path: &Path, index: Handle, start: i64, len: i64) -> Result<Handle> {
        let idx = match self.lock()?.map.get(&index) {
            Some(Resource::Index(idx)) => idx.clone(),
            _ => return Err(RecordIoError::UnknownHandle(index)),
        };
        let f = BufReader::new(File::open(path)?);
        self.insert(Resource::Scanner(Scanner::new(f, idx, start, len)))
    }

    /// Next record of a scanner, `None` once it is exhausted.
    pub fn read_next(&self, h: Handle) -> Result<Option<Vec<u8>>> {
        match self.lock()?.map.get_mut(&h) {
            Some(Resource::Scanner(s)) => s.records().next().transpose(),
            _ => Err(RecordIoError::UnknownHandle(h)),
        }
    }

    /// Drops a resource. Releasing a writer closes it first.
    pub fn release(&self, h: Handle) -> Result<()> {
        let res = self
            .lock()?
            .map
            .remove(&h)
            .ok_or(RecordIoError::UnknownHandle(h))?;
        if let Resource::Writer(mut w) = res {
            w.close()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
