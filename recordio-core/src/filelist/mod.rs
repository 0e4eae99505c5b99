use crate::error::Result;
use crate::read::index::Index;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod scanner;

/// An ordered set of files viewed as one contiguous record space.
///
/// Global numbering depends on the order of `files`: two lists over the
/// same files in a different order number records differently.
#[derive(Debug, Clone)]
pub struct FileList {
    files: Vec<PathBuf>,
    indices: Vec<Arc<Index>>,
    cumulative: Vec<u64>, // cumulative[i] = records in files 0..=i
}

impl FileList {
    /// Indexes every file in parallel. Any file failing fails the list.
    pub fn new<I, P>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        let indices = files
            .par_iter() // In parallel, each file independent
            .map(|path| {
                Index::load_path(path).map(Arc::new).inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "index build failed");
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let cumulative = indices
            .iter()
            .scan(0u64, |acc, idx| {
                *acc += idx.num_records();
                Some(*acc)
            })
            .collect();

        let fl = Self {
            files,
            indices,
            cumulative,
        };
        debug!(
            files = fl.num_files(),
            records = fl.total_records(),
            "built file list"
        );
        Ok(fl)
    }

    pub fn total_records(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn num_files(&self) -> usize {
        self.files.len()
    }

    pub fn file(&self, i: usize) -> Option<&Path> {
        self.files.get(i).map(PathBuf::as_path)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn index(&self, i: usize) -> Option<&Arc<Index>> {
        self.indices.get(i)
    }

    /// Maps a global record number to `(file, chunk, record within chunk)`.
    pub fn locate(&self, record: u64) -> Option<(usize, usize, usize)> {
        let file = self.cumulative.partition_point(|&c| c <= record);
        if file >= self.num_files() {
            return None;
        }
        let prev = if file > 0 { self.cumulative[file - 1] } else { 0 };
        let (chunk, slot) = self.indices[file].locate(record - prev)?;
        Some((file, chunk, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecId;
    use crate::error::RecordIoError;
    use crate::options::WriterOptions;
    use crate::write::writer::Writer;
    use std::fs::File;
    use std::io::BufWriter;

    /// File `i` holds `i` records; record `j` is `j * 10` bytes long.
    pub(crate) fn synthesize(dir: &Path, nfiles: usize) -> Vec<PathBuf> {
        let opts = WriterOptions::default()
            .with_max_chunk_bytes(10 * nfiles)
            .with_compressor(CodecId::Snappy);
        (0..nfiles)
            .map(|i| {
                let path = dir.join(format!("{i:05}.recordio"));
                let mut w = Writer::new(BufWriter::new(File::create(&path).unwrap()), opts.clone());
                for j in 0..i {
                    assert_eq!(w.write(&vec![j as u8; j * 10]).unwrap(), j * 10);
                }
                w.close().unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn totals_and_locate() {
        let dir = tempfile::tempdir().unwrap();
        let files = synthesize(dir.path(), 10);
        let fl = FileList::new(files.clone()).unwrap();
        assert_eq!(fl.num_files(), 10);
        assert_eq!(fl.total_records(), 45);
        for (i, _) in files.iter().enumerate() {
            assert_eq!(fl.index(i).unwrap().num_records(), i as u64);
        }

        // file 0 is empty, so record 0 is the first record of file 1
        assert_eq!(fl.locate(0), Some((1, 0, 0)));
        assert_eq!(fl.locate(1), Some((2, 0, 0)));
        assert_eq!(fl.locate(2), Some((2, 0, 1)));
        assert_eq!(fl.locate(44).map(|(f, _, _)| f), Some(9));
        assert_eq!(fl.locate(45), None);
        assert!(fl.index(10).is_none());
        assert!(fl.file(10).is_none());
        assert_eq!(fl.file(3), Some(files[3].as_path()));
    }

    #[test]
    fn one_bad_file_fails_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = synthesize(dir.path(), 3);
        let bad = dir.path().join("bad.recordio");
        std::fs::write(&bad, b"definitely not a header").unwrap();
        files.push(bad);
        assert!(matches!(FileList::new(files), Err(RecordIoError::Format(_))));

        let missing = vec![dir.path().join("nope.recordio")];
        assert!(matches!(FileList::new(missing), Err(RecordIoError::Io(_))));
    }

    #[test]
    fn empty_list() {
        let fl = FileList::new(Vec::<PathBuf>::new()).unwrap();
        assert_eq!(fl.total_records(), 0);
        assert_eq!(fl.locate(0), None);
    }
}
