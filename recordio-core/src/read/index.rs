use crate::container::header::Header;
use crate::domain::{ChunkRow, IndexSummary};
use crate::error::{RecordIoError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Chunk offsets and record counts of one file, built from headers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    chunk_offsets: Vec<u64>,
    chunk_records: Vec<u32>,
    cumulative: Vec<u64>, // cumulative[i] = records in chunks 0..=i
}

impl Index {
    /// Walks the headers from the current position of `r`, seeking over each
    /// payload. Ending exactly at a header boundary is the normal way out.
    pub fn load<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let start = r.stream_position()?;
        let end = r.seek(SeekFrom::End(0))?;
        let mut offset = r.seek(SeekFrom::Start(start))?;

        let mut idx = Index::default();
        let mut accum = 0u64;
        while let Some(h) = Header::read_from(&mut *r)? {
            let next = r.seek(SeekFrom::Current(i64::from(h.compressed_size)))?;
            if next > end {
                return Err(RecordIoError::format(format!(
                    "chunk at offset {offset} declares {} payload bytes past end of file",
                    next - end
                )));
            }
            accum += u64::from(h.num_records);
            idx.chunk_offsets.push(offset);
            idx.chunk_records.push(h.num_records);
            idx.cumulative.push(accum);
            offset = next;
        }
        Ok(idx)
    }

    pub fn load_path(path: &Path) -> Result<Self> {
        let mut f = BufReader::new(File::open(path)?);
        let idx = Self::load(&mut f)?;
        debug!(
            path = %path.display(),
            chunks = idx.num_chunks(),
            records = idx.num_records(),
            "indexed file"
        );
        Ok(idx)
    }

    /// Builds an index from known chunk positions. Offsets must be strictly
    /// increasing.
    pub fn from_parts(chunk_offsets: Vec<u64>, chunk_records: Vec<u32>) -> Result<Self> {
        if chunk_offsets.len() != chunk_records.len() {
            return Err(RecordIoError::format(format!(
                "{} chunk offsets but {} record counts",
                chunk_offsets.len(),
                chunk_records.len()
            )));
        }
        if chunk_offsets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RecordIoError::format("chunk offsets must be strictly increasing"));
        }
        let cumulative = chunk_records
            .iter()
            .scan(0u64, |acc, &n| {
                *acc += u64::from(n);
                Some(*acc)
            })
            .collect();
        Ok(Self {
            chunk_offsets,
            chunk_records,
            cumulative,
        })
    }

    pub fn num_records(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn num_chunks(&self) -> usize {
        self.chunk_offsets.len()
    }

    /// Absolute byte offset of a chunk's header; `None` past the last chunk.
    pub fn chunk_offset(&self, chunk: usize) -> Option<u64> {
        self.chunk_offsets.get(chunk).copied()
    }

    pub fn chunk_records(&self, chunk: usize) -> Option<u32> {
        self.chunk_records.get(chunk).copied()
    }

    /// Maps a file-local record number to `(chunk, record within chunk)`.
    pub fn locate(&self, record: u64) -> Option<(usize, usize)> {
        let chunk = self.cumulative.partition_point(|&c| c <= record);
        if chunk >= self.num_chunks() {
            return None;
        }
        let prev = if chunk > 0 { self.cumulative[chunk - 1] } else { 0 };
        Some((chunk, (record - prev) as usize))
    }

    pub fn summary(&self) -> IndexSummary {
        let chunks = (0..self.num_chunks())
            .map(|i| ChunkRow {
                ordinal: i,
                offset: self.chunk_offsets[i],
                records: self.chunk_records[i],
                first_record: self.cumulative[i] - u64::from(self.chunk_records[i]),
            })
            .collect();
        IndexSummary {
            num_records: self.num_records(),
            num_chunks: self.num_chunks(),
            chunks,
        }
    }
}
