use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChunkRow {
    pub ordinal: usize,
    /// Byte offset of the chunk header within the file.
    pub offset: u64,
    pub records: u32,
    /// Record number (file-local) of the chunk's first record.
    pub first_record: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub num_records: u64,
    pub num_chunks: usize,
    pub chunks: Vec<ChunkRow>,
}
