use crate::codec::CodecId;
use serde::{Deserialize, Serialize};

/// Raw record bytes per chunk before a flush is forced.
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 32 * 1024 * 1024;

/// Records buffered between a streaming scan's producer and its consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterOptions {
    /// Upper bound on the summed record lengths of one chunk, excluding the
    /// per-record length prefixes. 0 means the default.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
    #[serde(default = "default_compressor")]
    pub compressor: CodecId,
    /// Codec level; negative picks the codec's default.
    #[serde(default = "default_level")]
    pub level: i32,
}

fn default_max_chunk_bytes() -> usize {
    DEFAULT_MAX_CHUNK_BYTES
}

fn default_compressor() -> CodecId {
    CodecId::Snappy
}

fn default_level() -> i32 {
    -1
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            compressor: default_compressor(),
            level: default_level(),
        }
    }
}

impl WriterOptions {
    pub fn with_compressor(mut self, compressor: CodecId) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn with_max_chunk_bytes(mut self, max_chunk_bytes: usize) -> Self {
        self.max_chunk_bytes = max_chunk_bytes;
        self
    }

    pub(crate) fn effective_max_chunk_bytes(&self) -> usize {
        if self.max_chunk_bytes == 0 {
            DEFAULT_MAX_CHUNK_BYTES
        } else {
            self.max_chunk_bytes
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
