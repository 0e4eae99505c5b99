#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod options;

pub mod util {
    pub mod checksum;
}

pub mod codec;

pub mod container {
    pub mod chunk;
    pub mod header;
}

pub mod write {
    pub mod writer;
}

pub mod read {
    pub mod index;
    pub mod scanner;
    pub mod verify;
}

pub mod filelist;
pub mod handles;

// Re-exports: stable API surface
pub use codec::CodecId;
pub use domain::{ChunkRow, IndexSummary};
pub use error::{RecordIoError, Result};
pub use filelist::FileList;
pub use filelist::scanner::FileListScanner;
pub use options::{ScanOptions, WriterOptions};
pub use read::index::Index;
pub use read::scanner::{Records, ScanState, Scanner};
pub use read::verify::verify;
pub use write::writer::Writer;
