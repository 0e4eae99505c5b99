use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Checksum mismatch: header {expected:#010x}, payload {actual:#010x}")]
    Integrity { expected: u32, actual: u32 },

    #[error("Cannot write since writer has been closed")]
    Closed,

    #[error("Writer failed earlier, output is incomplete: {0}")]
    Poisoned(String),

    #[error("Record of {len} bytes does not fit chunk budget of {max} bytes")]
    Oversize { len: usize, max: usize },

    #[error("Scan stopped")]
    Stopped,

    #[error("Unknown handle: {0}")]
    UnknownHandle(u64),
}

impl RecordIoError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        RecordIoError::Format(msg.into())
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, RecordIoError>;
