use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "recordio CLI", long_about = None)]
pub struct Cli {
    /// Log at debug level (overrides RECORDIO_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write newline-delimited records into a RecordIO file
    Write {
        out: PathBuf,
        /// read records from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// raw record bytes per chunk (0 = 32 MiB)
        #[arg(long, default_value_t = 0)]
        max_chunk_bytes: usize,
        /// none | snappy | gzip
        #[arg(long, default_value = "snappy")]
        compressor: String,
        /// codec level; negative picks the codec default
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        level: i32,
    },

    /// Print the chunk table of a file
    Index { file: PathBuf },

    /// Print per-file index summaries as JSON
    Stat { files: Vec<PathBuf> },

    /// Print records [start, start+len) of one file
    Cat {
        file: PathBuf,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,
        /// negative reads to the end
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        len: i64,
        /// print records as hex
        #[arg(long)]
        hex: bool,
    },

    /// Stream records [start, start+len) across files and directories
    Scan {
        inputs: Vec<PathBuf>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        len: i64,
        /// records buffered ahead of the printer
        #[arg(long, default_value_t = 1000)]
        capacity: usize,
        /// only print how many records were streamed
        #[arg(long)]
        count: bool,
        #[arg(long)]
        hex: bool,
    },

    /// Decode every chunk, checking checksums and framing
    Verify { files: Vec<PathBuf> },
}
