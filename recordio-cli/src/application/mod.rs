pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use recordio_core::error::Result;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Write {
            out,
            input,
            max_chunk_bytes,
            compressor,
            level,
        } => handlers::handle_write(out, input, max_chunk_bytes, compressor, level),
        Commands::Index { file } => handlers::handle_index(file),
        Commands::Stat { files } => handlers::handle_stat(files),
        Commands::Cat {
            file,
            start,
            len,
            hex,
        } => handlers::handle_cat(file, start, len, hex),
        Commands::Scan {
            inputs,
            start,
            len,
            capacity,
            count,
            hex,
        } => handlers::handle_scan(inputs, start, len, capacity, count, hex),
        Commands::Verify { files } => handlers::handle_verify(files),
    }
}
