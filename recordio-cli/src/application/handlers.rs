use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use recordio_core::error::Result;
use recordio_core::{
    CodecId, FileList, FileListScanner, Index, ScanOptions, Scanner, Writer, WriterOptions, verify,
};
use tracing::info;
use walkdir::WalkDir;

fn write_record(out: &mut impl Write, record: &[u8], hex: bool) -> io::Result<()> {
    if hex {
        for b in record {
            write!(out, "{b:02x}")?;
        }
    } else {
        out.write_all(record)?;
    }
    out.write_all(b"\n")
}

/// Expands directories into their regular files, sorted by path, so the
/// resulting global record order is stable between runs.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in inputs {
        if root.is_dir() {
            let mut found = Vec::new();
            for e in WalkDir::new(root).follow_links(false) {
                let e = e.map_err(io::Error::other)?;
                if e.file_type().is_file() {
                    found.push(e.path().to_path_buf());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(root.clone());
        }
    }
    Ok(files)
}

pub fn handle_write(
    out: PathBuf,
    input: Option<PathBuf>,
    max_chunk_bytes: usize,
    compressor: String,
    level: i32,
) -> Result<()> {
    let opts = WriterOptions {
        max_chunk_bytes,
        compressor: compressor.parse::<CodecId>()?,
        level,
    };
    let src: Box<dyn BufRead> = match input {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut w = Writer::new(BufWriter::new(File::create(&out)?), opts);
    let mut records = 0u64;
    for line in src.split(b'\n') {
        w.write(&line?)?;
        records += 1;
    }
    w.close()?;
    info!(path = %out.display(), records, chunks = w.chunks_written(), "wrote file");
    eprintln!("write: {records} records -> {}", out.display());
    Ok(())
}

pub fn handle_index(file: PathBuf) -> Result<()> {
    let idx = Index::load_path(&file)?;
    for c in idx.summary().chunks {
        println!(
            "#{:<5} off={:<10} records={:<6} first={}",
            c.ordinal, c.offset, c.records, c.first_record
        );
    }
    println!("{} records in {} chunks", idx.num_records(), idx.num_chunks());
    Ok(())
}

pub fn handle_stat(files: Vec<PathBuf>) -> Result<()> {
    let mut rows = Vec::with_capacity(files.len());
    for f in &files {
        let idx = Index::load_path(f)?;
        rows.push(serde_json::json!({
            "path": f.display().to_string(),
            "summary": idx.summary(),
        }));
    }
    let text = serde_json::to_string_pretty(&rows).map_err(io::Error::other)?;
    println!("{text}");
    Ok(())
}

pub fn handle_cat(file: PathBuf, start: i64, len: i64, hex: bool) -> Result<()> {
    let idx = Arc::new(Index::load_path(&file)?);
    let mut scanner = Scanner::new(BufReader::new(File::open(&file)?), idx, start, len);
    let mut out = io::stdout().lock();
    while scanner.scan() {
        write_record(&mut out, scanner.record(), hex)?;
    }
    out.flush()?;
    match scanner.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub fn handle_scan(
    inputs: Vec<PathBuf>,
    start: i64,
    len: i64,
    capacity: usize,
    count: bool,
    hex: bool,
) -> Result<()> {
    let files = expand_inputs(&inputs)?;
    let fl = Arc::new(FileList::new(files)?);
    let opts = ScanOptions {
        channel_capacity: capacity,
    };
    let scanner = FileListScanner::with_options(fl, start, len, &opts)?;

    let mut n = 0u64;
    if count {
        n = scanner.iter().count() as u64;
    } else {
        let mut out = io::stdout().lock();
        for record in scanner.iter() {
            write_record(&mut out, &record, hex)?;
            n += 1;
        }
        out.flush()?;
    }
    scanner.finish()?;
    if count {
        println!("{n}");
    }
    Ok(())
}

pub fn handle_verify(files: Vec<PathBuf>) -> Result<()> {
    for f in &files {
        let summary = verify(f)?;
        eprintln!(
            "verify: {} OK ({} records, {} chunks)",
            f.display(),
            summary.num_records,
            summary.num_chunks
        );
    }
    Ok(())
}
