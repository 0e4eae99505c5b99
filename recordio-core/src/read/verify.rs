use super::index::Index;
use crate::container::chunk::read_chunk;
use crate::domain::IndexSummary;
use crate::error::{RecordIoError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Decodes every chunk of a file, checking checksums, framing and that the
/// decoded record counts agree with the headers.
pub fn verify(path: &Path) -> Result<IndexSummary> {
    let mut f = BufReader::new(File::open(path)?);
    let summary = verify_reader(&mut f)?;
    debug!(
        path = %path.display(),
        chunks = summary.num_chunks,
        records = summary.num_records,
        "verified file"
    );
    Ok(summary)
}

pub fn verify_reader<R: Read + Seek>(r: &mut R) -> Result<IndexSummary> {
    let start = r.stream_position()?;
    let idx = Index::load(r)?;
    r.seek(SeekFrom::Start(start))?;

    for ci in 0..idx.num_chunks() {
        let (_, records) = read_chunk(&mut *r)?.ok_or_else(|| {
            RecordIoError::format(format!("chunk {ci} missing on second pass"))
        })?;
        let declared = idx.chunk_records(ci).unwrap_or(0) as usize;
        if records.len() != declared {
            return Err(RecordIoError::format(format!(
                "chunk {ci}: decoded {} records, header declares {declared}",
                records.len()
            )));
        }
    }
    Ok(idx.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecId;
    use crate::options::WriterOptions;
    use crate::write::writer::Writer;
    use std::io::Cursor;

    #[test]
    fn detects_a_flipped_bit_in_any_chunk() {
        let opts = WriterOptions::default()
            .with_max_chunk_bytes(64)
            .with_compressor(CodecId::Gzip);
        let mut w = Writer::new(Vec::new(), opts);
        for i in 0..40u8 {
            w.write(&[i; 20]).unwrap();
        }
        let buf = w.into_inner().unwrap();
        let summary = verify_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(summary.num_records, 40);

        let mut bad = buf.clone();
        let n = bad.len();
        bad[n - 2] ^= 0x80;
        assert!(matches!(
            verify_reader(&mut Cursor::new(&bad)),
            Err(RecordIoError::Integrity { .. })
        ));
    }
}
