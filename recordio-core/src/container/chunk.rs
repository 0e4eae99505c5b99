use crate::codec::{CodecId, get_codec, get_codec_u32};
use crate::container::header::Header;
use crate::error::{RecordIoError, Result};
use crate::util::checksum::ChecksumForward;
use std::io::{ErrorKind, Read, Write};
use tracing::trace;

const LEN_PREFIX: usize = 4;

/// In-memory accumulator of records waiting to be flushed as one chunk.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
    records: Vec<Vec<u8>>,
    num_bytes: usize, // sum of record lengths, prefixes excluded
}

/// A chunk ready to hit the sink: header plus compressed payload.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl EncodedChunk {
    pub fn write_to(&self, mut w: impl Write) -> Result<()> {
        self.header.write_to(&mut w)?;
        w.write_all(&self.payload)?;
        Ok(())
    }
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: Vec<u8>) {
        self.num_bytes += record.len();
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    pub fn records(&self) -> &[Vec<u8>] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.num_bytes = 0;
    }

    /// Frames, compresses and checksums the records. An empty chunk encodes
    /// to nothing; zero-length records are still records.
    pub fn encode(&self, compressor: CodecId, level: i32) -> Result<Option<EncodedChunk>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        let num_records = u32::try_from(self.records.len())
            .map_err(|_| RecordIoError::format("too many records for one chunk"))?;

        let mut raw = Vec::with_capacity(self.num_bytes + LEN_PREFIX * self.records.len());
        for r in &self.records {
            let len = u32::try_from(r.len()).map_err(|_| {
                RecordIoError::format(format!("record of {} bytes overflows u32", r.len()))
            })?;
            raw.extend_from_slice(&len.to_le_bytes());
            raw.extend_from_slice(r);
        }

        let mut fwd = ChecksumForward::new(Vec::with_capacity(raw.len() / 2));
        get_codec(compressor).compress(&mut &raw[..], &mut fwd, level)?;
        let (payload, checksum) = fwd.finish();

        let compressed_size = u32::try_from(payload.len()).map_err(|_| {
            RecordIoError::format(format!(
                "compressed chunk of {} bytes overflows u32",
                payload.len()
            ))
        })?;

        Ok(Some(EncodedChunk {
            header: Header::new(checksum, compressor, compressed_size, num_records),
            payload,
        }))
    }

    /// Writes header and payload, then clears the accumulator. Returns the
    /// header written, or `None` when there was nothing to flush.
    pub fn write_to(
        &mut self,
        w: impl Write,
        compressor: CodecId,
        level: i32,
    ) -> Result<Option<Header>> {
        let Some(encoded) = self.encode(compressor, level)? else {
            return Ok(None);
        };
        encoded.write_to(w)?;
        self.clear();
        Ok(Some(encoded.header))
    }
}

/// Verifies, decompresses and unframes one chunk payload.
pub fn decode(payload: &[u8], header: &Header) -> Result<Vec<Vec<u8>>> {
    let actual = crc32fast::hash(payload);
    if actual != header.checksum {
        return Err(RecordIoError::Integrity {
            expected: header.checksum,
            actual,
        });
    }

    let codec = get_codec_u32(header.compressor)?;
    let mut plain = Vec::with_capacity(payload.len());
    codec
        .decompress(&mut &payload[..], &mut plain)
        .map_err(|e| match e {
            RecordIoError::Io(io)
                if matches!(io.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof) =>
            {
                RecordIoError::format(format!("corrupt {} stream: {io}", codec.id()))
            }
            other => other,
        })?;

    let n = header.num_records as usize;
    let mut out = Vec::with_capacity(n.min(plain.len() / LEN_PREFIX + 1));
    let mut rest = &plain[..];
    for i in 0..n {
        if rest.is_empty() && i + 1 == n {
            // The stream may end right where a trailing empty record begins.
            out.push(Vec::new());
            break;
        }
        if rest.len() < LEN_PREFIX {
            return Err(RecordIoError::format(format!(
                "Failed to read length of record {i} of {n}"
            )));
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        rest = &rest[LEN_PREFIX..];
        if rest.len() < len {
            return Err(RecordIoError::format(format!(
                "Failed to read record {i} of {n}: need {len} bytes, have {}",
                rest.len()
            )));
        }
        out.push(rest[..len].to_vec());
        rest = &rest[len..];
    }
    trace!(
        records = out.len(),
        compressed = payload.len(),
        uncompressed = plain.len(),
        "decoded chunk"
    );
    Ok(out)
}

/// Reads the chunk starting at the current position of `r`. `Ok(None)`
/// signals a clean end of stream at the header boundary.
pub fn read_chunk(mut r: impl Read) -> Result<Option<(Header, Vec<Vec<u8>>)>> {
    let Some(header) = Header::read_from(&mut r)? else {
        return Ok(None);
    };
    let want = header.compressed_size as usize;
    let mut payload = Vec::new();
    (&mut r).take(want as u64).read_to_end(&mut payload)?;
    if payload.len() != want {
        return Err(RecordIoError::format(format!(
            "truncated chunk payload: header declares {want} bytes, got {}",
            payload.len()
        )));
    }
    let records = decode(&payload, &header)?;
    Ok(Some((header, records)))
}
