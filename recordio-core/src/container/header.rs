use crate::codec::CodecId;
use crate::error::{RecordIoError, Result};
use std::io::{ErrorKind, Read, Write};

pub const MAGIC: u32 = 0x0102_0304;
pub const HEADER_LEN: usize = 20;

/// Fixed-size metadata preceding every chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// CRC-32 (IEEE) of the compressed payload.
    pub checksum: u32,
    /// Raw compressor id; validated when the payload is decoded.
    pub compressor: u32,
    pub compressed_size: u32,
    pub num_records: u32,
}

impl Header {
    pub fn new(checksum: u32, compressor: CodecId, compressed_size: u32, num_records: u32) -> Self {
        Self {
            checksum,
            compressor: compressor as u32,
            compressed_size,
            num_records,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..12].copy_from_slice(&self.compressor.to_le_bytes());
        buf[12..16].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.num_records.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(RecordIoError::format(format!(
                "header needs {HEADER_LEN} bytes, got {}",
                buf.len()
            )));
        }
        let magic = le32(&buf[0..4]);
        if magic != MAGIC {
            return Err(RecordIoError::format(format!(
                "Failed to parse magic number: {magic:#010x}"
            )));
        }
        Ok(Self {
            checksum: le32(&buf[4..8]),
            compressor: le32(&buf[8..12]),
            compressed_size: le32(&buf[12..16]),
            num_records: le32(&buf[16..20]),
        })
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(&self.encode())
    }

    /// Reads the next header. `Ok(None)` means the stream ended exactly on a
    /// header boundary; a partial header is a format error.
    pub fn read_from(mut r: impl Read) -> Result<Option<Self>> {
        let mut buf = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            match r.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        Self::decode(&buf[..filled]).map(Some)
    }
}

#[inline]
fn le32(x: &[u8]) -> u32 {
    u32::from_le_bytes([x[0], x[1], x[2], x[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_header() {
        let h = Header {
            checksum: 123,
            compressor: 456,
            compressed_size: 789,
            num_records: 10,
        };
        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(&buf[0..4], &[0x04, 0x03, 0x02, 0x01]);

        let back = Header::read_from(&buf[..]).unwrap();
        assert_eq!(back, Some(h));
    }

    #[test]
    fn clean_eof_is_not_a_header() {
        assert_eq!(Header::read_from(&[0u8; 0][..]).unwrap(), None);
    }

    #[test]
    fn short_or_foreign_bytes_are_rejected() {
        let h = Header::new(1, CodecId::Gzip, 2, 3).encode();
        assert!(matches!(
            Header::read_from(&h[..7]),
            Err(RecordIoError::Format(_))
        ));

        let mut bad = h;
        bad[0] ^= 0xff;
        assert!(matches!(Header::decode(&bad), Err(RecordIoError::Format(_))));
    }
}
