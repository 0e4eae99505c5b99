use super::{CodecId, Compressor};
use crate::error::Result;
use std::io::{Read, Write};

/// Snappy framing format, so the stream is self-delimiting.
pub struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn id(&self) -> CodecId {
        CodecId::Snappy
    }

    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, _level: i32) -> Result<u64> {
        let mut enc = snap::write::FrameEncoder::new(dst);
        let written_uncompressed = std::io::copy(src, &mut enc)?;
        enc.flush()?;
        Ok(written_uncompressed)
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        let mut dec = snap::read::FrameDecoder::new(src);
        let written_uncompressed = std::io::copy(&mut dec, dst)?;
        Ok(written_uncompressed)
    }
}
