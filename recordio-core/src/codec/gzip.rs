use super::{CodecId, Compressor};
use crate::error::Result;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

pub struct GzipCompressor;

fn level_of(level: i32) -> Compression {
    if level < 0 {
        Compression::default()
    } else {
        Compression::new(level.min(9) as u32)
    }
}

impl Compressor for GzipCompressor {
    fn id(&self) -> CodecId {
        CodecId::Gzip
    }

    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64> {
        let mut enc = GzEncoder::new(dst, level_of(level));
        let written_uncompressed = std::io::copy(src, &mut enc)?;
        // The gzip trailer is only emitted by finish().
        enc.finish()?;
        Ok(written_uncompressed)
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        let mut dec = GzDecoder::new(src);
        let written_uncompressed = std::io::copy(&mut dec, dst)?;
        Ok(written_uncompressed)
    }
}
