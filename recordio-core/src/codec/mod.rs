use crate::error::{RecordIoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// On-disk compressor id. The set is closed: anything else read from a
/// header is a format error.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    None = 0,
    Snappy = 1,
    Gzip = 2,
}

impl TryFrom<u32> for CodecId {
    type Error = RecordIoError;

    fn try_from(v: u32) -> Result<Self> {
        match v {
            0 => Ok(CodecId::None),
            1 => Ok(CodecId::Snappy),
            2 => Ok(CodecId::Gzip),
            x => Err(RecordIoError::format(format!(
                "Unknown compression algorithm: {x}"
            ))),
        }
    }
}

impl FromStr for CodecId {
    type Err = RecordIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "store" => Ok(CodecId::None),
            "snappy" => Ok(CodecId::Snappy),
            "gzip" => Ok(CodecId::Gzip),
            other => other
                .parse::<u32>()
                .map_err(|_| RecordIoError::format(format!("unknown compressor: {other}")))
                .and_then(CodecId::try_from),
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodecId::None => "none",
            CodecId::Snappy => "snappy",
            CodecId::Gzip => "gzip",
        };
        f.write_str(name)
    }
}

/// A chunk payload codec. `compress` must leave `dst` holding a complete,
/// finalised stream once it returns.
pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64>;
    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64>;
}

pub mod gzip;
pub mod snappy;

/// Id 0: the payload is the framed records as they are.
pub struct Passthrough;

impl Compressor for Passthrough {
    fn id(&self) -> CodecId {
        CodecId::None
    }

    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, _level: i32) -> Result<u64> {
        Ok(std::io::copy(src, dst)?)
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        Ok(std::io::copy(src, dst)?)
    }
}

pub fn get_codec(id: CodecId) -> &'static dyn Compressor {
    match id {
        CodecId::None => &Passthrough,
        CodecId::Snappy => &snappy::SnappyCompressor,
        CodecId::Gzip => &gzip::GzipCompressor,
    }
}

pub fn get_codec_u32(id: u32) -> Result<&'static dyn Compressor> {
    CodecId::try_from(id).map(get_codec)
}
