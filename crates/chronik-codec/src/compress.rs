//! Optional byte-level compression stage.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use chronik_core::{Result, StoreError};

/// A symmetric byte-string transform applied between transcoding and
/// encryption.
pub trait Compressor: Send + Sync {
    /// Compress the transcoded payload.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Expand a compressed payload.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Zlib compression via flate2.
pub struct ZlibCompressor {
    level: Compression,
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl ZlibCompressor {
    /// Compressor at the default level.
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Compressor at an explicit level (0-9).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Compressor for ZlibCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .and_then(|_| encoder.finish())
            .map_err(|e| StoreError::Integrity(format!("compression failed: {e}")))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| StoreError::Integrity(format!("decompression failed: {e}")))?;
        Ok(out)
    }
}
