/*!
Compression adapters used by the compression transformers.

Each adapter is a content-agnostic byte codec. `ZlibCompressor` backs the
`zlib.bin` key and `GzipCompressor` the `gz` key.
*/

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io::{Read, Write};

use crate::{Result, UssrError};

/// Byte-level compression codec
pub trait CompressionAdapter {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the input data
    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of the compression algorithm
    fn algorithm_name(&self) -> &str;

    /// Content-type key produced by compressing with this algorithm
    fn content_type(&self) -> &str;
}

/// Zlib (RFC 1950) compression adapter
///
/// # Example
/// ```rust
/// use ussr_core::compression::{CompressionAdapter, ZlibCompressor};
///
/// let compressor = ZlibCompressor::new();
/// let data = b"some payload to compress";
/// let compressed = compressor.compress(data)?;
/// assert_eq!(compressor.decompress(&compressed)?, data);
/// # Ok::<(), ussr_core::UssrError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ZlibCompressor {
    compression_level: Compression,
}

impl ZlibCompressor {
    /// Create a new zlib compressor with default compression level (6)
    pub fn new() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }

    /// Create a new zlib compressor with the specified level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: Compression::new(level),
        }
    }
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for ZlibCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            UssrError::compression(format!("Failed to write data for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| UssrError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| UssrError::compression(format!("Failed to decompress data: {e}")))?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "zlib"
    }

    fn content_type(&self) -> &str {
        "zlib.bin"
    }
}

/// Gzip compression adapter
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    compression_level: Compression,
}

impl GzipCompressor {
    pub fn new() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }

    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: Compression::new(level),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            UssrError::compression(format!("Failed to write data for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| UssrError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| UssrError::compression(format!("Failed to decompress data: {e}")))?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "gzip"
    }

    fn content_type(&self) -> &str {
        "gz"
    }
}
