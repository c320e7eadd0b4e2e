//! Gzip member encoding for a single chunk.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::GcsvError;

/// Compress `data` into one complete gzip member (header, deflate body,
/// CRC32 + ISIZE trailer) at the given deflate level.
///
/// The result decodes on its own, so members from different chunks can be
/// concatenated into a multi-member stream.
pub fn compress_member(data: &[u8], level: u32) -> Result<Vec<u8>, GcsvError> {
    // Deflate rarely grows input by more than a few bytes per 16K block
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level),
    );
    encoder
        .write_all(data)
        .map_err(|e| GcsvError::CodecInit(format!("gzip compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| GcsvError::CodecInit(format!("gzip compression failed: {}", e)))
}
