//! gcsv: parallel gzip block compression for delimited-text files.
//!
//! Compression splits the input into fixed-size blocks and turns each block
//! into an independent gzip member on a bounded worker pool; members are
//! written in block order, so the output is a standard multi-member gzip
//! file. Decompression is a single streaming pass that walks the members
//! and verifies each CRC32/ISIZE trailer.

pub mod cli;
pub mod codec;
pub mod compress;
pub mod config;
pub mod decompress;
pub mod error;
pub mod inspect;
pub mod progress;
pub mod verify;

pub use compress::{compress_file, compress_stream, CompressSummary, GcsvWriter};
pub use config::types::CodecConfig;
pub use decompress::{decompress_file, decompress_stream, DecompressSummary, GcsvReader};
pub use error::{GcsvError, Result};
