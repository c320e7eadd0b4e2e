//! Round-trip integrity check.
//!
//! Compresses a file in memory with the normal scheduler, decompresses the
//! result through `GcsvReader`, and compares BLAKE3 digests of the original
//! and round-tripped bytes.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::compress::{compress_stream, open_input};
use crate::config::types::CodecConfig;
use crate::decompress::GcsvReader;
use crate::error::{from_io, GcsvError};
use crate::progress::bar::create_byte_progress;

/// Buffer size for hashing: 64KB.
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Outcome of a successful round trip.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub members: u64,
    /// BLAKE3 hex digest shared by original and round-tripped bytes.
    pub digest: String,
}

/// Compute the BLAKE3 hash of everything `reader` yields, returning the hex
/// string and byte count.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<(String, u64)> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    Ok((hasher.finalize().to_hex().to_string(), total))
}

/// Round-trip the file at `path` and confirm the bytes survive unchanged.
pub fn verify_file(path: &Path, config: &CodecConfig, quiet: bool) -> Result<VerifyReport, GcsvError> {
    round_trip(path, config, quiet).map_err(|e| e.during("verify", path, None))
}

fn round_trip(path: &Path, config: &CodecConfig, quiet: bool) -> Result<VerifyReport, GcsvError> {
    let (file, size) = open_input(path)?;
    let (expected, original_bytes) = hash_reader(BufReader::new(file))?;

    let source = File::open(path).map_err(|e| GcsvError::from_open(e, path, false))?;
    let progress = create_byte_progress(size, quiet);
    let result = compress_stream(
        BufReader::new(source),
        Vec::with_capacity((size / 2) as usize),
        config,
        &progress,
    );
    progress.finish_and_clear();
    let (compressed, summary) = result?;

    let mut reader = GcsvReader::with_block_size(&compressed[..], config.block_size);
    let (actual, _) = hash_reader(&mut reader).map_err(from_io)?;

    tracing::debug!(
        path = %path.display(),
        expected = %expected,
        actual = %actual,
        "round-trip digests"
    );

    if expected != actual {
        return Err(GcsvError::VerifyMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }

    Ok(VerifyReport {
        path: path.to_path_buf(),
        original_bytes,
        compressed_bytes: compressed.len() as u64,
        members: summary.chunks,
        digest: actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn hash_reader_matches_direct_hash() {
        let content = b"a,b,c\n".repeat(30_000);
        let (hex, len) = hash_reader(&content[..]).unwrap();
        assert_eq!(hex, blake3::hash(&content).to_hex().to_string());
        assert_eq!(len, content.len() as u64);
    }

    #[test]
    fn empty_reader_hash() {
        let (hex, len) = hash_reader(&b""[..]).unwrap();
        assert_eq!(hex, blake3::hash(b"").to_hex().to_string());
        assert_eq!(len, 0);
    }

    #[test]
    fn verify_reports_member_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, vec![b'q'; 40_000]).unwrap();

        let report = verify_file(&path, &CodecConfig::default(), true).unwrap();
        assert_eq!(report.original_bytes, 40_000);
        assert_eq!(report.members, 3);
        assert!(report.compressed_bytes < 40_000);
        assert_eq!(report.digest, blake3::hash(&[b'q'; 40_000]).to_hex().to_string());
    }

    #[test]
    fn verify_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = verify_file(&dir.path().join("gone.csv"), &CodecConfig::default(), true);
        assert!(matches!(result, Err(GcsvError::InputNotFound { .. })));
    }
}
