//! Member listing for compressed files.
//!
//! Walks a stream with the inflate session, discarding decoded bytes but
//! recording one `MemberInfo` per member. Every member is fully verified on
//! the way, so a listing doubles as an integrity check.

use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::Path;

use bytesize::ByteSize;
use serde::Serialize;

use crate::codec::{InflateSession, MemberInfo};
use crate::compress::chunk::fill_block;
use crate::compress::open_input;
use crate::error::GcsvError;

/// All members of one compressed stream plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub members: Vec<MemberInfo>,
    pub compressed_bytes: u64,
    pub uncompressed_bytes: u64,
}

impl InspectReport {
    /// Compressed size as a percentage saved, gzip `-l` style.
    pub fn ratio(&self) -> f64 {
        if self.uncompressed_bytes == 0 {
            0.0
        } else {
            (1.0 - self.compressed_bytes as f64 / self.uncompressed_bytes as f64) * 100.0
        }
    }

    /// Human-readable table, one row per member and a totals row.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>7} {:>12} {:>12} {:>12}  {:>8}",
            "member", "offset", "compressed", "uncompressed", "crc32"
        );
        for m in &self.members {
            let _ = writeln!(
                out,
                "{:>7} {:>12} {:>12} {:>12}  {:08x}",
                m.index, m.offset, m.compressed_size, m.uncompressed_size, m.crc32
            );
        }
        let _ = writeln!(
            out,
            "{} members, {} -> {} ({:.1}% saved)",
            self.members.len(),
            ByteSize(self.uncompressed_bytes),
            ByteSize(self.compressed_bytes),
            self.ratio()
        );
        out
    }
}

/// List the members of a compressed stream.
pub fn inspect_stream<R: Read>(mut input: R, block_size: usize) -> Result<InspectReport, GcsvError> {
    let mut session = InflateSession::new(block_size);
    let mut block = vec![0u8; block_size.max(1)];
    let mut members = Vec::new();
    let mut discard = io::sink();

    loop {
        let filled = fill_block(&mut input, &mut block)?;
        if filled == 0 {
            break;
        }
        let mut offset = 0usize;
        while offset < filled {
            let feed = session.feed(&block[offset..filled], &mut discard)?;
            offset += feed.consumed;
            if feed.member_done {
                if let Some(info) = session.last_member() {
                    members.push(info.clone());
                }
            }
        }
    }
    session.finish()?;

    Ok(InspectReport {
        members,
        compressed_bytes: session.bytes_in(),
        uncompressed_bytes: session.bytes_out(),
    })
}

/// List the members of the compressed file at `path`.
pub fn inspect_file(path: &Path, block_size: usize) -> Result<InspectReport, GcsvError> {
    let (file, _) = open_input(path)?;
    let report = inspect_stream(io::BufReader::new(file), block_size)
        .map_err(|e| e.during("inspect", path, None))?;
    tracing::info!(
        input = %path.display(),
        members = report.members.len(),
        "inspected"
    );
    Ok(report)
}
