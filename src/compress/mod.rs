//! Parallel block compression.
//!
//! Input is cut into fixed-size chunks, each chunk becomes an independent
//! gzip member, and members are written in chunk order. The output is an
//! ordinary multi-member gzip stream that `gzip -d` also accepts.

pub mod chunk;
pub mod scheduler;
pub mod sink;
pub mod writer;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use indicatif::ProgressBar;

use crate::config::types::CodecConfig;
use crate::error::GcsvError;
use crate::progress::bar::create_byte_progress;

pub use self::chunk::{Chunk, ChunkReader};
pub use self::scheduler::{CompressSummary, CompressionScheduler};
pub use self::sink::MemberSink;
pub use self::writer::GcsvWriter;

/// Buffer size for BufReader/BufWriter: 256KB.
const BUF_SIZE: usize = 256 * 1024;

/// Compress `input` into `output` with a fresh worker pool.
pub fn compress_stream<R, W>(
    input: R,
    output: W,
    config: &CodecConfig,
    progress: &ProgressBar,
) -> Result<(W, CompressSummary), GcsvError>
where
    R: Read,
    W: Write + Send,
{
    let scheduler = CompressionScheduler::new(*config)?;
    scheduler.run(input, output, progress)
}

/// Compress the file at `input` into a new file at `output`.
pub fn compress_file(
    input: &Path,
    output: &Path,
    config: &CodecConfig,
    quiet: bool,
) -> Result<CompressSummary, GcsvError> {
    let (source, size) = open_input(input)?;
    let dest = create_output(output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        bytes = size,
        block_size = config.block_size,
        workers = config.workers,
        "compressing"
    );

    let progress = create_byte_progress(size, quiet);
    let reader = BufReader::with_capacity(BUF_SIZE, source);
    let writer = BufWriter::with_capacity(BUF_SIZE, dest);
    let result = compress_stream(reader, writer, config, &progress).and_then(
        |(mut writer, summary)| {
            writer.flush()?;
            Ok(summary)
        },
    );
    progress.finish_and_clear();

    result.map_err(|e| e.during("compress", input, Some(output)))
}

/// Open an input file, rejecting directories. Returns the file and its size.
pub(crate) fn open_input(path: &Path) -> Result<(File, u64), GcsvError> {
    let file = File::open(path).map_err(|e| GcsvError::from_open(e, path, false))?;
    let meta = file
        .metadata()
        .map_err(|e| GcsvError::from_open(e, path, false))?;
    if meta.is_dir() {
        return Err(GcsvError::InputIsDirectory {
            path: path.to_path_buf(),
        });
    }
    Ok((file, meta.len()))
}

/// Create (or truncate) an output file.
pub(crate) fn create_output(path: &Path) -> Result<File, GcsvError> {
    File::create(path).map_err(|e| GcsvError::from_open(e, path, true))
}
