//! Streaming decompression of multi-member gzip files.

pub mod driver;
pub mod reader;

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use indicatif::ProgressBar;

use crate::compress::{create_output, open_input};
use crate::error::GcsvError;
use crate::progress::bar::create_byte_progress;

pub use self::driver::{DecompressSummary, DecompressionDriver, DriverState};
pub use self::reader::GcsvReader;

/// Decompress `input` into `output`, reading `block_size` bytes at a time.
pub fn decompress_stream<R: Read, W: Write>(
    input: R,
    output: W,
    block_size: usize,
    progress: &ProgressBar,
) -> Result<(W, DecompressSummary), GcsvError> {
    DecompressionDriver::new(input, output, block_size, progress.clone()).run()
}

/// Decompress the file at `input` into a new file at `output`.
///
/// On corruption the output file keeps whatever was decoded before the
/// error; it is incomplete and should not be trusted.
pub fn decompress_file(
    input: &Path,
    output: &Path,
    block_size: usize,
    quiet: bool,
) -> Result<DecompressSummary, GcsvError> {
    let (source, size) = open_input(input)?;
    let dest = create_output(output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        bytes = size,
        "decompressing"
    );

    let progress = create_byte_progress(size, quiet);
    let writer = BufWriter::with_capacity(block_size.max(1), dest);
    let result = decompress_stream(source, writer, block_size, &progress).and_then(
        |(mut writer, summary)| {
            writer.flush()?;
            Ok(summary)
        },
    );
    progress.finish_and_clear();
    result.map_err(|e| e.during("decompress", input, Some(output)))
}
