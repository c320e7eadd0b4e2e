use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::types::{CodecConfig, DEFAULT_BLOCK_SIZE, DEFAULT_LEVEL, DEFAULT_WORKERS};
use crate::error::GcsvError;

#[derive(Parser, Debug)]
#[command(
    name = "gcsv",
    version,
    about = "Parallel gzip block compression for CSV files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v for verbose, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode: suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress a file into independent gzip members, one per block
    Compress(CompressArgs),

    /// Decompress a multi-member gzip file
    Decompress(DecompressArgs),

    /// Compress and decompress a file in memory and compare BLAKE3 digests
    Verify(VerifyArgs),

    /// List the gzip members of a compressed file
    Inspect(InspectArgs),
}

/// Block codec tuning shared by compress and verify.
#[derive(clap::Args, Debug, Clone)]
pub struct CodecArgs {
    /// Uncompressed bytes per block
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Number of blocks compressed at once (0 = one per CPU)
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Deflate level, 0 (store) to 9 (best)
    #[arg(short, long, default_value_t = DEFAULT_LEVEL)]
    pub level: u32,
}

impl CodecArgs {
    pub fn to_config(&self) -> Result<CodecConfig, GcsvError> {
        CodecConfig::new(self.block_size, self.workers, self.level)
    }
}

#[derive(clap::Args, Debug)]
pub struct CompressArgs {
    /// Input file (e.g., data.csv)
    pub input: PathBuf,

    /// Output file (e.g., data.gcsv)
    pub output: PathBuf,

    #[command(flatten)]
    pub codec: CodecArgs,
}

#[derive(clap::Args, Debug)]
pub struct DecompressArgs {
    /// Compressed input file (e.g., data.gcsv)
    pub input: PathBuf,

    /// Output file (e.g., data.csv)
    pub output: PathBuf,

    /// Compressed bytes read per step
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// File to round-trip
    pub input: PathBuf,

    #[command(flatten)]
    pub codec: CodecArgs,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Compressed file to list
    pub input: PathBuf,

    /// Print members as JSON
    #[arg(long)]
    pub json: bool,
}
