use bytesize::ByteSize;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gcsv::cli::args::{Cli, Commands};
use gcsv::config::types::{CodecConfig, DEFAULT_BLOCK_SIZE, Verbosity};
use gcsv::error::GcsvError;
use gcsv::{compress, decompress, inspect, verify};

fn main() {
    let cli = Cli::parse();

    // Convert CLI flags to verbosity level
    let verbosity = Verbosity::from((cli.quiet, cli.verbose));

    // RUST_LOG env var overrides CLI flags
    let filter = verbosity.as_tracing_filter();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr) // Keep stdout clean for output
        .init();

    tracing::debug!("Verbosity level: {:?}", verbosity);

    if let Err(err) = run(cli, verbosity) {
        display_error(&err);
        std::process::exit(1);
    }
}

/// Execute the dispatched command.
fn run(cli: Cli, verbosity: Verbosity) -> Result<(), GcsvError> {
    let quiet = verbosity.is_quiet();

    match cli.command {
        Commands::Compress(args) => {
            let config = args.codec.to_config()?;
            let summary = compress::compress_file(&args.input, &args.output, &config, quiet)?;
            if !quiet {
                eprintln!(
                    "Compressed {} -> {} in {} members ({})",
                    ByteSize(summary.bytes_in),
                    ByteSize(summary.bytes_out),
                    summary.chunks,
                    ratio(summary.bytes_out, summary.bytes_in),
                );
            }
            Ok(())
        }
        Commands::Decompress(args) => {
            CodecConfig::default()
                .with_block_size(args.block_size)
                .validate()?;
            let summary =
                decompress::decompress_file(&args.input, &args.output, args.block_size, quiet)?;
            if !quiet {
                eprintln!(
                    "Decompressed {} members: {} -> {}",
                    summary.members,
                    ByteSize(summary.bytes_in),
                    ByteSize(summary.bytes_out),
                );
            }
            Ok(())
        }
        Commands::Verify(args) => {
            let config = args.codec.to_config()?;
            let report = verify::verify_file(&args.input, &config, quiet)?;
            if !quiet {
                println!(
                    "OK {} ({}, {} members, {} compressed) blake3:{}",
                    report.path.display(),
                    ByteSize(report.original_bytes),
                    report.members,
                    ByteSize(report.compressed_bytes),
                    report.digest,
                );
            }
            Ok(())
        }
        Commands::Inspect(args) => {
            let report = inspect::inspect_file(&args.input, DEFAULT_BLOCK_SIZE)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_table());
            }
            Ok(())
        }
    }
}

fn ratio(compressed: u64, original: u64) -> String {
    if original == 0 {
        return "empty".to_string();
    }
    format!("{:.1}%", compressed as f64 * 100.0 / original as f64)
}

/// Display a GcsvError with optional suggestion hint to stderr.
fn display_error(err: &GcsvError) {
    eprintln!("error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("  hint: {}", suggestion);
    }
}
