use crate::error::GcsvError;

/// Nominal chunk size used by both compression and decompression reads.
pub const DEFAULT_BLOCK_SIZE: usize = 16_384;

/// Default number of concurrently running compression workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Default deflate level: maximum compression.
pub const DEFAULT_LEVEL: u32 = 9;

/// Largest accepted block size (64 MiB).
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Largest accepted worker pool.
pub const MAX_WORKERS: usize = 1024;

/// Verbosity level controlling tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (info level)
    Normal,
    /// Verbose output (debug level)
    Verbose,
    /// Maximum output (trace level)
    Trace,
}

impl From<(bool, u8)> for Verbosity {
    /// Convert from (quiet_flag, verbose_count) to Verbosity.
    ///
    /// - quiet=true -> Quiet (regardless of verbose count)
    /// - verbose=0  -> Normal
    /// - verbose=1  -> Verbose
    /// - verbose=2+ -> Trace
    fn from((quiet, verbose_count): (bool, u8)) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            match verbose_count {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

impl Verbosity {
    /// Return the tracing filter string for this verbosity level.
    pub fn as_tracing_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Trace => "trace",
        }
    }

    pub fn is_quiet(&self) -> bool {
        *self == Verbosity::Quiet
    }
}

/// Block codec parameters shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Uncompressed bytes per chunk; also the decompression read size.
    pub block_size: usize,
    /// Maximum number of chunks compressed at once.
    pub workers: usize,
    /// Deflate level, 0-9.
    pub level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: DEFAULT_WORKERS,
            level: DEFAULT_LEVEL,
        }
    }
}

impl CodecConfig {
    /// Build a config from raw CLI values. `workers == 0` means one worker
    /// per available CPU.
    pub fn new(block_size: usize, workers: usize, level: u32) -> Result<Self, GcsvError> {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKERS)
        } else {
            workers
        };
        let config = Self {
            block_size,
            workers,
            level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GcsvError> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(GcsvError::InvalidConfig(format!(
                "block size {} outside 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(GcsvError::InvalidConfig(format!(
                "worker count {} outside 1..={}",
                self.workers, MAX_WORKERS
            )));
        }
        if self.level > 9 {
            return Err(GcsvError::InvalidConfig(format!(
                "compression level {} outside 0..=9",
                self.level
            )));
        }
        Ok(())
    }

    /// Copy of this config with a different worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Copy of this config with a different block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}
