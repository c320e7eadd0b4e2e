//! Batch-wait compression scheduler.
//!
//! The driving thread alternates between two states:
//!
//! 1. FILLING: read chunks until the batch holds `workers` chunks or the
//!    input ends.
//! 2. DRAINING: launch one task per chunk on a bounded rayon pool and block
//!    until every task in the batch has submitted its member to the sink.
//!
//! At most `workers` chunks are ever in flight, so peak memory is
//! O(workers * block_size). Any worker failure aborts the whole run after
//! the current batch drains; nothing is retried.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use indicatif::ProgressBar;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::codec::compress_member;
use crate::compress::chunk::{Chunk, ChunkReader};
use crate::compress::sink::MemberSink;
use crate::config::types::CodecConfig;
use crate::error::GcsvError;

/// Counters from one compression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressSummary {
    /// Chunks read, which equals members written.
    pub chunks: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// Number of DRAINING passes.
    pub batches: u64,
    /// Most chunks observed compressing at the same instant.
    pub peak_in_flight: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Filling,
    Draining,
}

pub struct CompressionScheduler {
    pool: ThreadPool,
    config: CodecConfig,
}

/// In-flight bookkeeping shared by the tasks of one run.
#[derive(Default)]
pub(crate) struct Flight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Flight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl CompressionScheduler {
    /// Build a scheduler with a dedicated pool of `config.workers` threads.
    pub fn new(config: CodecConfig) -> Result<Self, GcsvError> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("gcsv-worker-{}", i))
            .build()?;
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Compress all of `input` into `output` as a sequence of gzip members,
    /// one per chunk, in chunk order. Returns the writer and run counters.
    pub fn run<R, W>(
        &self,
        input: R,
        output: W,
        progress: &ProgressBar,
    ) -> Result<(W, CompressSummary), GcsvError>
    where
        R: Read,
        W: Write + Send,
    {
        let mut reader = ChunkReader::new(input, self.config.block_size);
        let sink = MemberSink::new(output);
        let flight = Flight::default();
        let mut batch: Vec<Chunk> = Vec::with_capacity(self.config.workers);
        let mut batches = 0u64;
        let mut state = SchedulerState::Filling;

        loop {
            match state {
                SchedulerState::Filling => match reader.next_chunk()? {
                    Some(chunk) => {
                        batch.push(chunk);
                        if batch.len() == self.config.workers {
                            state = SchedulerState::Draining;
                        }
                    }
                    None => {
                        if !batch.is_empty() {
                            self.drain(&mut batch, &sink, &flight, progress)?;
                            batches += 1;
                        }
                        break;
                    }
                },
                SchedulerState::Draining => {
                    self.drain(&mut batch, &sink, &flight, progress)?;
                    batches += 1;
                    state = SchedulerState::Filling;
                }
            }
        }

        let (writer, stats) = sink.finish()?;
        let summary = CompressSummary {
            chunks: reader.chunks_read(),
            bytes_in: reader.bytes_read(),
            bytes_out: stats.bytes_written,
            batches,
            peak_in_flight: flight.peak(),
        };
        tracing::debug!(
            chunks = summary.chunks,
            batches = summary.batches,
            peak_pending = stats.peak_pending,
            "compression finished"
        );
        Ok((writer, summary))
    }

    /// Launch one task per chunk in `batch` and wait for all of them.
    pub(crate) fn drain<W: Write + Send>(
        &self,
        batch: &mut Vec<Chunk>,
        sink: &MemberSink<W>,
        flight: &Flight,
        progress: &ProgressBar,
    ) -> Result<(), GcsvError> {
        let first_error: Mutex<Option<GcsvError>> = Mutex::new(None);
        let level = self.config.level;
        tracing::debug!(
            first = batch.first().map(|c| c.index),
            size = batch.len(),
            "draining batch"
        );

        self.pool.scope(|scope| {
            for chunk in batch.drain(..) {
                let first_error = &first_error;
                scope.spawn(move |_| {
                    flight.enter();
                    let Chunk { index, data } = chunk;
                    let len = data.len() as u64;
                    let result = compress_member(&data, level);
                    drop(data);
                    let result = result.and_then(|member| sink.submit(index, member));
                    flight.leave();

                    match result {
                        Ok(()) => progress.inc(len),
                        Err(err) => {
                            tracing::debug!(index, error = %err, "worker failed");
                            if let Ok(mut slot) = first_error.lock() {
                                slot.get_or_insert(err);
                            }
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(_) => Err(GcsvError::Worker("error slot poisoned".to_string())),
        }
    }
}
