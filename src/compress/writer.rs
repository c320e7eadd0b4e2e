//! `Write` adapter that compresses into block-sized gzip members.
//!
//! `GcsvWriter` accepts bytes in writes of any size, cuts them into
//! `block_size` chunks and compresses each full batch on the scheduler's
//! pool. The result is byte-identical to `compress_stream` over the same
//! bytes. [`GcsvWriter::finish`] emits the last partial chunk; dropping the
//! writer without finishing discards it.

use std::io::{self, Write};
use std::mem;

use indicatif::ProgressBar;

use crate::compress::chunk::Chunk;
use crate::compress::scheduler::{CompressSummary, CompressionScheduler, Flight};
use crate::compress::sink::MemberSink;
use crate::config::types::CodecConfig;
use crate::error::GcsvError;

pub struct GcsvWriter<W: Write + Send> {
    scheduler: CompressionScheduler,
    sink: MemberSink<W>,
    flight: Flight,
    progress: ProgressBar,
    current: Vec<u8>,
    batch: Vec<Chunk>,
    next_index: u64,
    bytes_in: u64,
    batches: u64,
}

impl<W: Write + Send> GcsvWriter<W> {
    /// Wrap `inner` with a dedicated pool of `config.workers` threads.
    pub fn new(inner: W, config: CodecConfig) -> Result<Self, GcsvError> {
        let scheduler = CompressionScheduler::new(config)?;
        Ok(Self {
            scheduler,
            sink: MemberSink::new(inner),
            flight: Flight::default(),
            progress: ProgressBar::hidden(),
            current: Vec::with_capacity(config.block_size),
            batch: Vec::with_capacity(config.workers),
            next_index: 0,
            bytes_in: 0,
            batches: 0,
        })
    }

    /// Advance `progress` by the uncompressed size of each chunk written.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Write one CSV record terminated by `\n`. A field is quoted when it
    /// holds a comma, a double quote, CR or LF; embedded quotes are doubled.
    pub fn write_record<I, S>(&mut self, fields: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::new();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let field = field.as_ref();
            if field.contains([',', '"', '\r', '\n']) {
                line.push('"');
                line.push_str(&field.replace('"', "\"\""));
                line.push('"');
            } else {
                line.push_str(field);
            }
        }
        line.push('\n');
        self.write_all(line.as_bytes())
    }

    /// Write every record from `records`.
    pub fn write_records<R, I, S>(&mut self, records: R) -> io::Result<()>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Compress whatever is buffered, including a short final chunk, and
    /// return the inner writer with run counters.
    pub fn finish(mut self) -> Result<(W, CompressSummary), GcsvError> {
        if !self.current.is_empty() {
            self.seal_chunk();
        }
        self.drain_batch()?;

        let (writer, stats) = self.sink.finish()?;
        let summary = CompressSummary {
            chunks: self.next_index,
            bytes_in: self.bytes_in,
            bytes_out: stats.bytes_written,
            batches: self.batches,
            peak_in_flight: self.flight.peak(),
        };
        tracing::debug!(
            chunks = summary.chunks,
            batches = summary.batches,
            "writer finished"
        );
        Ok((writer, summary))
    }

    /// Move the current buffer into the batch as the next chunk.
    fn seal_chunk(&mut self) {
        let block_size = self.scheduler.config().block_size;
        let data = mem::replace(&mut self.current, Vec::with_capacity(block_size));
        self.batch.push(Chunk {
            index: self.next_index,
            data,
        });
        self.next_index += 1;
    }

    fn drain_batch(&mut self) -> Result<(), GcsvError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.scheduler
            .drain(&mut self.batch, &self.sink, &self.flight, &self.progress)?;
        self.batches += 1;
        Ok(())
    }
}

impl<W: Write + Send> Write for GcsvWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let config = *self.scheduler.config();
        let mut written = 0usize;
        while written < buf.len() {
            let take = (config.block_size - self.current.len()).min(buf.len() - written);
            self.current.extend_from_slice(&buf[written..written + take]);
            written += take;
            self.bytes_in += take as u64;
            if self.current.len() == config.block_size {
                self.seal_chunk();
                if self.batch.len() == config.workers {
                    self.drain_batch()?;
                }
            }
        }
        Ok(written)
    }

    /// Compress any complete chunks waiting for a full batch and flush the
    /// inner writer. A partial chunk stays buffered so member boundaries do
    /// not depend on flush timing.
    fn flush(&mut self) -> io::Result<()> {
        self.drain_batch()?;
        self.sink.flush()?;
        Ok(())
    }
}
