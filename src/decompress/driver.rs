//! Single-threaded decompression loop.
//!
//! The driver reads one block of compressed input at a time and hands it to
//! the inflate session, which writes decoded bytes straight to the output.
//! A member boundary inside a block is handled by re-feeding the rest of the
//! same block, so nothing is read twice.

use std::io::{Read, Write};

use indicatif::ProgressBar;

use crate::codec::InflateSession;
use crate::compress::chunk::fill_block;
use crate::error::GcsvError;

/// Driver states. `Done` and `Corrupt` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Fetch the next block of compressed bytes.
    ReadingInput,
    /// Hand the current block to the codec and flush what it decodes.
    FeedingCodec,
    /// Input exhausted on a member boundary.
    Done,
    /// The stream was invalid or truncated.
    Corrupt,
}

/// Counters from one decompression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressSummary {
    pub members: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

pub struct DecompressionDriver<R: Read, W: Write> {
    input: R,
    output: W,
    session: InflateSession,
    block: Vec<u8>,
    filled: usize,
    state: DriverState,
    progress: ProgressBar,
}

impl<R: Read, W: Write> DecompressionDriver<R, W> {
    pub fn new(input: R, output: W, block_size: usize, progress: ProgressBar) -> Self {
        let block_size = block_size.max(1);
        Self {
            input,
            output,
            session: InflateSession::new(block_size),
            block: vec![0u8; block_size],
            filled: 0,
            state: DriverState::ReadingInput,
            progress,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Perform one state transition and return the new state.
    pub fn step(&mut self) -> Result<DriverState, GcsvError> {
        match self.state {
            DriverState::ReadingInput => {
                self.filled = fill_block(&mut self.input, &mut self.block)?;
                if self.filled > 0 {
                    self.state = DriverState::FeedingCodec;
                } else {
                    // Zero-byte read: done only if no member is half-decoded
                    self.session.finish().map_err(|e| self.fail(e))?;
                    self.state = DriverState::Done;
                }
            }
            DriverState::FeedingCodec => {
                let mut offset = 0usize;
                while offset < self.filled {
                    let feed = self
                        .session
                        .feed(&self.block[offset..self.filled], &mut self.output)
                        .map_err(|e| self.fail(e))?;
                    offset += feed.consumed;
                    self.progress.inc(feed.consumed as u64);
                    if feed.member_done {
                        tracing::debug!(members = self.session.members(), "member decoded");
                    }
                }
                self.state = DriverState::ReadingInput;
            }
            DriverState::Done => {}
            DriverState::Corrupt => {
                return Err(GcsvError::StreamCorrupt {
                    offset: self.session.bytes_in(),
                    reason: "decoder already failed".to_string(),
                });
            }
        }
        Ok(self.state)
    }

    /// Run to completion, flush the output, and return it with counters.
    pub fn run(mut self) -> Result<(W, DecompressSummary), GcsvError> {
        while self.step()? != DriverState::Done {}
        self.output.flush()?;
        let summary = self.summary();
        Ok((self.output, summary))
    }

    pub fn summary(&self) -> DecompressSummary {
        DecompressSummary {
            members: self.session.members(),
            bytes_in: self.session.bytes_in(),
            bytes_out: self.session.bytes_out(),
        }
    }

    /// Record a fatal codec error. Corruption moves to `Corrupt`; sink
    /// errors pass through unchanged.
    fn fail(&mut self, err: GcsvError) -> GcsvError {
        if err.is_corruption() {
            tracing::warn!(
                error = %err,
                decoded = self.session.bytes_out(),
                "stopping on corrupt input; output so far is incomplete"
            );
            self.state = DriverState::Corrupt;
        }
        err
    }
}
