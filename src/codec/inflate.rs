//! Incremental multi-member gzip decoding.
//!
//! `InflateSession` carries decoding state across arbitrarily sized input
//! pieces. Each call to [`InflateSession::feed`] consumes input up to the end
//! of the current member at most, so the caller can see member boundaries
//! and re-feed the remainder of its block to a fresh member context without
//! reading again.
//!
//! Decoding is strict: bad magic, unknown method, a corrupt deflate body, or
//! a CRC32/ISIZE trailer that does not match the decoded bytes all surface
//! as `GcsvError::StreamCorrupt`. Running out of input inside a member is
//! reported by [`InflateSession::finish`] as `GcsvError::Truncated`.

use std::io::Write;

use flate2::{Decompress, FlushDecompress, Status};
use serde::Serialize;

use crate::codec::header::{HeaderParser, HeaderStatus, TRAILER_LEN};
use crate::config::types::DEFAULT_BLOCK_SIZE;
use crate::error::GcsvError;

/// Result of one [`InflateSession::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feed {
    /// Input bytes consumed. Less than the input length when a member ended
    /// before the input did, or when the output budget ran out.
    pub consumed: usize,
    /// The current member reached its trailer and verified.
    pub member_done: bool,
}

/// Summary of one fully decoded member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    /// Zero-based position of the member in the stream.
    pub index: u64,
    /// Byte offset of the member's header in the compressed stream.
    pub offset: u64,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
}

#[derive(Debug)]
enum State {
    /// Between members; the next byte starts a new header.
    Idle,
    Header(HeaderParser),
    Body,
    Trailer(Vec<u8>),
}

pub struct InflateSession {
    state: State,
    inflater: Decompress,
    crc: crc32fast::Hasher,
    scratch: Vec<u8>,
    member_start: u64,
    member_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    members: u64,
    last_member: Option<MemberInfo>,
}

impl Default for InflateSession {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl InflateSession {
    /// Create a session whose output scratch buffer holds `buffer_size` bytes.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            state: State::Idle,
            inflater: Decompress::new(false),
            crc: crc32fast::Hasher::new(),
            scratch: vec![0u8; buffer_size.max(1)],
            member_start: 0,
            member_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            members: 0,
            last_member: None,
        }
    }

    /// Feed compressed bytes, writing decoded bytes to `sink` as they are
    /// produced. Stops early, right after a member's trailer, so that
    /// `Feed::consumed` marks the member boundary.
    pub fn feed<W: Write + ?Sized>(
        &mut self,
        input: &[u8],
        sink: &mut W,
    ) -> Result<Feed, GcsvError> {
        self.feed_bounded(input, sink, usize::MAX)
    }

    /// Like [`feed`](Self::feed), but stops consuming input once roughly
    /// `budget` decoded bytes were written. The overshoot is at most one
    /// scratch buffer plus what the last consumed bytes expand to.
    pub fn feed_bounded<W: Write + ?Sized>(
        &mut self,
        input: &[u8],
        sink: &mut W,
        budget: usize,
    ) -> Result<Feed, GcsvError> {
        let mut pos = 0usize;
        let mut written = 0usize;
        let mut member_done = false;

        while pos < input.len() && !member_done && written < budget {
            match self.state {
                State::Idle => self.begin_member(pos),
                State::Header(_) => pos += self.feed_header(&input[pos..])?,
                State::Body => {
                    let left = budget.saturating_sub(written);
                    let (read, produced, body_done) =
                        self.feed_body(&input[pos..], pos, sink, left)?;
                    pos += read;
                    written += produced;
                    if body_done {
                        tracing::trace!(member = self.members, "deflate body complete");
                        self.state = State::Trailer(Vec::with_capacity(TRAILER_LEN));
                    } else if read == 0 && produced == 0 {
                        return Err(self.corrupt(pos, "inflater made no progress"));
                    }
                }
                State::Trailer(_) => {
                    let (read, done) = self.feed_trailer(&input[pos..], pos)?;
                    pos += read;
                    member_done = done;
                }
            }
        }

        self.bytes_in += pos as u64;
        Ok(Feed {
            consumed: pos,
            member_done,
        })
    }

    /// Declare the end of input. Fails with `Truncated` when a member was
    /// started but not finished.
    pub fn finish(&self) -> Result<(), GcsvError> {
        if self.is_mid_member() {
            return Err(GcsvError::Truncated {
                offset: self.bytes_in,
            });
        }
        Ok(())
    }

    /// True once any byte of a member has been consumed and its trailer has
    /// not yet been verified.
    pub fn is_mid_member(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Total compressed bytes consumed.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Total decoded bytes written to sinks.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// Number of members fully decoded and verified.
    pub fn members(&self) -> u64 {
        self.members
    }

    /// The most recently completed member.
    pub fn last_member(&self) -> Option<&MemberInfo> {
        self.last_member.as_ref()
    }

    fn begin_member(&mut self, pos: usize) {
        self.inflater.reset(false);
        self.crc = crc32fast::Hasher::new();
        self.member_start = self.bytes_in + pos as u64;
        self.member_out = 0;
        self.state = State::Header(HeaderParser::new());
        tracing::trace!(offset = self.member_start, "member started");
    }

    fn feed_header(&mut self, input: &[u8]) -> Result<usize, GcsvError> {
        let State::Header(parser) = &mut self.state else {
            return Ok(0);
        };
        match parser.push(input) {
            Ok(HeaderStatus::Incomplete) => Ok(input.len()),
            Ok(HeaderStatus::Complete(used)) => {
                self.state = State::Body;
                Ok(used)
            }
            Err(reason) => {
                tracing::debug!(offset = self.member_start, %reason, "header rejected");
                Err(GcsvError::StreamCorrupt {
                    offset: self.member_start,
                    reason,
                })
            }
        }
    }

    /// Inflate as much of `input` as `budget` allows. Returns bytes read,
    /// bytes produced and whether the deflate stream ended.
    ///
    /// Only stops short of the input on a spent budget, so output still
    /// buffered inside the inflater is always flushed by the next call on
    /// the unread remainder.
    fn feed_body<W: Write + ?Sized>(
        &mut self,
        input: &[u8],
        pos: usize,
        sink: &mut W,
        budget: usize,
    ) -> Result<(usize, usize, bool), GcsvError> {
        let mut read = 0usize;
        let mut total = 0usize;
        loop {
            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();
            let status = self
                .inflater
                .decompress(&input[read..], &mut self.scratch, FlushDecompress::None)
                .map_err(|e| GcsvError::StreamCorrupt {
                    offset: self.bytes_in + (pos + read) as u64,
                    reason: format!("invalid deflate data: {}", e),
                })?;
            let consumed = (self.inflater.total_in() - in_before) as usize;
            let produced = (self.inflater.total_out() - out_before) as usize;
            read += consumed;

            if produced > 0 {
                let out = &self.scratch[..produced];
                self.crc.update(out);
                sink.write_all(out)?;
                self.member_out += produced as u64;
                self.bytes_out += produced as u64;
                total += produced;
            }

            if status == Status::StreamEnd {
                return Ok((read, total, true));
            }
            if total > 0 && total >= budget && read < input.len() {
                return Ok((read, total, false));
            }
            // Output buffer filled: more may be pending even with no input
            if produced == self.scratch.len() {
                continue;
            }
            if read == input.len() || (consumed == 0 && produced == 0) {
                return Ok((read, total, false));
            }
        }
    }

    /// Collect trailer bytes; verify once all eight are present.
    fn feed_trailer(&mut self, input: &[u8], pos: usize) -> Result<(usize, bool), GcsvError> {
        let State::Trailer(buf) = &mut self.state else {
            return Ok((0, false));
        };
        let take = input.len().min(TRAILER_LEN - buf.len());
        buf.extend_from_slice(&input[..take]);
        if buf.len() < TRAILER_LEN {
            return Ok((take, false));
        }

        let stored_crc = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let stored_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let crc = std::mem::take(&mut self.crc).finalize();
        let trailer_offset = self.bytes_in + pos as u64;

        if stored_crc != crc {
            return Err(GcsvError::StreamCorrupt {
                offset: trailer_offset,
                reason: format!(
                    "CRC32 mismatch: stored {:08x}, computed {:08x}",
                    stored_crc, crc
                ),
            });
        }
        // ISIZE is the uncompressed length modulo 2^32
        if stored_size != self.member_out as u32 {
            return Err(GcsvError::StreamCorrupt {
                offset: trailer_offset,
                reason: format!(
                    "length mismatch: stored {}, decoded {}",
                    stored_size, self.member_out
                ),
            });
        }

        let end = self.bytes_in + (pos + take) as u64;
        let info = MemberInfo {
            index: self.members,
            offset: self.member_start,
            compressed_size: end - self.member_start,
            uncompressed_size: self.member_out,
            crc32: crc,
        };
        tracing::trace!(
            index = info.index,
            compressed = info.compressed_size,
            uncompressed = info.uncompressed_size,
            "member verified"
        );
        self.last_member = Some(info);
        self.members += 1;
        self.state = State::Idle;
        Ok((take, true))
    }

    fn corrupt(&self, pos: usize, reason: &str) -> GcsvError {
        GcsvError::StreamCorrupt {
            offset: self.bytes_in + pos as u64,
            reason: reason.to_string(),
        }
    }
}
