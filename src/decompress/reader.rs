//! `Read` adapter over a compressed stream.
//!
//! `GcsvReader` exposes a multi-member stream as the original bytes, so
//! callers can feed it to anything that takes `impl Read` (a CSV parser, a
//! hasher, `io::copy`). Corruption surfaces as `io::ErrorKind::InvalidData`
//! wrapping the underlying `GcsvError`.

use std::io::{self, Read};

use crate::codec::InflateSession;
use crate::compress::chunk::fill_block;
use crate::config::types::DEFAULT_BLOCK_SIZE;

pub struct GcsvReader<R: Read> {
    inner: R,
    session: InflateSession,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    out_buf: Vec<u8>,
    out_pos: usize,
    eof: bool,
}

impl<R: Read> GcsvReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_block_size(inner, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(inner: R, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            inner,
            session: InflateSession::new(block_size),
            in_buf: vec![0u8; block_size],
            in_pos: 0,
            in_len: 0,
            out_buf: Vec::with_capacity(block_size),
            out_pos: 0,
            eof: false,
        }
    }

    /// Members fully decoded so far.
    pub fn members(&self) -> u64 {
        self.session.members()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for GcsvReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.out_pos < self.out_buf.len() {
                let n = buf.len().min(self.out_buf.len() - self.out_pos);
                buf[..n].copy_from_slice(&self.out_buf[self.out_pos..self.out_pos + n]);
                self.out_pos += n;
                return Ok(n);
            }
            self.out_buf.clear();
            self.out_pos = 0;

            if self.eof {
                return Ok(0);
            }
            if self.in_pos == self.in_len {
                self.in_len = fill_block(&mut self.inner, &mut self.in_buf)?;
                self.in_pos = 0;
                if self.in_len == 0 {
                    self.session.finish()?;
                    self.eof = true;
                    continue;
                }
            }
            // Decode about one block per round so highly compressible input
            // cannot balloon the output buffer
            let budget = self.in_buf.len();
            let feed = self.session.feed_bounded(
                &self.in_buf[self.in_pos..self.in_len],
                &mut self.out_buf,
                budget,
            )?;
            self.in_pos += feed.consumed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::compress_member;
    use crate::error::{from_io, GcsvError};
    use std::io::BufRead;

    #[test]
    fn reads_lines_across_members() {
        let stream: Vec<u8> = [&b"h1,h2\nr1,a\n"[..], &b"r2,b\n"[..], &b"r3,c\n"[..]]
            .iter()
            .flat_map(|p| compress_member(p, 9).unwrap())
            .collect();
        let reader = io::BufReader::new(GcsvReader::new(&stream[..]));
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["h1,h2", "r1,a", "r2,b", "r3,c"]);
    }

    #[test]
    fn tiny_caller_buffers_see_every_byte() {
        let original = b"col\n".repeat(2000);
        let stream = compress_member(&original, 9).unwrap();
        let mut reader = GcsvReader::with_block_size(&stream[..], 100);
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, original);
        assert_eq!(reader.members(), 1);
    }

    #[test]
    fn output_buffer_stays_near_block_size() {
        // 8 MiB of zeros deflates to a few KiB, i.e. one input block
        let original = vec![0u8; 8 * 1024 * 1024];
        let stream = compress_member(&original, 9).unwrap();
        let block_size = 16 * 1024;
        assert!(stream.len() < block_size);

        let mut reader = GcsvReader::with_block_size(&stream[..], block_size);
        let mut buf = vec![0u8; 4096];
        let mut total = 0usize;
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            assert!(buf[..n].iter().all(|&b| b == 0));
            total += n;
            assert!(
                reader.out_buf.capacity() <= 4 * block_size,
                "output buffer grew to {}",
                reader.out_buf.capacity()
            );
        }
        assert_eq!(total, original.len());
    }

    #[test]
    fn truncation_surfaces_as_invalid_data() {
        let stream = compress_member(&b"a,b\n".repeat(100), 9).unwrap();
        let mut reader = GcsvReader::new(&stream[..stream.len() - 1]);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(from_io(err), GcsvError::Truncated { .. }));
    }

    #[test]
    fn empty_stream_reads_nothing() {
        let mut out = Vec::new();
        GcsvReader::new(&b""[..]).read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
