//! Fixed-size chunking of the input stream.
//!
//! A `ChunkReader` fills blocks of `block_size` bytes, looping over short
//! reads so every chunk except the last is full. The last chunk may be
//! shorter; a zero-length chunk is never produced.

use std::io::{self, Read};

use crate::error::GcsvError;

/// One block of input, tagged with its position in the stream.
///
/// A chunk is moved into exactly one worker, which drops it after the
/// compressed member has been submitted.
#[derive(Debug)]
pub struct Chunk {
    /// Zero-based sequence index, assigned in read order.
    pub index: u64,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub struct ChunkReader<R: Read> {
    inner: R,
    block_size: usize,
    next_index: u64,
    bytes_read: u64,
    exhausted: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R, block_size: usize) -> Self {
        Self {
            inner,
            block_size: block_size.max(1),
            next_index: 0,
            bytes_read: 0,
            exhausted: false,
        }
    }

    /// Read the next chunk. Returns `Ok(None)` once the input is exhausted,
    /// and keeps returning it on later calls.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, GcsvError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut data = vec![0u8; self.block_size];
        let filled = fill_block(&mut self.inner, &mut data)?;
        if filled < self.block_size {
            self.exhausted = true;
        }
        if filled == 0 {
            return Ok(None);
        }
        data.truncate(filled);

        let chunk = Chunk {
            index: self.next_index,
            data,
        };
        self.next_index += 1;
        self.bytes_read += filled as u64;
        Ok(Some(chunk))
    }

    /// Total input bytes handed out in chunks so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of chunks produced so far.
    pub fn chunks_read(&self) -> u64 {
        self.next_index
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Chunk, GcsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

/// Read until `buf` is full or EOF. Retries on `Interrupted`.
///
/// Analogous to `Read::read_exact` but a short final read is not an error.
pub fn fill_block<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
