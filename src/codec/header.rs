//! RFC 1952 member header parsing.

/// First two bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression method byte for deflate; the only one RFC 1952 defines.
pub const METHOD_DEFLATE: u8 = 8;

/// Fixed part of the header: magic, method, flags, mtime, xfl, os.
pub const FIXED_HEADER_LEN: usize = 10;

/// CRC32 + ISIZE.
pub const TRAILER_LEN: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xe0;

/// Outcome of pushing bytes into a [`HeaderParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// The header ended after this many bytes of the latest input.
    Complete(usize),
    /// Every byte of the latest input was consumed and more are needed.
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Fixed,
    ExtraLen,
    Extra,
    Name,
    Comment,
    Crc,
    Done,
}

impl Step {
    fn successor(self) -> Step {
        match self {
            Step::Fixed => Step::ExtraLen,
            Step::ExtraLen => Step::Extra,
            Step::Extra => Step::Name,
            Step::Name => Step::Comment,
            Step::Comment => Step::Crc,
            Step::Crc | Step::Done => Step::Done,
        }
    }
}

/// Streaming gzip header parser.
///
/// Bytes may arrive in pieces of any size. The parser keeps only a cursor,
/// a few counters and a running CRC, so its footprint is fixed no matter how
/// long the FEXTRA, FNAME or FCOMMENT fields are.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    step: Step,
    flags: u8,
    /// Bytes collected for the current fixed-width step.
    filled: usize,
    small: [u8; 2],
    extra_left: usize,
    hcrc: crc32fast::Hasher,
    len: u64,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParser {
    pub fn new() -> Self {
        Self {
            step: Step::Fixed,
            flags: 0,
            filled: 0,
            small: [0; 2],
            extra_left: 0,
            hcrc: crc32fast::Hasher::new(),
            len: 0,
        }
    }

    /// Header bytes consumed so far.
    pub fn header_len(&self) -> u64 {
        self.len
    }

    /// Consume header bytes from `input`. Validation is byte by byte, so a
    /// bad magic or method byte fails as soon as it is seen.
    pub fn push(&mut self, input: &[u8]) -> Result<HeaderStatus, String> {
        let mut pos = 0usize;
        loop {
            if self.step == Step::Done {
                return Ok(HeaderStatus::Complete(pos));
            }
            if pos == input.len() {
                return Ok(HeaderStatus::Incomplete);
            }
            let used = match self.step {
                Step::Fixed => self.push_fixed(input[pos])?,
                Step::ExtraLen => self.push_extra_len(input[pos]),
                Step::Extra => {
                    let take = self.extra_left.min(input.len() - pos);
                    self.hcrc.update(&input[pos..pos + take]);
                    self.extra_left -= take;
                    if self.extra_left == 0 {
                        self.advance();
                    }
                    take
                }
                Step::Name | Step::Comment => {
                    let rest = &input[pos..];
                    match rest.iter().position(|&b| b == 0) {
                        Some(nul) => {
                            self.hcrc.update(&rest[..=nul]);
                            self.advance();
                            nul + 1
                        }
                        None => {
                            self.hcrc.update(rest);
                            rest.len()
                        }
                    }
                }
                Step::Crc => self.push_crc(input[pos])?,
                Step::Done => 0,
            };
            pos += used;
            self.len += used as u64;
        }
    }

    fn push_fixed(&mut self, b: u8) -> Result<usize, String> {
        match self.filled {
            0 | 1 if b != GZIP_MAGIC[self.filled] => {
                return Err(format!("bad gzip magic byte 0x{:02x}", b));
            }
            2 if b != METHOD_DEFLATE => {
                return Err(format!("unsupported compression method {}", b));
            }
            3 if b & FRESERVED != 0 => {
                return Err(format!("reserved header flags set (0x{:02x})", b));
            }
            3 => self.flags = b,
            _ => {}
        }
        self.hcrc.update(&[b]);
        self.filled += 1;
        if self.filled == FIXED_HEADER_LEN {
            self.advance();
        }
        Ok(1)
    }

    fn push_extra_len(&mut self, b: u8) -> usize {
        self.hcrc.update(&[b]);
        self.small[self.filled] = b;
        self.filled += 1;
        if self.filled == 2 {
            self.extra_left = u16::from_le_bytes(self.small) as usize;
            self.advance();
            if self.extra_left == 0 {
                self.advance();
            }
        }
        1
    }

    fn push_crc(&mut self, b: u8) -> Result<usize, String> {
        self.small[self.filled] = b;
        self.filled += 1;
        if self.filled == 2 {
            let stored = u16::from_le_bytes(self.small);
            let actual = (self.hcrc.clone().finalize() & 0xffff) as u16;
            if stored != actual {
                return Err(format!(
                    "header CRC mismatch: stored 0x{:04x}, computed 0x{:04x}",
                    stored, actual
                ));
            }
            self.advance();
        }
        Ok(1)
    }

    /// Move to the next step the flags ask for.
    fn advance(&mut self) {
        let mut next = self.step.successor();
        while !self.wants(next) {
            next = next.successor();
        }
        self.step = next;
        self.filled = 0;
    }

    fn wants(&self, step: Step) -> bool {
        match step {
            Step::ExtraLen | Step::Extra => self.flags & FEXTRA != 0,
            Step::Name => self.flags & FNAME != 0,
            Step::Comment => self.flags & FCOMMENT != 0,
            Step::Crc => self.flags & FHCRC != 0,
            Step::Fixed | Step::Done => true,
        }
    }
}

/// Parse the header at the start of `buf` in one go. `Complete(n)` gives
/// the header length.
pub fn parse_header(buf: &[u8]) -> Result<HeaderStatus, String> {
    HeaderParser::new().push(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: [u8; 10] = [0x1f, 0x8b, 8, 0, 0, 0, 0, 0, 2, 255];

    #[test]
    fn plain_header_is_ten_bytes() {
        assert_eq!(parse_header(&PLAIN), Ok(HeaderStatus::Complete(10)));
        // Trailing body bytes are not part of the header
        let mut buf = PLAIN.to_vec();
        buf.extend_from_slice(&[1, 2, 3]);
        assert_eq!(parse_header(&buf), Ok(HeaderStatus::Complete(10)));
    }

    #[test]
    fn every_prefix_is_incomplete() {
        for n in 0..PLAIN.len() {
            assert_eq!(parse_header(&PLAIN[..n]), Ok(HeaderStatus::Incomplete), "n={}", n);
        }
    }

    #[test]
    fn rejects_bad_magic_early() {
        assert!(parse_header(&[0x42]).is_err());
        assert!(parse_header(&[0x1f, 0x00]).is_err());
        assert!(parse_header(b"id,name\n").is_err());
    }

    #[test]
    fn rejects_non_deflate_method_and_reserved_flags() {
        let mut buf = PLAIN;
        buf[2] = 7;
        assert!(parse_header(&buf).unwrap_err().contains("method"));
        let mut buf = PLAIN;
        buf[3] = 0x20;
        assert!(parse_header(&buf).unwrap_err().contains("reserved"));
    }

    #[test]
    fn skips_extra_name_and_comment() {
        let mut buf = PLAIN.to_vec();
        buf[3] = FEXTRA | FNAME | FCOMMENT;
        buf.extend_from_slice(&[3, 0, b'a', b'b', b'c']);
        buf.extend_from_slice(b"data.csv\0");
        buf.extend_from_slice(b"hello\0");
        let full = buf.len();
        assert_eq!(parse_header(&buf), Ok(HeaderStatus::Complete(full)));
        assert_eq!(parse_header(&buf[..full - 1]), Ok(HeaderStatus::Incomplete));
    }

    #[test]
    fn checks_header_crc() {
        let mut buf = PLAIN.to_vec();
        buf[3] = FHCRC;
        let crc = (crc32fast::hash(&buf) & 0xffff) as u16;
        buf.extend_from_slice(&crc.to_le_bytes());
        assert_eq!(parse_header(&buf), Ok(HeaderStatus::Complete(12)));

        let last = buf.len() - 1;
        buf[last] ^= 0xff;
        assert!(parse_header(&buf).unwrap_err().contains("header CRC"));
    }

    #[test]
    fn split_anywhere_gives_same_length() {
        let mut buf = PLAIN.to_vec();
        buf[3] = FEXTRA | FNAME | FCOMMENT | FHCRC;
        buf.extend_from_slice(&[2, 0, 0xaa, 0xbb]);
        buf.extend_from_slice(b"prices.csv\0");
        buf.extend_from_slice(b"nightly export\0");
        let crc = (crc32fast::hash(&buf) & 0xffff) as u16;
        buf.extend_from_slice(&crc.to_le_bytes());
        let full = buf.len();
        buf.extend_from_slice(&[0x55; 5]);

        for split in 0..=full {
            let mut parser = HeaderParser::new();
            let first = parser.push(&buf[..split]).unwrap();
            let status = match first {
                HeaderStatus::Complete(n) => HeaderStatus::Complete(n),
                HeaderStatus::Incomplete => match parser.push(&buf[split..]).unwrap() {
                    HeaderStatus::Complete(n) => HeaderStatus::Complete(split + n),
                    HeaderStatus::Incomplete => HeaderStatus::Incomplete,
                },
            };
            assert_eq!(status, HeaderStatus::Complete(full), "split={}", split);
            assert_eq!(parser.header_len(), full as u64);
        }
    }

    #[test]
    fn zero_length_extra_field() {
        let mut buf = PLAIN.to_vec();
        buf[3] = FEXTRA;
        buf.extend_from_slice(&[0, 0]);
        assert_eq!(parse_header(&buf), Ok(HeaderStatus::Complete(12)));
    }

    #[test]
    fn long_name_is_streamed_not_stored() {
        let mut parser = HeaderParser::new();
        let mut head = PLAIN;
        head[3] = FNAME;
        assert_eq!(parser.push(&head), Ok(HeaderStatus::Incomplete));

        let piece = vec![b'n'; 16 * 1024];
        for _ in 0..256 {
            assert_eq!(parser.push(&piece), Ok(HeaderStatus::Incomplete));
        }
        assert_eq!(parser.push(b"\0rest"), Ok(HeaderStatus::Complete(1)));
        assert_eq!(parser.header_len(), 10 + 4 * 1024 * 1024 + 1);
    }
}
