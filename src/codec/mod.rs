//! Gzip member codec.
//!
//! The compress side turns one bounded chunk into a complete, independently
//! decodable gzip member. The decompress side is an incremental session that
//! accepts compressed bytes in arbitrary pieces and walks any number of
//! back-to-back members.

pub mod header;
pub mod inflate;
pub mod member;

pub use inflate::{Feed, InflateSession, MemberInfo};
pub use member::compress_member;
