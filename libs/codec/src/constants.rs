//! # Wire Constants
//!
//! Protocol-level values shared by the decoder and the builder. They define
//! the frame layout and must stay stable for compatibility with producers.

/// The only frame version this codec understands
pub const WOK_VERSION: u8 = 1;

/// Width in bytes of each big-endian checksum field
pub const CHECKSUM_SIZE: usize = 4;

/// Integer size bytes accepted after an Integer/UnsignedInteger tag
pub const INTEGER_WIDTHS: [u8; 4] = [8, 16, 32, 64];

/// Maximum List/Map nesting accepted by the decoder
///
/// Bounds the recursive descent on untrusted input.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Header key that flags a zlib-compressed body
pub const COMPRESS_HEADER: &str = "compress";
