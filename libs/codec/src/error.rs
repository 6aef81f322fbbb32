//! Codec errors for wok frame processing
//!
//! Every variant describes a single frame. None of them leave state behind,
//! so a failed decode never affects the next one.

use thiserror::Error;

/// Frame decoding errors with buffer position context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// Leading version byte is not the supported version
    #[error("Unsupported wok version {version}: supported version is {supported}")]
    UnsupportedVersion { version: u8, supported: u8 },

    /// Tag byte not present in the wire type registry
    #[error("Unknown type tag {tag} at offset {offset}")]
    UnknownTypeTag { tag: u8, offset: usize },

    /// Buffer ended before a value's payload was complete
    #[error("Truncated buffer: need {need} bytes at offset {offset}, buffer has {buffer_size} (while reading {context})")]
    TruncatedBuffer {
        need: usize,
        offset: usize,
        buffer_size: usize,
        context: &'static str,
    },

    /// Integer size byte is not one of 8, 16, 32, 64
    #[error("Invalid integer width {width} at offset {offset}: expected 8, 16, 32 or 64")]
    InvalidIntegerWidth { width: u8, offset: usize },

    /// A well-formed value of the wrong kind where the layout requires another
    #[error("Unexpected {found} at offset {offset}: expected {expected}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
        offset: usize,
    },

    /// Container nesting beyond the decoder limit
    #[error("Nesting deeper than {limit} containers at offset {offset}")]
    NestingTooDeep { limit: usize, offset: usize },

    /// Length or count does not fit this platform's address space
    #[error("Length {length} at offset {offset} exceeds addressable size")]
    LengthOverflow { length: u64, offset: usize },
}

impl DecodeError {
    pub fn truncated(need: usize, offset: usize, buffer_size: usize, context: &'static str) -> Self {
        Self::TruncatedBuffer {
            need,
            offset,
            buffer_size,
            context,
        }
    }

    pub fn unexpected(expected: &'static str, found: &'static str, offset: usize) -> Self {
        Self::UnexpectedType {
            expected,
            found,
            offset,
        }
    }

    /// Short stable label for log fields and counters
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::UnsupportedVersion { .. } => "unsupported_version",
            DecodeError::UnknownTypeTag { .. } => "unknown_type_tag",
            DecodeError::TruncatedBuffer { .. } => "truncated_buffer",
            DecodeError::InvalidIntegerWidth { .. } => "invalid_integer_width",
            DecodeError::UnexpectedType { .. } => "unexpected_type",
            DecodeError::NestingTooDeep { .. } => "nesting_too_deep",
            DecodeError::LengthOverflow { .. } => "length_overflow",
        }
    }
}

/// Errors raised while projecting a decoded message into a sink record
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizeError {
    /// Recipient list element that is not a byte string
    #[error("Recipient {index} is a {found}, expected binary")]
    InvalidRecipient { index: usize, found: &'static str },

    /// Map key that is not a byte string
    #[error("Map key is a {found}, expected binary (in {context})")]
    InvalidMapKey {
        found: &'static str,
        context: &'static str,
    },

    /// Body flagged as compressed could not be inflated
    #[error("Decompression failed: {0}")]
    Decompression(String),
}

/// Result type for decode operations
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Result type for normalization
pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;
