//! Structured wok message as read off the wire

use crate::value::{TypedMap, TypedValue};
use chrono::{DateTime, Utc};

/// A fully decoded frame
///
/// Built once by [`crate::parser::decode_message`] and read-only afterwards.
/// Checksums are carried as read; nothing recomputes them.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub(crate) version: u8,
    pub(crate) recipients: Vec<TypedValue>,
    pub(crate) sender: Vec<u8>,
    pub(crate) id: Vec<u8>,
    pub(crate) headers: TypedMap,
    pub(crate) header_checksum: i32,
    pub(crate) body_checksum: i32,
    pub(crate) body: Vec<u8>,
    pub(crate) received_at: DateTime<Utc>,
}

impl DecodedMessage {
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Recipient list elements; producers send byte strings
    pub fn recipients(&self) -> &[TypedValue] {
        &self.recipients
    }

    pub fn sender(&self) -> &[u8] {
        &self.sender
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn headers(&self) -> &TypedMap {
        &self.headers
    }

    pub fn header_checksum(&self) -> i32 {
        self.header_checksum
    }

    pub fn body_checksum(&self) -> i32 {
        self.body_checksum
    }

    /// Body bytes exactly as framed, still compressed if flagged
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Arrival time stamped by the decoder
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Whether the `compress` header is present and true
    pub fn is_compressed(&self) -> bool {
        self.headers
            .get_binary(crate::constants::COMPRESS_HEADER.as_bytes())
            .and_then(TypedValue::as_bool)
            .unwrap_or(false)
    }
}
