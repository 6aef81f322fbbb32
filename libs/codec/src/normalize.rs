//! # Message Normalization
//!
//! Projects a [`DecodedMessage`] into the flat [`GenericMessage`] handed to
//! sinks: byte strings become text, header keys become strings, nested
//! header values become JSON values, and a body flagged with
//! `compress: true` is inflated with zlib.
//!
//! A body that fails to inflate does not fail the message. The record is
//! still produced with an empty body and the failure is returned alongside
//! it so the caller can log and count it.

use crate::error::{NormalizeError, NormalizeResult};
use crate::message::DecodedMessage;
use crate::value::{TypedMap, TypedValue};
use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use tracing::warn;

/// Upper bound on an inflated body (64MB)
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Where a frame came from in the upstream stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct FrameOrigin {
    pub partition: i32,
    pub offset: i64,
}

impl FrameOrigin {
    pub fn new(partition: i32, offset: i64) -> Self {
        Self { partition, offset }
    }
}

impl fmt::Display for FrameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.partition, self.offset)
    }
}

/// Sink-ready projection of a wok message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericMessage {
    pub version: i32,
    pub recipients: Vec<String>,
    pub sender: String,
    pub id: String,
    pub headers: BTreeMap<String, Value>,
    pub header_checksum: i32,
    pub body_checksum: i32,
    /// Body bytes, inflated when the message was flagged as compressed
    #[serde(serialize_with = "serialize_lossy")]
    pub body: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub partition: i32,
    pub offset: i64,
}

fn serialize_lossy<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

impl GenericMessage {
    /// Body as text, replacing invalid UTF-8 sequences
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn origin(&self) -> FrameOrigin {
        FrameOrigin::new(self.partition, self.offset)
    }

    /// Document id for sinks: the message id, or the stream position when
    /// the producer sent none
    pub fn document_id(&self) -> String {
        if self.id.is_empty() {
            self.origin().to_string()
        } else {
            self.id.clone()
        }
    }
}

impl fmt::Display for GenericMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===================================")?;
        writeln!(
            f,
            "Version : {}, To: {:?}, From: {}, UUID : {}, Headers : {}, CRCHeader : {}, CRCBody : {}",
            self.version,
            self.recipients,
            self.sender,
            self.id,
            Value::Object(self.headers.clone().into_iter().collect()),
            self.header_checksum,
            self.body_checksum,
        )?;
        write!(f, "Body : {}", self.body_text())
    }
}

/// A normalized record plus the non-fatal decompression failure, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub message: GenericMessage,
    pub decompression_error: Option<NormalizeError>,
}

/// Projects decoded messages into sink records
#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    max_decompressed_size: usize,
}

impl Default for MessageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECOMPRESSED_SIZE)
    }
}

impl MessageNormalizer {
    pub fn new(max_decompressed_size: usize) -> Self {
        Self {
            max_decompressed_size,
        }
    }

    /// Normalize one message
    ///
    /// Fails only on structurally unusable content (non-binary recipients or
    /// header keys). Decompression problems are reported in
    /// [`Normalized::decompression_error`].
    pub fn normalize(
        &self,
        message: DecodedMessage,
        origin: FrameOrigin,
    ) -> NormalizeResult<Normalized> {
        let compressed = message.is_compressed();

        let recipients = message
            .recipients
            .iter()
            .enumerate()
            .map(|(index, recipient)| match recipient {
                TypedValue::Binary(bytes) => Ok(lossy(bytes)),
                other => Err(NormalizeError::InvalidRecipient {
                    index,
                    found: other.kind(),
                }),
            })
            .collect::<NormalizeResult<Vec<_>>>()?;

        let headers = map_to_json(&message.headers, "headers")?;

        let (body, decompression_error) = if compressed {
            match self.inflate(&message.body) {
                Ok(body) => (body, None),
                Err(err) => {
                    warn!(%origin, error = %err, "compressed body could not be inflated, forwarding empty body");
                    (Vec::new(), Some(err))
                }
            }
        } else {
            (message.body, None)
        };

        Ok(Normalized {
            message: GenericMessage {
                version: i32::from(message.version),
                recipients,
                sender: lossy(&message.sender),
                id: lossy(&message.id),
                headers,
                header_checksum: message.header_checksum,
                body_checksum: message.body_checksum,
                body,
                timestamp: message.received_at,
                partition: origin.partition,
                offset: origin.offset,
            },
            decompression_error,
        })
    }

    fn inflate(&self, data: &[u8]) -> NormalizeResult<Vec<u8>> {
        let limit = self.max_decompressed_size as u64;
        let mut out = Vec::new();
        ZlibDecoder::new(data)
            .take(limit + 1)
            .read_to_end(&mut out)
            .map_err(|e| NormalizeError::Decompression(e.to_string()))?;
        if out.len() as u64 > limit {
            return Err(NormalizeError::Decompression(format!(
                "inflated body exceeds {} bytes",
                self.max_decompressed_size
            )));
        }
        Ok(out)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn map_to_json(map: &TypedMap, context: &'static str) -> NormalizeResult<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    for (key, value) in map.iter() {
        let key = match key {
            TypedValue::Binary(bytes) => lossy(bytes),
            other => {
                return Err(NormalizeError::InvalidMapKey {
                    found: other.kind(),
                    context,
                })
            }
        };
        out.insert(key, to_json(value)?);
    }
    Ok(out)
}

/// Convert a typed value into its JSON projection
pub fn to_json(value: &TypedValue) -> NormalizeResult<Value> {
    let json = match value {
        TypedValue::Integer(v) => Value::from(*v),
        TypedValue::UnsignedInteger(v) => Value::from(*v),
        // NaN and infinities have no JSON form
        TypedValue::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        TypedValue::Boolean(v) => Value::Bool(*v),
        TypedValue::Binary(bytes) => Value::String(lossy(bytes)),
        TypedValue::List(values) => Value::Array(
            values
                .iter()
                .map(to_json)
                .collect::<NormalizeResult<Vec<_>>>()?,
        ),
        TypedValue::Map(map) => Value::Object(map_to_json(map, "nested map")?.into_iter().collect()),
    };
    Ok(json)
}
