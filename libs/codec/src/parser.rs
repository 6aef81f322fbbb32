//! # Wok Frame Parser
//!
//! Recursive descent over a single forward cursor. Every read is bounds
//! checked against the remaining buffer before anything is allocated, and
//! the first malformed byte aborts the whole frame: callers either get a
//! complete [`DecodedMessage`] or an error, never a partial tree.
//!
//! ## Frame layout
//!
//! ```text
//! u8       version (must be 1)
//! value    recipients  List<Binary>
//! value    sender      Binary
//! value    message id  Binary
//! value    headers     Map<Binary, any>
//! i32 BE   header checksum
//! i32 BE   body checksum
//! value    body        Binary
//! ```

use crate::constants::{CHECKSUM_SIZE, INTEGER_WIDTHS, MAX_NESTING_DEPTH, WOK_VERSION};
use crate::error::{DecodeError, DecodeResult};
use crate::message::DecodedMessage;
use crate::value::{TypedMap, TypedValue};
use crate::wire_types::WireTag;
use chrono::Utc;
use tracing::debug;

/// Forward-only reader over one frame
#[derive(Debug)]
pub struct WokReader<'a> {
    data: &'a [u8],
    offset: usize,
    depth: usize,
}

impl<'a> WokReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            depth: 0,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, need: usize, context: &'static str) -> DecodeResult<&'a [u8]> {
        if self.remaining() < need {
            return Err(DecodeError::truncated(
                need,
                self.offset,
                self.data.len(),
                context,
            ));
        }
        let bytes = &self.data[self.offset..self.offset + need];
        self.offset += need;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, context: &'static str) -> DecodeResult<[u8; N]> {
        let bytes = self.take(N, context)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub fn read_u8(&mut self, context: &'static str) -> DecodeResult<u8> {
        Ok(self.take_array::<1>(context)?[0])
    }

    pub fn read_i32(&mut self, context: &'static str) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.take_array::<CHECKSUM_SIZE>(context)?))
    }

    fn read_tag(&mut self) -> DecodeResult<WireTag> {
        let offset = self.offset;
        let tag = self.read_u8("type tag")?;
        WireTag::try_from(tag).map_err(|_| DecodeError::UnknownTypeTag { tag, offset })
    }

    fn read_width(&mut self) -> DecodeResult<u8> {
        let offset = self.offset;
        let width = self.read_u8("integer width")?;
        if !INTEGER_WIDTHS.contains(&width) {
            return Err(DecodeError::InvalidIntegerWidth { width, offset });
        }
        Ok(width)
    }

    fn read_signed(&mut self) -> DecodeResult<i64> {
        let value = match self.read_width()? {
            8 => i64::from(self.take_array::<1>("integer payload")?[0] as i8),
            16 => i64::from(i16::from_be_bytes(self.take_array("integer payload")?)),
            32 => i64::from(i32::from_be_bytes(self.take_array("integer payload")?)),
            _ => i64::from_be_bytes(self.take_array("integer payload")?),
        };
        Ok(value)
    }

    fn read_unsigned(&mut self) -> DecodeResult<u64> {
        let value = match self.read_width()? {
            8 => u64::from(self.take_array::<1>("unsigned payload")?[0]),
            16 => u64::from(u16::from_be_bytes(self.take_array("unsigned payload")?)),
            32 => u64::from(u32::from_be_bytes(self.take_array("unsigned payload")?)),
            _ => u64::from_be_bytes(self.take_array("unsigned payload")?),
        };
        Ok(value)
    }

    /// Nested UnsignedInteger used as a byte length or element count
    fn read_length(&mut self) -> DecodeResult<usize> {
        let offset = self.offset;
        let tag = self.read_tag()?;
        if tag != WireTag::UnsignedInteger {
            return Err(DecodeError::unexpected(
                WireTag::UnsignedInteger.name(),
                tag.name(),
                offset,
            ));
        }
        let length = self.read_unsigned()?;
        usize::try_from(length).map_err(|_| DecodeError::LengthOverflow { length, offset })
    }

    fn enter_container(&mut self) -> DecodeResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                offset: self.offset,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Decode the next typed value
    pub fn read_value(&mut self) -> DecodeResult<TypedValue> {
        match self.read_tag()? {
            WireTag::Binary | WireTag::Atom => {
                let length = self.read_length()?;
                Ok(TypedValue::Binary(self.take(length, "binary payload")?.to_vec()))
            }
            WireTag::Integer => self.read_signed().map(TypedValue::Integer),
            WireTag::UnsignedInteger => self.read_unsigned().map(TypedValue::UnsignedInteger),
            WireTag::Float => Ok(TypedValue::Float(f64::from_be_bytes(
                self.take_array("float payload")?,
            ))),
            WireTag::List => {
                let count = self.read_length()?;
                self.enter_container()?;
                // Every element is at least one byte
                let mut values = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    values.push(self.read_value()?);
                }
                self.depth -= 1;
                Ok(TypedValue::List(values))
            }
            WireTag::Map => {
                let count = self.read_length()?;
                self.enter_container()?;
                let mut map = TypedMap::with_capacity(count.min(self.remaining() / 2));
                for _ in 0..count {
                    let key = self.read_value()?;
                    let value = self.read_value()?;
                    map.insert(key, value);
                }
                self.depth -= 1;
                Ok(TypedValue::Map(map))
            }
            WireTag::False => Ok(TypedValue::Boolean(false)),
            WireTag::True => Ok(TypedValue::Boolean(true)),
        }
    }

    fn read_list(&mut self) -> DecodeResult<Vec<TypedValue>> {
        let offset = self.offset;
        match self.read_value()? {
            TypedValue::List(values) => Ok(values),
            other => Err(DecodeError::unexpected("list", other.kind(), offset)),
        }
    }

    fn read_binary(&mut self) -> DecodeResult<Vec<u8>> {
        let offset = self.offset;
        match self.read_value()? {
            TypedValue::Binary(bytes) => Ok(bytes),
            other => Err(DecodeError::unexpected("binary", other.kind(), offset)),
        }
    }

    fn read_map(&mut self) -> DecodeResult<TypedMap> {
        let offset = self.offset;
        match self.read_value()? {
            TypedValue::Map(map) => Ok(map),
            other => Err(DecodeError::unexpected("map", other.kind(), offset)),
        }
    }
}

/// Decode a single typed value from the start of `data`
pub fn decode_value(data: &[u8]) -> DecodeResult<TypedValue> {
    WokReader::new(data).read_value()
}

/// Decode a complete wok frame
///
/// The version byte is checked before anything else is read. Trailing bytes
/// after the body are ignored.
pub fn decode_message(data: &[u8]) -> DecodeResult<DecodedMessage> {
    let mut reader = WokReader::new(data);

    let version = reader.read_u8("version")?;
    if version != WOK_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            version,
            supported: WOK_VERSION,
        });
    }

    let recipients = reader.read_list()?;
    let sender = reader.read_binary()?;
    let id = reader.read_binary()?;
    let headers = reader.read_map()?;
    let header_checksum = reader.read_i32("header checksum")?;
    let body_checksum = reader.read_i32("body checksum")?;
    let body = reader.read_binary()?;

    if reader.remaining() > 0 {
        debug!(
            trailing = reader.remaining(),
            frame_size = data.len(),
            "ignoring trailing bytes after wok body"
        );
    }

    Ok(DecodedMessage {
        version,
        recipients,
        sender,
        id,
        headers,
        header_checksum,
        body_checksum,
        body,
        received_at: Utc::now(),
    })
}
