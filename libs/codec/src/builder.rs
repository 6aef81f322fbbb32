//! # Wok Frame Builder
//!
//! Inverse of the parser. Producers of wok frames live outside this
//! workspace; the builder exists so fixtures, tests and tooling can create
//! byte-exact frames without hand-assembling tag bytes.
//!
//! Integers are written at the narrowest width that holds them unless a
//! width is forced through [`write_signed_with_width`] or
//! [`write_unsigned_with_width`].

use crate::constants::{COMPRESS_HEADER, WOK_VERSION};
use crate::value::{TypedMap, TypedValue};
use crate::wire_types::WireTag;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Integer payload width on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntegerWidth {
    /// Size byte written after the tag
    pub fn bits(&self) -> u8 {
        match self {
            IntegerWidth::W8 => 8,
            IntegerWidth::W16 => 16,
            IntegerWidth::W32 => 32,
            IntegerWidth::W64 => 64,
        }
    }

    fn for_signed(value: i64) -> Self {
        if i8::try_from(value).is_ok() {
            IntegerWidth::W8
        } else if i16::try_from(value).is_ok() {
            IntegerWidth::W16
        } else if i32::try_from(value).is_ok() {
            IntegerWidth::W32
        } else {
            IntegerWidth::W64
        }
    }

    fn for_unsigned(value: u64) -> Self {
        if u8::try_from(value).is_ok() {
            IntegerWidth::W8
        } else if u16::try_from(value).is_ok() {
            IntegerWidth::W16
        } else if u32::try_from(value).is_ok() {
            IntegerWidth::W32
        } else {
            IntegerWidth::W64
        }
    }
}

/// Build errors for explicit-width encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Value does not fit in the requested width
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: i128, bits: u8 },
}

/// Write an Integer at an explicit width
pub fn write_signed_with_width(
    value: i64,
    width: IntegerWidth,
    out: &mut Vec<u8>,
) -> Result<(), BuildError> {
    let out_of_range = |_| BuildError::ValueOutOfRange {
        value: value as i128,
        bits: width.bits(),
    };
    let payload = match width {
        IntegerWidth::W8 => i8::try_from(value).map_err(out_of_range)?.to_be_bytes().to_vec(),
        IntegerWidth::W16 => i16::try_from(value).map_err(out_of_range)?.to_be_bytes().to_vec(),
        IntegerWidth::W32 => i32::try_from(value).map_err(out_of_range)?.to_be_bytes().to_vec(),
        IntegerWidth::W64 => value.to_be_bytes().to_vec(),
    };
    out.push(WireTag::Integer.into());
    out.push(width.bits());
    out.extend_from_slice(&payload);
    Ok(())
}

/// Write an UnsignedInteger at an explicit width
pub fn write_unsigned_with_width(
    value: u64,
    width: IntegerWidth,
    out: &mut Vec<u8>,
) -> Result<(), BuildError> {
    let out_of_range = |_| BuildError::ValueOutOfRange {
        value: value as i128,
        bits: width.bits(),
    };
    let payload = match width {
        IntegerWidth::W8 => u8::try_from(value).map_err(out_of_range)?.to_be_bytes().to_vec(),
        IntegerWidth::W16 => u16::try_from(value).map_err(out_of_range)?.to_be_bytes().to_vec(),
        IntegerWidth::W32 => u32::try_from(value).map_err(out_of_range)?.to_be_bytes().to_vec(),
        IntegerWidth::W64 => value.to_be_bytes().to_vec(),
    };
    out.push(WireTag::UnsignedInteger.into());
    out.push(width.bits());
    out.extend_from_slice(&payload);
    Ok(())
}

fn write_signed(value: i64, out: &mut Vec<u8>) {
    // Narrowest width always fits
    let _ = write_signed_with_width(value, IntegerWidth::for_signed(value), out);
}

fn write_unsigned(value: u64, out: &mut Vec<u8>) {
    let _ = write_unsigned_with_width(value, IntegerWidth::for_unsigned(value), out);
}

fn write_binary(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(WireTag::Binary.into());
    write_unsigned(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

/// Append the wire form of `value` to `out`
pub fn encode_value(value: &TypedValue, out: &mut Vec<u8>) {
    match value {
        TypedValue::Integer(v) => write_signed(*v, out),
        TypedValue::UnsignedInteger(v) => write_unsigned(*v, out),
        TypedValue::Float(v) => {
            out.push(WireTag::Float.into());
            out.extend_from_slice(&v.to_be_bytes());
        }
        TypedValue::Boolean(false) => out.push(WireTag::False.into()),
        TypedValue::Boolean(true) => out.push(WireTag::True.into()),
        TypedValue::Binary(bytes) => write_binary(bytes, out),
        TypedValue::List(values) => {
            out.push(WireTag::List.into());
            write_unsigned(values.len() as u64, out);
            for value in values {
                encode_value(value, out);
            }
        }
        TypedValue::Map(map) => {
            out.push(WireTag::Map.into());
            write_unsigned(map.len() as u64, out);
            for (key, value) in map.iter() {
                encode_value(key, out);
                encode_value(value, out);
            }
        }
    }
}

/// Wire form of a single value
pub fn encode_value_to_vec(value: &TypedValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value(value, &mut out);
    out
}

/// zlib-compress a body the way producers flag with `compress: true`
pub fn zlib_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Builder for complete wok frames
#[derive(Debug, Clone, Default)]
pub struct WokMessageBuilder {
    recipients: Vec<TypedValue>,
    sender: Vec<u8>,
    id: Vec<u8>,
    headers: TypedMap,
    header_checksum: i32,
    body_checksum: i32,
    body: Vec<u8>,
}

impl WokMessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipient(mut self, recipient: impl Into<Vec<u8>>) -> Self {
        self.recipients.push(TypedValue::Binary(recipient.into()));
        self
    }

    /// Add a recipient of any kind, including ones normalization rejects
    pub fn raw_recipient(mut self, recipient: TypedValue) -> Self {
        self.recipients.push(recipient);
        self
    }

    pub fn sender(mut self, sender: impl Into<Vec<u8>>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn id(mut self, id: impl Into<Vec<u8>>) -> Self {
        self.id = id.into();
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<TypedValue>) -> Self {
        self.headers.insert(TypedValue::from(key), value.into());
        self
    }

    /// Add a header with an arbitrary key value
    pub fn raw_header(mut self, key: TypedValue, value: TypedValue) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn checksums(mut self, header_checksum: i32, body_checksum: i32) -> Self {
        self.header_checksum = header_checksum;
        self.body_checksum = body_checksum;
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Compress `body` and set the `compress` header
    pub fn compressed_body(self, body: &[u8]) -> io::Result<Self> {
        let compressed = zlib_compress(body)?;
        Ok(self.header(COMPRESS_HEADER, true).body(compressed))
    }

    /// Assemble the frame bytes
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![WOK_VERSION];
        out.push(WireTag::List.into());
        write_unsigned(self.recipients.len() as u64, &mut out);
        for recipient in &self.recipients {
            encode_value(recipient, &mut out);
        }
        write_binary(&self.sender, &mut out);
        write_binary(&self.id, &mut out);
        encode_value(&TypedValue::Map(self.headers.clone()), &mut out);
        out.extend_from_slice(&self.header_checksum.to_be_bytes());
        out.extend_from_slice(&self.body_checksum.to_be_bytes());
        write_binary(&self.body, &mut out);
        out
    }
}
