//! # Wok Codec
//!
//! ## Purpose
//!
//! Decoding rules for wok messages, the self-describing binary frames read
//! from the upstream log stream:
//! - Wire type registry and protocol constants
//! - Recursive typed value decoding into an owned value tree
//! - Complete frame decoding into a [`DecodedMessage`]
//! - Normalization into the flat [`GenericMessage`] sinks consume
//! - A frame builder for producing byte-exact frames
//!
//! ## Architecture Role
//!
//! ```text
//! raw frame bytes → [parser] → DecodedMessage → [normalize] → GenericMessage → sinks
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Stream consumption or partition handling (belongs in services/bridge)
//! - Sink delivery (belongs in message-sink)
//! - Checksum verification: header and body checksums are carried through
//!   as metadata

pub mod builder;
pub mod constants;
pub mod error;
pub mod message;
pub mod normalize;
pub mod parser;
pub mod value;
pub mod wire_types;

pub use builder::{
    encode_value, encode_value_to_vec, write_signed_with_width, write_unsigned_with_width,
    zlib_compress, BuildError, IntegerWidth, WokMessageBuilder,
};
pub use constants::*;
pub use error::{DecodeError, DecodeResult, NormalizeError, NormalizeResult};
pub use message::DecodedMessage;
pub use normalize::{FrameOrigin, GenericMessage, MessageNormalizer, Normalized};
pub use parser::{decode_message, decode_value, WokReader};
pub use value::{TypedMap, TypedValue};
pub use wire_types::WireTag;
