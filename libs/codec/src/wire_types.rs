//! # Wire Type Registry
//!
//! Every typed value on the wire starts with one tag byte. The set of tags is
//! closed: anything not listed here makes the containing frame undecodable.
//!
//! | tag | kind            | payload                                        |
//! |-----|-----------------|------------------------------------------------|
//! | 1   | Binary          | UnsignedInteger length, then that many bytes   |
//! | 10  | Integer         | size byte (8/16/32/64), big-endian two's comp. |
//! | 11  | UnsignedInteger | size byte (8/16/32/64), big-endian unsigned    |
//! | 20  | Float           | 8 bytes, IEEE-754 double, big-endian           |
//! | 30  | List            | UnsignedInteger count, then that many values   |
//! | 40  | Map             | UnsignedInteger count, then key/value pairs    |
//! | 50  | Boolean false   | none                                           |
//! | 51  | Boolean true    | none                                           |
//! | 60  | Atom            | same framing as Binary                         |

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Leading tag byte of a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum WireTag {
    Binary = 1,
    Integer = 10,
    UnsignedInteger = 11,
    Float = 20,
    List = 30,
    Map = 40,
    False = 50,
    True = 51,
    Atom = 60,
}

impl WireTag {
    /// Human readable name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            WireTag::Binary => "binary",
            WireTag::Integer => "integer",
            WireTag::UnsignedInteger => "unsigned integer",
            WireTag::Float => "float",
            WireTag::List => "list",
            WireTag::Map => "map",
            WireTag::False | WireTag::True => "boolean",
            WireTag::Atom => "atom",
        }
    }

    /// Whether the payload is a length-prefixed byte string
    pub fn is_binary(&self) -> bool {
        matches!(self, WireTag::Binary | WireTag::Atom)
    }

    /// All known tags, in ascending tag order
    pub fn all() -> [WireTag; 9] {
        [
            WireTag::Binary,
            WireTag::Integer,
            WireTag::UnsignedInteger,
            WireTag::Float,
            WireTag::List,
            WireTag::Map,
            WireTag::False,
            WireTag::True,
            WireTag::Atom,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_primitive() {
        assert_eq!(WireTag::try_from(1u8).unwrap(), WireTag::Binary);
        assert_eq!(WireTag::try_from(60u8).unwrap(), WireTag::Atom);
        assert_eq!(WireTag::try_from(50u8).unwrap(), WireTag::False);
        assert_eq!(WireTag::try_from(51u8).unwrap(), WireTag::True);

        assert!(WireTag::try_from(99u8).is_err());
        assert!(WireTag::try_from(0u8).is_err());
    }

    #[test]
    fn test_tags_round_trip_through_u8() {
        for tag in WireTag::all() {
            let byte: u8 = tag.into();
            assert_eq!(WireTag::try_from(byte).unwrap(), tag);
        }
    }

    #[test]
    fn test_binary_family() {
        assert!(WireTag::Binary.is_binary());
        assert!(WireTag::Atom.is_binary());
        assert!(!WireTag::List.is_binary());
    }
}
