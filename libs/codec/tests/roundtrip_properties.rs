//! Property tests: builder output always decodes back to the same tree, and
//! arbitrary input never panics the decoder.

use codec::{
    decode_message, decode_value, encode_value_to_vec, write_signed_with_width,
    write_unsigned_with_width, IntegerWidth, TypedValue, WokMessageBuilder,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn binary() -> impl Strategy<Value = TypedValue> {
    vec(any::<u8>(), 0..48).prop_map(TypedValue::Binary)
}

fn leaf() -> impl Strategy<Value = TypedValue> {
    prop_oneof![
        any::<i64>().prop_map(TypedValue::Integer),
        any::<u64>().prop_map(TypedValue::UnsignedInteger),
        // NaN never compares equal to itself
        any::<f64>()
            .prop_filter("not NaN", |v| !v.is_nan())
            .prop_map(TypedValue::Float),
        any::<bool>().prop_map(TypedValue::Boolean),
        binary(),
    ]
}

fn typed_value() -> impl Strategy<Value = TypedValue> {
    leaf().prop_recursive(5, 96, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..6).prop_map(TypedValue::List),
            vec((binary(), inner), 0..6)
                .prop_map(|entries| TypedValue::Map(entries.into_iter().collect())),
        ]
    })
}

fn width() -> impl Strategy<Value = IntegerWidth> {
    prop_oneof![
        Just(IntegerWidth::W8),
        Just(IntegerWidth::W16),
        Just(IntegerWidth::W32),
        Just(IntegerWidth::W64),
    ]
}

proptest! {
    #[test]
    fn value_tree_round_trips(value in typed_value()) {
        let bytes = encode_value_to_vec(&value);
        prop_assert_eq!(decode_value(&bytes).unwrap(), value);
    }

    #[test]
    fn forced_width_integers_round_trip(value in any::<i8>(), unsigned in any::<u8>(), width in width()) {
        let mut out = Vec::new();
        write_signed_with_width(value as i64, width, &mut out).unwrap();
        prop_assert_eq!(decode_value(&out).unwrap(), TypedValue::Integer(value as i64));

        let mut out = Vec::new();
        write_unsigned_with_width(unsigned as u64, width, &mut out).unwrap();
        prop_assert_eq!(decode_value(&out).unwrap(), TypedValue::UnsignedInteger(unsigned as u64));
    }

    #[test]
    fn built_frames_decode(
        recipients in vec("[a-z]{0,12}", 0..4),
        id in "[0-9a-f]{0,32}",
        body in vec(any::<u8>(), 0..512),
        header_checksum in any::<i32>(),
        body_checksum in any::<i32>(),
        extra in typed_value(),
    ) {
        let mut builder = WokMessageBuilder::new()
            .sender("prop")
            .id(id.clone())
            .header("extra", extra.clone())
            .checksums(header_checksum, body_checksum)
            .body(body.clone());
        for recipient in &recipients {
            builder = builder.recipient(recipient.clone());
        }

        let msg = decode_message(&builder.build()).unwrap();
        prop_assert_eq!(msg.recipients().len(), recipients.len());
        prop_assert_eq!(msg.id(), id.as_bytes());
        prop_assert_eq!(msg.headers().get_binary(b"extra"), Some(&extra));
        prop_assert_eq!(msg.header_checksum(), header_checksum);
        prop_assert_eq!(msg.body_checksum(), body_checksum);
        prop_assert_eq!(msg.body(), &body[..]);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in vec(any::<u8>(), 0..256)) {
        let _ = decode_message(&data);
        let _ = decode_value(&data);
    }
}
