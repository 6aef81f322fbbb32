//! Integration tests for wok frame parsing
//!
//! End-to-end decode workflows over frames assembled byte by byte, the way a
//! producer on the other side of the stream writes them.

use codec::{decode_message, decode_value, DecodeError, TypedValue, WokMessageBuilder, WOK_VERSION};
use std::time::{Duration, Instant};

/// Typed-Binary with an 8-bit length
fn binary(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![1, 11, 8, payload.len() as u8];
    out.extend_from_slice(payload);
    out
}

fn frame_with_headers(headers: &[u8]) -> Vec<u8> {
    let mut frame = vec![WOK_VERSION];
    frame.extend([30, 11, 8, 2]);
    frame.extend(binary(b"ops"));
    frame.extend(binary(b"billing"));
    frame.extend(binary(b"monitor"));
    frame.extend(binary(b"5f0c9a"));
    frame.extend_from_slice(headers);
    frame.extend_from_slice(&0x0102_0304i32.to_be_bytes());
    frame.extend_from_slice(&(-1i32).to_be_bytes());
    frame.extend(binary(b"disk almost full"));
    frame
}

#[test]
fn test_complete_frame_decode_workflow() {
    let mut headers = vec![40, 11, 8, 2];
    headers.extend(binary(b"level"));
    headers.extend([10, 8, 200]);
    headers.extend(binary(b"compress"));
    headers.push(50);

    let frame = frame_with_headers(&headers);
    let msg = decode_message(&frame).expect("frame should decode");

    assert_eq!(msg.version(), 1);
    assert_eq!(
        msg.recipients(),
        &[TypedValue::binary("ops"), TypedValue::binary("billing")]
    );
    assert_eq!(msg.sender(), b"monitor");
    assert_eq!(msg.id(), b"5f0c9a");
    assert_eq!(msg.headers().get_binary(b"level"), Some(&TypedValue::Integer(-56)));
    assert_eq!(
        msg.headers().get_binary(b"compress"),
        Some(&TypedValue::Boolean(false))
    );
    assert!(!msg.is_compressed());
    assert_eq!(msg.header_checksum(), 0x0102_0304);
    assert_eq!(msg.body_checksum(), -1);
    assert_eq!(msg.body(), b"disk almost full");
}

#[test]
fn test_unknown_tag_in_headers_fails_whole_frame() {
    let mut headers = vec![40, 11, 8, 1];
    headers.extend(binary(b"k"));
    headers.push(99);

    let frame = frame_with_headers(&headers);
    let err = decode_message(&frame).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownTypeTag { tag: 99, .. }));
}

/// Map of `count` entries with distinct 32-bit integer keys
fn wide_map(count: u32, key: impl Fn(u32) -> Vec<u8>) -> Vec<u8> {
    let mut data = vec![40, 11, 32];
    data.extend_from_slice(&count.to_be_bytes());
    for i in 0..count {
        data.extend(key(i));
        data.push(51);
    }
    data
}

#[test]
fn test_wide_map_decodes_in_linear_time() {
    let count = 100_000;
    let data = wide_map(count, |i| {
        let mut key = vec![10, 32];
        key.extend_from_slice(&(i as i32).to_be_bytes());
        key
    });

    let started = Instant::now();
    let TypedValue::Map(map) = decode_value(&data).unwrap() else {
        panic!("expected a map");
    };
    let elapsed = started.elapsed();

    assert_eq!(map.len(), count as usize);
    assert_eq!(map.get(&TypedValue::Integer(99_999)), Some(&TypedValue::Boolean(true)));
    assert!(elapsed < Duration::from_secs(5), "decode took {:?}", elapsed);
}

#[test]
fn test_wide_binary_keyed_map_keeps_last_write() {
    let count = 100_000;
    // Keys repeat every 50 000 entries
    let data = wide_map(count, |i| {
        let mut key = vec![1, 11, 32];
        let name = format!("k{}", i % 50_000);
        key.extend_from_slice(&(name.len() as u32).to_be_bytes());
        key.extend_from_slice(name.as_bytes());
        key
    });

    let started = Instant::now();
    let TypedValue::Map(map) = decode_value(&data).unwrap() else {
        panic!("expected a map");
    };
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(map.len(), 50_000);
    assert_eq!(map.get_binary(b"k49999"), Some(&TypedValue::Boolean(true)));
}

#[test]
fn test_every_strict_prefix_is_truncated() {
    let frame = WokMessageBuilder::new()
        .recipient("a")
        .sender("b")
        .id("c")
        .header("n", 70_000u64)
        .checksums(1, 2)
        .body("body")
        .build();

    assert!(decode_message(&frame).is_ok());
    for len in 0..frame.len() {
        let err = decode_message(&frame[..len]).unwrap_err();
        assert!(
            matches!(err, DecodeError::TruncatedBuffer { .. }),
            "prefix of {} bytes gave {:?}",
            len,
            err
        );
    }
}

#[test]
fn test_failed_decode_does_not_affect_next_decode() {
    let good = WokMessageBuilder::new().id("after").body("ok").build();

    assert!(decode_message(&[7, 1, 2, 3]).is_err());
    assert!(decode_message(&good[..good.len() - 1]).is_err());

    let msg = decode_message(&good).unwrap();
    assert_eq!(msg.id(), b"after");
    assert_eq!(msg.body(), b"ok");
}

#[test]
fn test_error_messages_carry_context() {
    let err = decode_message(&[3]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported wok version 3: supported version is 1"
    );
    assert_eq!(err.kind(), "unsupported_version");

    let err = decode_message(&[1, 30, 11, 8]).unwrap_err();
    assert!(err.to_string().contains("unsigned payload"));
    assert_eq!(err.kind(), "truncated_buffer");
}
