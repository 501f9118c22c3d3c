#![allow(clippy::unwrap_used, clippy::expect_used)]

use hex_literal::hex;
use spiffy_cbor::{
    DecodeLimits, DecodeMode, Decoder, ErrorCode, PoolAllocator, Span, StringAllocator, Value, VecAllocator,
};

#[test]
fn indefinite_bytes_are_coalesced_into_the_pool() {
    let bytes = hex!("5f 41 61 41 62 ff");
    let mut buf = [0u8; 16];
    let mut pool = PoolAllocator::new(&mut buf);
    {
        let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
        d.set_allocator(&mut pool, false);

        let item = d.next_item().unwrap();
        assert!(item.value_allocated());
        let Value::Bytes(span) = item.value else {
            panic!("expected bytes, got {:?}", item.value);
        };
        assert_eq!(span.len(), 2);
        assert_eq!(d.bytes(&span), b"ab");
        assert_eq!(d.partial_finish().unwrap(), bytes.len());
        d.finish().unwrap();
    }
    // finish runs the destructor.
    assert_eq!(pool.used(), 0);
}

#[test]
fn indefinite_string_without_allocator_fails_cleanly() {
    let bytes = hex!("5f 41 61 41 62 ff");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    let err = d.next_item().unwrap_err();
    assert_eq!(err.code, ErrorCode::NoStringAllocator);
    assert!(err.is_unrecoverable());
}

#[test]
fn indefinite_text_inside_array() {
    let bytes = hex!("82 7f 61 61 62 62 63 ff 01");
    let mut alloc = VecAllocator::new();
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.set_allocator(&mut alloc, false);

    d.next_item().unwrap();
    let item = d.next_item().unwrap();
    let Value::Text(span) = item.value else {
        panic!("expected text, got {:?}", item.value);
    };
    assert_eq!(d.text(&span).unwrap(), "abc");
    assert_eq!((item.nest_level, item.next_nest_level), (1, 1));
    assert_eq!(d.next_item().unwrap().value, Value::Int(1));
    d.finish().unwrap();
}

#[test]
fn empty_indefinite_string() {
    let bytes = hex!("5f ff");
    let mut alloc = VecAllocator::new();
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.set_allocator(&mut alloc, false);
    let item = d.next_item().unwrap();
    assert!(matches!(item.value, Value::Bytes(Span::Allocated(h)) if h.is_empty()));
    d.finish().unwrap();
}

#[test]
fn chunk_errors() {
    let cases: &[&[u8]] = &[
        // text chunk in a byte string
        &[0x5f, 0x61, 0x61, 0xff],
        // nested indefinite chunk
        &[0x5f, 0x5f, 0xff, 0xff],
        // integer chunk
        &[0x7f, 0x01, 0xff],
    ];
    for bytes in cases {
        let mut alloc = VecAllocator::new();
        let mut d = Decoder::new(bytes, DecodeMode::NORMAL).unwrap();
        d.set_allocator(&mut alloc, false);
        assert_eq!(
            d.next_item().unwrap_err().code,
            ErrorCode::IndefiniteStringChunk,
            "input {bytes:02x?}"
        );
    }
}

#[test]
fn missing_break_hits_end() {
    let bytes = hex!("5f 41 61");
    let mut alloc = VecAllocator::new();
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.set_allocator(&mut alloc, false);
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::HitEnd);
}

#[test]
fn exhausted_pool_frees_partial_string() {
    let bytes = hex!("5f 41 61 41 62 ff");
    let mut buf = [0u8; 1];
    let mut pool = PoolAllocator::new(&mut buf);
    {
        let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
        d.set_allocator(&mut pool, false);
        let err = d.next_item().unwrap_err();
        assert_eq!(err.code, ErrorCode::StringAllocateFailed);
        assert!(err.is_unrecoverable());
    }
    assert_eq!(pool.used(), 0);
}

#[test]
fn vec_allocator_limit() {
    let bytes = hex!("5f 43 01 02 03 ff");
    let mut alloc = VecAllocator::with_limit(2);
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.set_allocator(&mut alloc, false);
    assert_eq!(
        d.next_item().unwrap_err().code,
        ErrorCode::StringAllocateFailed
    );
}

#[test]
fn allocate_all_copies_definite_strings() {
    let bytes = hex!("a1 61 6b 42 01 02");
    let mut alloc = VecAllocator::new();
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.set_allocator(&mut alloc, true);

    d.next_item().unwrap();
    let item = d.next_item().unwrap();
    assert!(item.value_allocated());
    assert!(item.label_allocated());
    let span = item.value.span().unwrap();
    assert_eq!(d.bytes(&span), &[0x01, 0x02]);
    d.finish().unwrap();
}

#[test]
fn indefinite_strings_can_be_forbidden() {
    let bytes = hex!("5f 41 61 ff");
    let mut alloc = VecAllocator::new();
    let mut d = Decoder::new(&bytes, DecodeMode::NO_INDEFINITE_LENGTH).unwrap();
    d.set_allocator(&mut alloc, false);
    assert_eq!(
        d.next_item().unwrap_err().code,
        ErrorCode::IndefiniteLengthForbidden
    );
}

#[test]
fn pool_allocator_contract() {
    let mut buf = [0u8; 8];
    let mut pool = PoolAllocator::new(&mut buf);
    let a = pool.allocate(2).unwrap();
    pool.bytes_mut(a).copy_from_slice(b"xy");
    let a = pool.reallocate(a, 4).unwrap();
    assert_eq!(&pool.bytes(a)[..2], b"xy");
    assert_eq!(pool.used(), 4);
    assert!(pool.allocate(5).is_none());
    pool.free(a);
    assert_eq!(pool.used(), 0);
    assert_eq!(pool.capacity(), 8);
}

#[test]
fn invalid_utf8_is_reported_on_request() {
    let bytes = hex!("62 c3 28");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    let item = d.next_item().unwrap();
    let Value::Text(span) = item.value else {
        panic!("expected text");
    };
    assert_eq!(span.as_borrowed(), Some(&[0xc3, 0x28][..]));
    let err = d.text(&span).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidUtf8);
    assert_eq!(err.offset, 1);
}

#[test]
fn assembled_length_is_capped() {
    let limits = DecodeLimits {
        max_string_len: 4,
        ..DecodeLimits::default()
    };

    // Each chunk fits, the total does not.
    let bytes = hex!("5f 43 01 02 03 43 04 05 06 ff");
    let mut buf = [0u8; 16];
    let mut pool = PoolAllocator::new(&mut buf);
    {
        let mut d = Decoder::with_limits(&bytes, DecodeMode::NORMAL, limits).unwrap();
        d.set_allocator(&mut pool, false);
        let err = d.next_item().unwrap_err();
        assert_eq!(err.code, ErrorCode::StringTooLong);
        assert_eq!(err.offset, 5);
        assert!(err.is_unrecoverable());
    }
    // The partial string is freed.
    assert_eq!(pool.used(), 0);

    let bytes = hex!("5f 42 01 02 42 03 04 ff");
    let mut alloc = VecAllocator::new();
    let mut d = Decoder::with_limits(&bytes, DecodeMode::NORMAL, limits).unwrap();
    d.set_allocator(&mut alloc, false);
    let Value::Bytes(span) = d.next_item().unwrap().value else {
        panic!("expected bytes");
    };
    assert_eq!(d.bytes(&span), &[1, 2, 3, 4]);
    d.finish().unwrap();
}
