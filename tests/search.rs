#![allow(clippy::unwrap_used, clippy::expect_used)]

use hex_literal::hex;
use spiffy_cbor::{
    CborError, DecodeMode, Decoder, ErrorCode, Expect, ExpMantissa, ItemType, Label, MapLabel,
    Mantissa, SearchEntry, Select, TagRequirement, Value, MAX_SEARCH_LABELS,
};

// {1: "a", 2: true, "x": 3, 4: [5, 6]}
const MAP: [u8; 13] = hex!("a4 01 61 61 02 f5 61 78 03 04 82 05 06");

#[test]
fn batch_lookup_fills_entries() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    let header = d.enter_map().unwrap();
    assert_eq!(header.item_type(), ItemType::Map);
    let start = d.tell();

    let mut entries = [
        SearchEntry::int(4, Expect::Type(ItemType::Array)),
        SearchEntry::text("x", Expect::Any),
        SearchEntry::int(2, Expect::Type(ItemType::Bool)),
        SearchEntry::int(9, Expect::Any),
    ];
    d.get_items_in_map(&mut entries).unwrap();

    let array = entries[0].found().unwrap();
    assert_eq!(array.nest_level, 1);
    assert_eq!(entries[1].item.unwrap().value, Value::Int(3));
    assert!(matches!(entries[1].item.unwrap().label, Label::Text(_)));
    assert_eq!(entries[2].item.unwrap().value, Value::Bool(true));
    assert!(entries[3].item.is_none());

    // Searching does not move the cursor.
    assert_eq!(d.tell(), start);
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn single_lookup() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();

    let item = d.get_item_in_map(MapLabel::Int(1), Expect::Any).unwrap();
    let Value::Text(span) = item.value else {
        panic!("expected text, got {:?}", item.value);
    };
    assert_eq!(d.text(&span).unwrap(), "a");
    assert_eq!(item.label, Label::Int(1));

    // unsigned label form matches too
    let item = d.get_item_in_map(MapLabel::UInt(2), Expect::Any).unwrap();
    assert_eq!(item.value, Value::Bool(true));

    let err = d
        .get_item_in_map(MapLabel::Int(1), Expect::Type(ItemType::Int64))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedType);

    let err = d
        .get_item_in_map(MapLabel::Text("nope"), Expect::Any)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::LabelNotFound);

    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn sequential_reads_after_search() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    d.get_item_in_map(MapLabel::Int(4), Expect::Any).unwrap();

    let first = d.next_item().unwrap();
    assert_eq!(first.label, Label::Int(1));
    assert_eq!((first.nest_level, first.next_nest_level), (1, 1));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn enter_array_by_label() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();

    let header = d.enter_array_by_label(MapLabel::Int(4)).unwrap();
    assert_eq!(header.item_type(), ItemType::Array);
    assert_eq!(d.get_i64(Select::Next).unwrap(), 5);
    assert_eq!(d.get_i64(Select::Next).unwrap(), 6);
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::NoMoreItems);
    d.exit_array().unwrap();

    // Back in the map, with nothing left after the array.
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::NoMoreItems);
    assert_eq!(d.get_i64(Select::text("x")).unwrap(), 3);
    d.exit_map().unwrap();
    assert_eq!(d.tell(), MAP.len());
    d.finish().unwrap();
}

#[test]
fn exit_skips_unread_members() {
    let bytes = hex!("82 a2 01 82 02 03 04 05 06");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_array().unwrap();
    d.enter_map().unwrap();
    d.exit_map().unwrap();
    let item = d.next_item().unwrap();
    assert_eq!(item.value, Value::Int(6));
    assert_eq!((item.nest_level, item.next_nest_level), (1, 0));
    d.exit_array().unwrap();
    d.finish().unwrap();
}

#[test]
fn exit_must_match_entered_kind() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    assert_eq!(d.exit_map().unwrap_err().code, ErrorCode::ExitMismatch);
    d.enter_map().unwrap();
    assert_eq!(d.exit_array().unwrap_err().code, ErrorCode::ExitMismatch);
    assert_eq!(
        d.enter_array().unwrap_err().code,
        ErrorCode::UnexpectedType
    );
}

#[test]
fn requested_duplicate_is_an_error() {
    let bytes = hex!("a2 01 01 01 02");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    let err = d
        .get_item_in_map(MapLabel::Int(1), Expect::Any)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateLabel);
    assert_eq!(err.offset, 3);
}

#[test]
fn unrequested_duplicate_is_ignored() {
    let bytes = hex!("a3 01 01 01 02 02 03");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    assert_eq!(d.get_i64(Select::int(2)).unwrap(), 3);
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn search_requires_an_entered_map() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    assert_eq!(
        d.get_item_in_map(MapLabel::Int(1), Expect::Any)
            .unwrap_err()
            .code,
        ErrorCode::MapNotEntered
    );

    let bytes = hex!("82 01 02");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_array().unwrap();
    assert_eq!(
        d.get_item_in_map(MapLabel::Int(0), Expect::Any)
            .unwrap_err()
            .code,
        ErrorCode::MapNotEntered
    );
}

#[test]
fn too_many_labels() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    let mut entries = [SearchEntry::int(0, Expect::Any); MAX_SEARCH_LABELS + 1];
    assert_eq!(
        d.get_items_in_map(&mut entries).unwrap_err().code,
        ErrorCode::TooManySearchLabels
    );
}

#[test]
fn rewind_restarts_the_bounded_level() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    d.next_item().unwrap();
    d.next_item().unwrap();
    d.rewind();
    let item = d.next_item().unwrap();
    assert_eq!(item.label, Label::Int(1));

    // At the top level, rewind goes back to the start of the input.
    let bytes = hex!("01 02");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.next_item().unwrap();
    d.next_item().unwrap();
    d.rewind();
    assert_eq!(d.tell(), 0);
    assert_eq!(d.next_item().unwrap().value, Value::Int(1));
}

#[test]
fn callback_sees_unmatched_members() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();

    let mut entries = [SearchEntry::int(1, Expect::Any)];
    let mut seen = Vec::new();
    d.get_items_in_map_with_callback(&mut entries, &mut |item| {
        seen.push(item.item_type());
        Ok(())
    })
    .unwrap();
    assert!(entries[0].item.is_some());
    assert_eq!(
        seen,
        [ItemType::Bool, ItemType::Int64, ItemType::Array]
    );
}

#[test]
fn callback_error_ends_the_search() {
    let mut d = Decoder::new(&MAP, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();

    let mut calls = 0;
    let err = d
        .get_items_in_map_with_callback(&mut [], &mut |_| {
            calls += 1;
            Err(CborError::new(ErrorCode::CallbackFailed, 0))
        })
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CallbackFailed);
    assert_eq!(calls, 1);
}

#[test]
fn empty_map_by_label() {
    let bytes = hex!("a1 01 a0");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    d.enter_map_by_label(MapLabel::Int(1)).unwrap();
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::NoMoreItems);
    assert_eq!(
        d.get_item_in_map(MapLabel::Int(1), Expect::Any)
            .unwrap_err()
            .code,
        ErrorCode::LabelNotFound
    );
    d.exit_map().unwrap();
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn empty_containers_at_top_level() {
    let bytes = hex!("80 a0");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_array().unwrap();
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::NoMoreItems);
    d.exit_array().unwrap();
    d.enter_map().unwrap();
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn indefinite_map_search() {
    let bytes = hex!("bf 01 02 03 9f 04 ff ff");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    assert_eq!(d.get_i64(Select::int(1)).unwrap(), 2);
    d.enter_array_by_label(MapLabel::Int(3)).unwrap();
    assert_eq!(d.get_i64(Select::Next).unwrap(), 4);
    d.exit_array().unwrap();
    d.exit_map().unwrap();
    assert_eq!(d.tell(), bytes.len());
    d.finish().unwrap();
}

#[test]
fn bstr_wrapped_by_label() {
    let bytes = hex!("a1 01 42 01 02");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    let wrapped = d
        .enter_bstr_wrapped_by_label(MapLabel::Int(1), TagRequirement::NotATag)
        .unwrap();
    assert_eq!(wrapped, &[0x01, 0x02]);
    assert_eq!(d.next_item().unwrap().value, Value::Int(1));
    assert_eq!(d.next_item().unwrap().value, Value::Int(2));
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::NoMoreItems);
    d.exit_bstr_wrapped().unwrap();
    d.exit_map().unwrap();
    d.finish().unwrap();
}

// {1: 42, 2: -3, 3: "hi", 4: 1.5, 5: 1(100), 6: 4([-2, 27315]), 7: [-2, 27315]}
const TYPED: [u8; 34] = hex!(
    "a7 01 18 2a 02 22 03 62 68 69 04 f9 3e 00 05 c1 1a 00 00 00 64"
    "06 c4 82 21 19 6a b3 07 82 21 19 6a b3"
);

#[test]
fn typed_getters_by_label() {
    let mut d = Decoder::new(&TYPED, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();

    assert_eq!(d.get_i64(Select::int(1)).unwrap(), 42);
    assert_eq!(d.get_u64(Select::int(1)).unwrap(), 42);
    assert_eq!(d.get_i64(Select::int(2)).unwrap(), -3);
    assert_eq!(
        d.get_u64(Select::int(2)).unwrap_err().code,
        ErrorCode::NumberSignConversion
    );
    let text = d.get_text(Select::int(3)).unwrap();
    assert_eq!(d.text(&text).unwrap(), "hi");
    assert_eq!(
        d.get_bytes(Select::int(3)).unwrap_err().code,
        ErrorCode::UnexpectedType
    );
    assert!((d.get_f64(Select::int(4)).unwrap() - 1.5).abs() < f64::EPSILON);

    let date = d
        .get_epoch_date(Select::int(5), TagRequirement::Tag)
        .unwrap();
    assert_eq!(date.seconds, 100);

    let expected = ExpMantissa {
        exponent: -2,
        mantissa: Mantissa::Int(27_315),
    };
    assert_eq!(
        d.get_decimal_fraction(Select::int(6), TagRequirement::Tag)
            .unwrap(),
        expected
    );
    assert_eq!(
        d.get_decimal_fraction(Select::int(7), TagRequirement::NotATag)
            .unwrap(),
        expected
    );
    assert_eq!(
        d.get_decimal_fraction(Select::int(7), TagRequirement::Tag)
            .unwrap_err()
            .code,
        ErrorCode::UnexpectedType
    );
    assert_eq!(
        d.get_epoch_date(Select::int(1), TagRequirement::Tag)
            .unwrap_err()
            .code,
        ErrorCode::UnexpectedType
    );
    assert_eq!(
        d.get_epoch_date(Select::int(1), TagRequirement::Optional)
            .unwrap()
            .seconds,
        42
    );

    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn typed_getters_in_order() {
    let mut d = Decoder::new(&TYPED, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    assert_eq!(d.get_i64(Select::Next).unwrap(), 42);
    assert_eq!(d.get_i64(Select::Next).unwrap(), -3);
    d.get_text(Select::Next).unwrap();
    d.get_f64(Select::Next).unwrap();
    d.get_epoch_date(Select::Next, TagRequirement::Tag).unwrap();
    d.get_decimal_fraction(Select::Next, TagRequirement::Tag)
        .unwrap();
    d.get_decimal_fraction(Select::Next, TagRequirement::NotATag)
        .unwrap();
    assert_eq!(d.next_item().unwrap_err().code, ErrorCode::NoMoreItems);
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn integer_conversions() {
    let bytes = hex!(
        "84 1b ff ff ff ff ff ff ff ff 3b ff ff ff ff ff ff ff ff f5 f8 20"
    );
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_array().unwrap();
    let mut peeked = d.peek_item().unwrap();
    assert_eq!(peeked.value, Value::UInt(u64::MAX));
    assert_eq!(
        d.get_i64(Select::Next).unwrap_err().code,
        ErrorCode::ConversionOverflow
    );
    peeked = d.peek_item().unwrap();
    assert_eq!(peeked.value, Value::NegativeBig(u64::MAX));
    assert_eq!(
        d.get_u64(Select::Next).unwrap_err().code,
        ErrorCode::NumberSignConversion
    );
    assert_eq!(d.get_simple(Select::Next).unwrap(), 21);
    assert_eq!(d.get_simple(Select::Next).unwrap(), 32);
    d.exit_array().unwrap();
    d.finish().unwrap();
}

#[test]
fn text_labels_match_bytewise() {
    let bytes = hex!("a2 62 69 64 01 41 61 02");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    assert_eq!(d.get_i64(Select::text("id")).unwrap(), 1);
    assert_eq!(
        d.get_i64(Select::Label(MapLabel::Bytes(b"a"))).unwrap(),
        2
    );
    assert_eq!(
        d.get_i64(Select::text("a")).unwrap_err().code,
        ErrorCode::LabelNotFound
    );
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn search_skips_sibling_with_bad_tag_content() {
    // {1: 4([1]), 2: 5}
    let bytes = hex!("a2 01 c4 81 01 02 05");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();

    let item = d.get_item_in_map(MapLabel::Int(2), Expect::Any).unwrap();
    assert_eq!(item.value, Value::Int(5));
    assert_eq!(
        d.get_item_in_map(MapLabel::Int(1), Expect::Any)
            .unwrap_err()
            .code,
        ErrorCode::BadExpAndMantissa
    );

    assert_eq!(
        d.next_consume().unwrap_err().code,
        ErrorCode::BadExpAndMantissa
    );
    let item = d.next_consume().unwrap();
    assert_eq!(item.label, Label::Int(2));
    assert_eq!(item.value, Value::Int(5));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn failed_entry_by_label_keeps_position() {
    // {1: 5, 2: {}}
    let bytes = hex!("a2 01 05 02 a0");
    let mut d = Decoder::new(&bytes, DecodeMode::NORMAL).unwrap();
    d.enter_map().unwrap();
    let start = d.tell();

    let err = d.enter_map_by_label(MapLabel::Int(1)).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedType);
    assert_eq!(d.tell(), start);

    // A container of the wrong kind is not left entered.
    let err = d.enter_array_by_label(MapLabel::Int(2)).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedType);
    assert_eq!(d.tell(), start);

    let err = d
        .enter_bstr_wrapped_by_label(MapLabel::Int(1), TagRequirement::Optional)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedType);
    assert_eq!(d.tell(), start);

    let item = d.next_item().unwrap();
    assert_eq!((item.label, item.value), (Label::Int(1), Value::Int(5)));
    let item = d.next_item().unwrap();
    assert_eq!(item.label, Label::Int(2));
    assert_eq!(item.item_type(), ItemType::Map);
    assert_eq!((item.nest_level, item.next_nest_level), (1, 0));
    d.exit_map().unwrap();
    d.finish().unwrap();
}
