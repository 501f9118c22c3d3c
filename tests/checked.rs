#![allow(clippy::unwrap_used, clippy::expect_used)]

use hex_literal::hex;
use spiffy_cbor::{
    CborError, CheckedDecoder, DecodeMode, DecodedItem, Decoder, ErrorCode, Expect, ItemType,
    MapLabel, SearchEntry, Select, TagRequirement, Value,
};

fn checked(bytes: &[u8]) -> CheckedDecoder<'_> {
    CheckedDecoder::new(Decoder::new(bytes, DecodeMode::NORMAL).unwrap())
}

#[test]
fn first_error_sticks() {
    let bytes = hex!("82 01");
    let mut c = checked(&bytes);

    assert_eq!(c.next_item().item_type(), ItemType::Array);
    assert_eq!(c.next_item().value, Value::Int(1));
    assert_eq!(c.tell(), Some(2));

    assert_eq!(c.next_item(), DecodedItem::none());
    assert_eq!(c.error().unwrap().code, ErrorCode::HitEnd);
    assert_eq!(c.tell(), None);

    // Later calls are no-ops and keep the first error.
    assert_eq!(c.get_i64(Select::Next), None);
    c.exit_map();
    assert_eq!(c.error().unwrap().code, ErrorCode::HitEnd);
    assert_eq!(c.decoder().tell(), 2);

    assert_eq!(c.take_error().unwrap().code, ErrorCode::HitEnd);
    assert_eq!(c.error(), None);
    assert_eq!(
        c.finish().unwrap_err().code,
        ErrorCode::ArrayOrMapUnconsumed
    );
}

#[test]
fn finish_reports_the_stored_error() {
    let bytes = hex!("a1 01 02");
    let mut c = checked(&bytes);
    c.enter_map();
    assert_eq!(c.get_text(Select::int(1)), None);
    c.exit_map();
    assert_eq!(
        c.partial_finish().unwrap_err().code,
        ErrorCode::UnexpectedType
    );
    assert_eq!(c.finish().unwrap_err().code, ErrorCode::UnexpectedType);
}

#[test]
fn decoding_a_record() {
    // {1: 7, "t": "hi", 3: [true, null]}
    let bytes = hex!("a3 01 07 61 74 62 68 69 03 82 f5 f6");
    let mut c = checked(&bytes);

    c.enter_map();
    let id = c.get_u64(Select::int(1));
    let text = c.get_text(Select::text("t"));
    c.enter_array_by_label(MapLabel::Int(3));
    let flag = c.get_bool(Select::Next);
    c.get_null(Select::Next);
    c.exit_array();
    c.exit_map();

    assert_eq!(c.error(), None);
    assert_eq!(id, Some(7));
    assert_eq!(c.decoder().text(&text.unwrap()).unwrap(), "hi");
    assert_eq!(flag, Some(true));
    c.finish().unwrap();
}

#[test]
fn rewind_clears_the_error() {
    let bytes = hex!("a1 01 02");
    let mut c = checked(&bytes);
    c.enter_map();
    assert_eq!(c.get_i64(Select::int(9)), None);
    assert_eq!(c.error().unwrap().code, ErrorCode::LabelNotFound);

    c.rewind();
    assert_eq!(c.error(), None);
    assert_eq!(c.get_i64(Select::int(1)), Some(2));
    c.exit_map();
    c.finish().unwrap();
}

#[test]
fn set_error_keeps_the_first() {
    let bytes = hex!("01");
    let mut c = checked(&bytes);
    c.set_error(CborError::new(ErrorCode::CallbackFailed, 0));
    c.set_error(CborError::new(ErrorCode::UnexpectedType, 0));
    assert_eq!(c.next_item(), DecodedItem::none());
    assert_eq!(c.error().unwrap().code, ErrorCode::CallbackFailed);
}

#[test]
fn batch_search_after_error_leaves_entries_untouched() {
    let bytes = hex!("a1 01 02");
    let mut c = checked(&bytes);
    c.enter_array();
    assert_eq!(c.error().unwrap().code, ErrorCode::UnexpectedType);

    let mut entries = [SearchEntry::int(1, Expect::Any)];
    c.get_items_in_map(&mut entries);
    assert!(entries[0].item.is_none());
    assert_eq!(c.get_item_in_map(MapLabel::Int(1), Expect::Any), DecodedItem::none());
}

#[test]
fn wrapped_cbor_through_checked() {
    let bytes = hex!("d8 18 42 18 2a");
    let mut c = checked(&bytes);
    assert_eq!(
        c.enter_bstr_wrapped(TagRequirement::Tag),
        Some(&[0x18, 0x2a][..])
    );
    assert_eq!(c.get_i64(Select::Next), Some(42));
    c.exit_bstr_wrapped();
    assert_eq!(c.error(), None);
    c.into_inner().finish().unwrap();
}
