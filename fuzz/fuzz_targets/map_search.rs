#![no_main]

use libfuzzer_sys::fuzz_target;

use spiffy_cbor::{
    CheckedDecoder, DecodeMode, Decoder, Expect, MapLabel, SearchEntry, Select, TagRequirement,
};

fuzz_target!(|data: &[u8]| {
    let Ok(d) = Decoder::new(data, DecodeMode::NORMAL) else {
        return;
    };
    let mut c = CheckedDecoder::new(d);

    c.enter_map();
    let mut entries = [
        SearchEntry::int(0, Expect::Any),
        SearchEntry::int(1, Expect::Any),
        SearchEntry::text("a", Expect::Any),
    ];
    c.get_items_in_map(&mut entries);
    let _ = c.get_i64(Select::int(0));
    let _ = c.get_text(Select::text("a"));
    let _ = c.get_decimal_fraction(Select::int(4), TagRequirement::Optional);

    c.enter_map_by_label(MapLabel::Int(1));
    let _ = c.get_u64(Select::Next);
    c.exit_map();

    if c.take_error().is_some() {
        c.rewind();
    }
    c.enter_array_by_label(MapLabel::Int(2));
    let _ = c.get_bool(Select::Next);
    c.exit_array();
    if c.enter_bstr_wrapped_by_label(MapLabel::Int(3), TagRequirement::Optional).is_some() {
        let _ = c.next_item();
        c.exit_bstr_wrapped();
    }
    c.exit_map();
    let _ = c.finish();
});
