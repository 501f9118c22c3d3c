#![no_main]

use libfuzzer_sys::fuzz_target;

use spiffy_cbor::{DecodeLimits, DecodeMode, Decoder, VecAllocator};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, input)) = data.split_first() else {
        return;
    };
    let mode = match flags & 0x3 {
        0 => DecodeMode::NORMAL,
        1 => DecodeMode::PREFERRED,
        2 => DecodeMode::CDE,
        _ => DecodeMode::DCBOR | DecodeMode::ANY_LABEL_TYPES,
    };
    let Ok(mut d) = Decoder::with_limits(input, mode, DecodeLimits::for_bytes(input.len())) else {
        return;
    };
    let mut alloc = VecAllocator::with_limit(1 << 16);
    d.set_allocator(&mut alloc, flags & 0x4 != 0);

    let mut last = 0;
    loop {
        match d.next_item() {
            Ok(item) => {
                if let Some(span) = item.value.span() {
                    let _ = d.text(&span);
                }
            }
            Err(err) if err.is_unrecoverable() => break,
            Err(_) => {}
        }
        // Every call either consumes input or fails unrecoverably.
        assert!(d.tell() > last || d.tell() == input.len());
        if d.tell() == input.len() && d.partial_finish().is_ok() {
            break;
        }
        last = d.tell();
    }
    let _ = d.finish();
});
