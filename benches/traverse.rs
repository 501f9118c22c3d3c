#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use spiffy_cbor::{DecodeMode, Decoder, Expect, MapLabel, SearchEntry, Select};

fn sample_small() -> Vec<u8> {
    vec![0xa1, 0x61, 0x61, 0x01] // {"a":1}
}

/// `{0: [0, "v"], 1: [1, "v"], ... 63: [63, "v"]}`
fn sample_medium() -> Vec<u8> {
    let mut out = vec![0xb8, 0x40];
    for i in 0..64_u8 {
        if i < 24 {
            out.push(i);
        } else {
            out.extend_from_slice(&[0x18, i]);
        }
        out.push(0x82);
        if i < 24 {
            out.push(i);
        } else {
            out.extend_from_slice(&[0x18, i]);
        }
        out.extend_from_slice(&[0x61, b'v']);
    }
    out
}

fn traverse_all(bytes: &[u8]) -> usize {
    let mut d = Decoder::new(bytes, DecodeMode::NORMAL).unwrap();
    let mut count = 0;
    while d.next_item().is_ok() {
        count += 1;
    }
    count
}

fn bench_traverse(c: &mut Criterion) {
    let small = sample_small();
    c.bench_function("traverse_small", |b| {
        b.iter(|| black_box(traverse_all(black_box(&small))))
    });

    let medium = sample_medium();
    c.bench_function("traverse_medium", |b| {
        b.iter(|| black_box(traverse_all(black_box(&medium))))
    });

    c.bench_function("get_i64_by_label_medium", |b| {
        b.iter(|| {
            let mut d = Decoder::new(black_box(&medium), DecodeMode::NORMAL).unwrap();
            d.enter_map().unwrap();
            d.enter_array_by_label(MapLabel::Int(63)).unwrap();
            let v = d.get_i64(Select::Next).unwrap();
            black_box(v);
        })
    });

    c.bench_function("get_items_in_map_medium", |b| {
        b.iter(|| {
            let mut d = Decoder::new(black_box(&medium), DecodeMode::NORMAL).unwrap();
            d.enter_map().unwrap();
            let mut entries = [
                SearchEntry::int(1, Expect::Any),
                SearchEntry::int(31, Expect::Any),
                SearchEntry::int(62, Expect::Any),
            ];
            d.get_items_in_map(&mut entries).unwrap();
            black_box(entries);
        })
    });
}

criterion_group!(benches, bench_traverse);
criterion_main!(benches);
