//! # spiffy-cbor
//!
//! A bounded, pre-order CBOR (RFC 8949) decoder for constrained and hosted targets.
//!
//! ## Design principles
//!
//! - **Pull, don't build.**
//!   [`Decoder::next_item`] returns one [`DecodedItem`] at a time in pre-order. Containers are
//!   reported as headers; nesting levels tell the caller where they close. No tree is built.
//! - **Borrow by default.**
//!   Strings are [`Span`]s into the input. Only indefinite-length strings (or every string, on
//!   request) are copied, into a caller-provided [`StringAllocator`].
//! - **Bounded everything.**
//!   Nesting depth, tag numbers per item, mapped large tag numbers and container lengths all have
//!   fixed limits; see [`DecodeLimits`].
//! - **Errors are values.**
//!   Every [`Decoder`] call returns a `Result`. [`CheckedDecoder`] adds a sticky error register so
//!   a sequence of reads needs a single check at the end.
//!
//! ## Layers
//!
//! - Traversal: [`Decoder::next_item`], [`Decoder::peek_item`], [`Decoder::next_consume`].
//! - Tag numbers: resolved into typed values by a table of [`TagContentDecoder`]s
//!   ([`STANDARD_TAG_DECODERS`] by default), or read raw with [`Decoder::next_tag_number`].
//! - Spiffy decode: enter maps, arrays and byte-string-wrapped CBOR, look up items by label, and
//!   read typed values with getters such as [`Decoder::get_i64`].
//!
//! ```
//! use spiffy_cbor::{DecodeMode, Decoder, Select};
//!
//! // {1: 42, "name": "x"}
//! let input = [0xa2, 0x01, 0x18, 0x2a, 0x64, b'n', b'a', b'm', b'e', 0x61, b'x'];
//! let mut d = Decoder::new(&input, DecodeMode::NORMAL)?;
//! d.enter_map()?;
//! assert_eq!(d.get_i64(Select::int(1))?, 42);
//! let name = d.get_text(Select::text("name"))?;
//! assert_eq!(d.text(&name)?, "x");
//! d.exit_map()?;
//! d.finish()?;
//! # Ok::<(), spiffy_cbor::CborError>(())
//! ```
//!
//! ## Conformance modes
//!
//! [`DecodeMode`] flags reject non-preferred numbers, indefinite lengths, unsorted or duplicate
//! map labels, unreduced floats and dCBOR-disallowed simple values. The profiles
//! [`DecodeMode::PREFERRED`], [`DecodeMode::CDE`] and [`DecodeMode::DCBOR`] bundle them.
//!
//! ## Feature flags
//!
//! - `std` *(default)*: implements `std::error::Error` for [`CborError`].
//! - `alloc` *(default)*: enables [`VecAllocator`].
//! - `simdutf8`: enables SIMD-accelerated UTF-8 validation in [`Decoder::text`].
//! - `log`: routes trace and debug events to the `log` facade.
//! - `defmt`: routes trace and debug events to `defmt`.
//!
//! ## `no_std`
//!
//! The crate is `no_std` compatible and never allocates on its own. [`PoolAllocator`] serves
//! indefinite-length strings from a caller buffer.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod allocator;
mod atomic;
mod checked;
mod cursor;
mod decoder;
mod error;
mod item;
mod limits;
mod mode;
mod nesting;
mod search;
mod spiffy;
mod strings;
mod tag_content;
mod tags;
pub(crate) mod utf8;

pub use crate::allocator::{AllocHandle, PoolAllocator, StringAllocator};
pub use crate::checked::CheckedDecoder;
pub use crate::decoder::Decoder;
pub use crate::error::{CborError, ErrorClass, ErrorCode};
pub use crate::item::{
    Count, DecodedItem, EpochDate, ExpMantissa, ItemType, Label, Mantissa, Span, TagList, Value,
};
pub use crate::limits::{
    DecodeLimits, MAX_DECODE_INPUT_SIZE, MAX_ITEMS_IN_ARRAY, MAX_ITEMS_IN_MAP, MAX_NESTING,
    MAX_TAGS_PER_ITEM, NUM_MAPPED_TAGS,
};
pub use crate::mode::DecodeMode;
pub use crate::search::{Expect, MapLabel, SearchEntry, MAX_SEARCH_LABELS};
pub use crate::spiffy::{Bignum, MimeMessage, Select, TagRequirement};
pub use crate::tag_content::{TagContentDecoder, TagDecoderEntry, TagMatch, STANDARD_TAG_DECODERS};
pub use crate::tags::tag;

#[cfg(feature = "alloc")]
pub use crate::allocator::VecAllocator;
