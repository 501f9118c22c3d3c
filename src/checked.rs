//! Sticky-error decoding.
//!
//! [`CheckedDecoder`] remembers the first error and turns every later call into a no-op, so a
//! sequence of reads needs one error check at the end.

use crate::item::{DecodedItem, EpochDate, ExpMantissa, Span};
use crate::search::{Expect, MapLabel, SearchEntry};
use crate::spiffy::{Bignum, MimeMessage, Select, TagRequirement};
use crate::{CborError, Decoder};

/// A [`Decoder`] with a sticky error register.
///
/// Once a call fails, the error is stored and every following call returns
/// [`DecodedItem::none()`], `None`, or nothing, without touching the input. The register is
/// cleared by [`CheckedDecoder::take_error`] and [`CheckedDecoder::rewind`].
#[derive(Debug)]
pub struct CheckedDecoder<'a> {
    inner: Decoder<'a>,
    error: Option<CborError>,
}

macro_rules! checked_getters {
    ($($(#[$meta:meta])* $name:ident($($arg:ident: $ty:ty),*) -> $out:ty;)*) => {$(
        $(#[$meta])*
        pub fn $name(&mut self, $($arg: $ty),*) -> Option<$out> {
            self.guard(None, |d| d.$name($($arg),*).map(Some))
        }
    )*};
}

impl<'a> CheckedDecoder<'a> {
    /// Wrap a decoder.
    #[must_use]
    pub const fn new(inner: Decoder<'a>) -> Self {
        Self { inner, error: None }
    }

    /// The stored error.
    #[must_use]
    pub const fn error(&self) -> Option<CborError> {
        self.error
    }

    /// Return and clear the stored error.
    pub fn take_error(&mut self) -> Option<CborError> {
        self.error.take()
    }

    /// Store `err` unless an error is already stored. Later calls do nothing.
    pub fn set_error(&mut self, err: CborError) {
        self.error.get_or_insert(err);
    }

    /// The unchecked decoder, for calls whose errors should not be sticky.
    pub fn decoder(&mut self) -> &mut Decoder<'a> {
        &mut self.inner
    }

    /// Unwrap into the unchecked decoder, dropping the stored error.
    #[must_use]
    pub fn into_inner(self) -> Decoder<'a> {
        self.inner
    }

    fn guard<T>(
        &mut self,
        default: T,
        op: impl FnOnce(&mut Decoder<'a>) -> Result<T, CborError>,
    ) -> T {
        if self.error.is_some() {
            return default;
        }
        match op(&mut self.inner) {
            Ok(value) => value,
            Err(err) => {
                self.error = Some(err);
                default
            }
        }
    }

    /// Offset of the next unread byte, or `None` once an error is stored.
    #[must_use]
    pub const fn tell(&self) -> Option<usize> {
        match self.error {
            Some(_) => None,
            None => Some(self.inner.tell()),
        }
    }

    /// See [`Decoder::next_item`].
    pub fn next_item(&mut self) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), Decoder::next_item)
    }

    /// See [`Decoder::peek_item`].
    pub fn peek_item(&mut self) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), Decoder::peek_item)
    }

    /// See [`Decoder::next_consume`].
    pub fn next_consume(&mut self) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), Decoder::next_consume)
    }

    /// See [`Decoder::next_tag_number`].
    pub fn next_tag_number(&mut self) -> Option<u64> {
        self.guard(None, Decoder::next_tag_number)
    }

    /// See [`Decoder::enter_map`].
    pub fn enter_map(&mut self) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), Decoder::enter_map)
    }

    /// See [`Decoder::enter_array`].
    pub fn enter_array(&mut self) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), Decoder::enter_array)
    }

    /// See [`Decoder::enter_map_by_label`].
    pub fn enter_map_by_label(&mut self, label: MapLabel<'_>) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), |d| d.enter_map_by_label(label))
    }

    /// See [`Decoder::enter_array_by_label`].
    pub fn enter_array_by_label(&mut self, label: MapLabel<'_>) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), |d| d.enter_array_by_label(label))
    }

    /// See [`Decoder::exit_map`].
    pub fn exit_map(&mut self) {
        self.guard((), Decoder::exit_map);
    }

    /// See [`Decoder::exit_array`].
    pub fn exit_array(&mut self) {
        self.guard((), Decoder::exit_array);
    }

    /// See [`Decoder::exit_bstr_wrapped`].
    pub fn exit_bstr_wrapped(&mut self) {
        self.guard((), Decoder::exit_bstr_wrapped);
    }

    /// See [`Decoder::get_item_in_map`].
    pub fn get_item_in_map(&mut self, label: MapLabel<'_>, expected: Expect) -> DecodedItem<'a> {
        self.guard(DecodedItem::none(), |d| d.get_item_in_map(label, expected))
    }

    /// See [`Decoder::get_items_in_map`]. Entries are not touched once an error is stored.
    pub fn get_items_in_map(&mut self, entries: &mut [SearchEntry<'_, 'a>]) {
        self.guard((), |d| d.get_items_in_map(entries));
    }

    /// See [`Decoder::get_items_in_map_with_callback`].
    pub fn get_items_in_map_with_callback(
        &mut self,
        entries: &mut [SearchEntry<'_, 'a>],
        callback: &mut dyn FnMut(&DecodedItem<'a>) -> Result<(), CborError>,
    ) {
        self.guard((), |d| d.get_items_in_map_with_callback(entries, callback));
    }

    /// Restart at the first member of the bounded level and clear the stored error.
    pub fn rewind(&mut self) {
        self.error = None;
        self.inner.rewind();
    }

    checked_getters! {
        /// See [`Decoder::enter_bstr_wrapped`].
        enter_bstr_wrapped(requirement: TagRequirement) -> &'a [u8];
        /// See [`Decoder::enter_bstr_wrapped_by_label`].
        enter_bstr_wrapped_by_label(label: MapLabel<'_>, requirement: TagRequirement) -> &'a [u8];
        /// See [`Decoder::get_i64`].
        get_i64(select: Select<'_>) -> i64;
        /// See [`Decoder::get_u64`].
        get_u64(select: Select<'_>) -> u64;
        /// See [`Decoder::get_f64`].
        get_f64(select: Select<'_>) -> f64;
        /// See [`Decoder::get_bool`].
        get_bool(select: Select<'_>) -> bool;
        /// See [`Decoder::get_null`].
        get_null(select: Select<'_>) -> ();
        /// See [`Decoder::get_undefined`].
        get_undefined(select: Select<'_>) -> ();
        /// See [`Decoder::get_simple`].
        get_simple(select: Select<'_>) -> u8;
        /// See [`Decoder::get_bytes`].
        get_bytes(select: Select<'_>) -> Span<'a>;
        /// See [`Decoder::get_text`].
        get_text(select: Select<'_>) -> Span<'a>;
        /// See [`Decoder::get_date_string`].
        get_date_string(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_days_string`].
        get_days_string(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_epoch_date`].
        get_epoch_date(select: Select<'_>, requirement: TagRequirement) -> EpochDate;
        /// See [`Decoder::get_epoch_days`].
        get_epoch_days(select: Select<'_>, requirement: TagRequirement) -> i64;
        /// See [`Decoder::get_uri`].
        get_uri(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_base64`].
        get_base64(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_base64url`].
        get_base64url(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_regex`].
        get_regex(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_uuid`].
        get_uuid(select: Select<'_>, requirement: TagRequirement) -> Span<'a>;
        /// See [`Decoder::get_mime`].
        get_mime(select: Select<'_>, requirement: TagRequirement) -> MimeMessage<'a>;
        /// See [`Decoder::get_bignum`].
        get_bignum(select: Select<'_>, requirement: TagRequirement) -> Bignum<'a>;
        /// See [`Decoder::get_decimal_fraction`].
        get_decimal_fraction(select: Select<'_>, requirement: TagRequirement) -> ExpMantissa<'a>;
        /// See [`Decoder::get_bigfloat`].
        get_bigfloat(select: Select<'_>, requirement: TagRequirement) -> ExpMantissa<'a>;
    }

    /// Bytes consumed so far; the stored error takes precedence over completeness checks.
    ///
    /// # Errors
    ///
    /// Returns the stored error, or the errors of [`Decoder::partial_finish`].
    pub fn partial_finish(&self) -> Result<usize, CborError> {
        match self.error {
            Some(err) => Err(err),
            None => self.inner.partial_finish(),
        }
    }

    /// End decoding. The allocator destructor runs even when an error is stored.
    ///
    /// # Errors
    ///
    /// Returns the stored error, or the errors of [`Decoder::finish`].
    pub fn finish(self) -> Result<(), CborError> {
        let result = self.inner.finish();
        match self.error {
            Some(err) => Err(err),
            None => result,
        }
    }
}
