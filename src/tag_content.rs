//! Tag-content decoders.
//!
//! After an item is assembled, its tag numbers are resolved innermost first. Each number is looked
//! up in the decoder's table (first match wins); a match rewrites the item in place and removes
//! the number. The first number without a match stops resolution and the remaining ones stay on
//! the item.

use core::fmt;

use crate::decoder::Fetched;
use crate::item::{DecodedItem, EpochDate, ExpMantissa, Mantissa, Span, Value};
use crate::mode::DecodeMode;
use crate::tags::tag;
use crate::{CborError, Decoder, ErrorCode};

/// Converts tag content into a typed value.
///
/// Implemented for every `Fn(&mut Decoder<'a>, u64, &mut DecodedItem<'a>)` with a matching
/// signature, so plain functions and closures can be installed directly.
pub trait TagContentDecoder {
    /// Rewrite `item`, whose innermost remaining tag number is `tag`.
    ///
    /// The decoder is positioned after the item and may be used to read further items (as the
    /// exponent/mantissa decoder does).
    ///
    /// # Errors
    ///
    /// Recoverable errors leave the tag number on the item; members already read past are
    /// skipped to the end of the item. Unrecoverable errors stop traversal.
    fn decode<'a>(
        &self,
        decoder: &mut Decoder<'a>,
        tag: u64,
        item: &mut DecodedItem<'a>,
    ) -> Result<(), CborError>;
}

impl<F> TagContentDecoder for F
where
    F: for<'a> Fn(&mut Decoder<'a>, u64, &mut DecodedItem<'a>) -> Result<(), CborError>,
{
    fn decode<'a>(
        &self,
        decoder: &mut Decoder<'a>,
        tag: u64,
        item: &mut DecodedItem<'a>,
    ) -> Result<(), CborError> {
        self(decoder, tag, item)
    }
}

/// Which tag numbers an entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    /// Exactly this tag number.
    Number(u64),
    /// Every tag number.
    Any,
}

/// One entry of a tag-content decoder table.
#[derive(Clone, Copy)]
pub struct TagDecoderEntry<'t> {
    /// Tag numbers handled by this entry.
    pub tag: TagMatch,
    /// The content decoder.
    pub decoder: &'t dyn TagContentDecoder,
}

impl<'t> TagDecoderEntry<'t> {
    /// Construct an entry.
    #[must_use]
    pub const fn new(tag: TagMatch, decoder: &'t dyn TagContentDecoder) -> Self {
        Self { tag, decoder }
    }

    fn matches(&self, number: u64) -> bool {
        match self.tag {
            TagMatch::Number(n) => n == number,
            TagMatch::Any => true,
        }
    }
}

impl fmt::Debug for TagDecoderEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDecoderEntry")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// The built-in table, installed by default.
///
/// Tags 21, 22 and 23 are encoding hints only and are not resolved.
pub const STANDARD_TAG_DECODERS: &[TagDecoderEntry<'static>] = &[
    TagDecoderEntry::new(TagMatch::Number(tag::DATE_STRING), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::DATE_EPOCH), &decode_epoch_date),
    TagDecoderEntry::new(TagMatch::Number(tag::POS_BIGNUM), &decode_bignum),
    TagDecoderEntry::new(TagMatch::Number(tag::NEG_BIGNUM), &decode_bignum),
    TagDecoderEntry::new(TagMatch::Number(tag::DECIMAL_FRACTION), &decode_exp_mantissa),
    TagDecoderEntry::new(TagMatch::Number(tag::BIGFLOAT), &decode_exp_mantissa),
    TagDecoderEntry::new(TagMatch::Number(tag::WRAPPED_CBOR), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::URI), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::B64URL), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::B64), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::REGEX), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::MIME), &decode_mime),
    TagDecoderEntry::new(TagMatch::Number(tag::UUID), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::WRAPPED_CBOR_SEQUENCE), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::DAYS_EPOCH), &decode_days_epoch),
    TagDecoderEntry::new(TagMatch::Number(tag::BINARY_MIME), &decode_mime),
    TagDecoderEntry::new(TagMatch::Number(tag::DAYS_STRING), &decode_string_tag),
    TagDecoderEntry::new(TagMatch::Number(tag::SELF_DESCRIBED), &decode_self_described),
];

/// Returns the built-in decoder for `number`, used to convert untagged content on request.
pub(crate) fn builtin_decoder(number: u64) -> Option<&'static dyn TagContentDecoder> {
    STANDARD_TAG_DECODERS
        .iter()
        .find(|entry| entry.matches(number))
        .map(|entry| entry.decoder)
}

impl<'a> Decoder<'a> {
    /// Resolve the tag numbers of a fetched item, innermost first.
    pub(crate) fn resolve_tag_content(&mut self, fetched: &mut Fetched<'a>) -> Result<(), CborError> {
        if let Some(tc) = self.tag_cursor.take() {
            if tc.offset == fetched.start {
                fetched.item.tags.drop_outer(tc.consumed);
            }
        }
        if fetched.soft.is_some() {
            return Ok(());
        }

        let table = self.tag_decoders;
        while let Some((slot, id)) = fetched.item.tags.innermost() {
            let Some(number) = self.tag_map.unmap(id) else {
                break;
            };
            let Some(entry) = table.iter().find(|entry| entry.matches(number)) else {
                break;
            };
            let before = self.cursor.tell();
            match entry.decoder.decode(self, number, &mut fetched.item) {
                Ok(()) => fetched.item.tags.clear_slot(slot),
                Err(err) if err.is_unrecoverable() => return Err(err),
                Err(err) => {
                    if self.cursor.tell() != before {
                        self.skip_partial_content(&mut fetched.item)?;
                    }
                    fetched.soft = Some(err);
                    return Ok(());
                }
            }
        }

        if !fetched.item.tags.is_empty() && !self.mode_has(DecodeMode::ALLOW_UNPROCESSED_TAG_NUMBERS)
        {
            fetched.soft = Some(CborError::new(ErrorCode::UnprocessedTagNumber, fetched.start));
        }
        Ok(())
    }

    /// A content decoder failed after reading some of the item's members. Skip the rest so the
    /// item stays one unit, and report the level actually reached.
    fn skip_partial_content(&mut self, item: &mut DecodedItem<'a>) -> Result<(), CborError> {
        while self.next_level() > item.nest_level {
            self.next_structural()?;
        }
        item.next_nest_level = self.next_level();
        Ok(())
    }
}

fn content_error(decoder: &Decoder<'_>, value: &Value<'_>) -> CborError {
    let code = if value.container_count().is_some() {
        ErrorCode::UnrecoverableTagContent
    } else {
        ErrorCode::BadTagContent
    };
    CborError::new(code, decoder.tell())
}

/// Text and byte string tags whose content passes through unchanged.
fn decode_string_tag<'a>(
    decoder: &mut Decoder<'a>,
    number: u64,
    item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    let (want_text, make): (bool, fn(Span<'a>) -> Value<'a>) = match number {
        tag::DATE_STRING => (true, Value::DateString),
        tag::DAYS_STRING => (true, Value::DaysString),
        tag::URI => (true, Value::Uri),
        tag::B64URL => (true, Value::Base64Url),
        tag::B64 => (true, Value::Base64),
        tag::REGEX => (true, Value::Regex),
        tag::UUID => (false, Value::Uuid),
        tag::WRAPPED_CBOR => (false, Value::WrappedCbor),
        tag::WRAPPED_CBOR_SEQUENCE => (false, Value::WrappedCborSequence),
        _ => return Err(CborError::new(ErrorCode::BadTagContent, decoder.tell())),
    };
    match item.value {
        Value::Text(s) if want_text => item.value = make(s),
        Value::Bytes(s) if !want_text => item.value = make(s),
        other => return Err(content_error(decoder, &other)),
    }
    Ok(())
}

fn decode_bignum<'a>(
    decoder: &mut Decoder<'a>,
    number: u64,
    item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    let Value::Bytes(span) = item.value else {
        return Err(content_error(decoder, &item.value));
    };
    if decoder.mode_has(DecodeMode::ONLY_PREFERRED_BIG_NUMBERS) {
        let magnitude = decoder.bytes(&span);
        if magnitude.len() <= 8 || magnitude[0] == 0 {
            return Err(CborError::new(ErrorCode::PreferredConformance, decoder.tell()));
        }
    }
    item.value = if number == tag::NEG_BIGNUM {
        Value::NegBignum(span)
    } else {
        Value::PosBignum(span)
    };
    Ok(())
}

fn decode_mime<'a>(
    decoder: &mut Decoder<'a>,
    number: u64,
    item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    item.value = match item.value {
        Value::Text(s) if number == tag::MIME => Value::Mime(s),
        Value::Bytes(s) => Value::BinaryMime(s),
        other => return Err(content_error(decoder, &other)),
    };
    Ok(())
}

/// Largest float accepted as epoch seconds; offset from `i64::MAX` so the conversion back to an
/// integer cannot round past the `i64` range.
#[allow(clippy::cast_precision_loss)]
const EPOCH_MAX: f64 = (i64::MAX - 0x7ff) as f64;
#[allow(clippy::cast_precision_loss)]
const EPOCH_MIN: f64 = (i64::MIN + 0x7ff) as f64;

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_date(d: f64, overflow: CborError) -> Result<EpochDate, CborError> {
    if !(EPOCH_MIN..=EPOCH_MAX).contains(&d) {
        return Err(overflow);
    }
    let seconds = d as i64;
    Ok(EpochDate {
        seconds,
        fraction: d - seconds as f64,
    })
}

fn decode_epoch_date<'a>(
    decoder: &mut Decoder<'a>,
    _number: u64,
    item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    let overflow = CborError::new(ErrorCode::DateOverflow, decoder.tell());
    let date = match item.value {
        Value::Int(seconds) => EpochDate {
            seconds,
            fraction: 0.0,
        },
        Value::Float(f) => float_date(f64::from(f), overflow)?,
        Value::Double(d) => float_date(d, overflow)?,
        Value::UInt(_) | Value::NegativeBig(_) => return Err(overflow),
        other => return Err(content_error(decoder, &other)),
    };
    item.value = Value::DateEpoch(date);
    Ok(())
}

fn decode_days_epoch<'a>(
    decoder: &mut Decoder<'a>,
    _number: u64,
    item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    item.value = match item.value {
        Value::Int(days) => Value::DaysEpoch(days),
        Value::UInt(_) | Value::NegativeBig(_) => {
            return Err(CborError::new(ErrorCode::DateOverflow, decoder.tell()))
        }
        other => return Err(content_error(decoder, &other)),
    };
    Ok(())
}

/// Decimal fraction (tag 4) and bigfloat (tag 5): `[exponent, mantissa]`.
///
/// Both members are read with the nesting counters, so the array must hold exactly two items
/// at the level below the array. A big-number mantissa is resolved by its own tag decoder first.
fn decode_exp_mantissa<'a>(
    decoder: &mut Decoder<'a>,
    number: u64,
    item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    let bad = CborError::new(ErrorCode::BadExpAndMantissa, decoder.tell());
    match item.value {
        Value::Array(_) => {}
        Value::Map(_) | Value::MapAsArray(_) => return Err(bad),
        other => return Err(content_error(decoder, &other)),
    }
    if !item.is_open_container() {
        return Err(bad);
    }
    let level = item.nest_level + 1;

    let exponent = decoder.next_structural()?;
    if exponent.soft.is_some()
        || exponent.item.nest_level != level
        || exponent.item.next_nest_level != level
        || !exponent.item.tags.is_empty()
    {
        return Err(bad);
    }
    let Value::Int(exponent) = exponent.item.value else {
        return Err(bad);
    };

    let mantissa = decoder.next_resolved()?;
    if let Some(err) = mantissa.soft {
        return Err(err);
    }
    if mantissa.item.nest_level != level || mantissa.item.next_nest_level >= level {
        return Err(bad);
    }
    let mantissa_value = match mantissa.item.value {
        Value::Int(m) => Mantissa::Int(m),
        Value::PosBignum(s) => Mantissa::PosBignum(s),
        Value::NegBignum(s) => Mantissa::NegBignum(s),
        _ => return Err(bad),
    };

    let value = ExpMantissa {
        exponent,
        mantissa: mantissa_value,
    };
    item.value = if number == tag::BIGFLOAT {
        Value::BigFloat(value)
    } else {
        Value::DecimalFraction(value)
    };
    item.next_nest_level = mantissa.item.next_nest_level;
    Ok(())
}

fn decode_self_described<'a>(
    _decoder: &mut Decoder<'a>,
    _number: u64,
    _item: &mut DecodedItem<'a>,
) -> Result<(), CborError> {
    Ok(())
}
