//! Typed getters over the traversal and the map search.
//!
//! Each getter reads either the next item or the item under a label of the entered map, and
//! converts it to a Rust value. Tag getters also accept untagged content, depending on the
//! [`TagRequirement`].

use crate::decoder::Decoder;
use crate::item::{DecodedItem, EpochDate, ExpMantissa, ItemType, Span, Value};
use crate::search::{Expect, MapLabel};
use crate::tag_content::builtin_decoder;
use crate::tags::tag;
use crate::{CborError, ErrorCode};

/// Which item a getter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select<'q> {
    /// The next item in traversal order.
    Next,
    /// The item with this label in the entered map. The cursor does not move.
    Label(MapLabel<'q>),
}

impl<'q> Select<'q> {
    /// Select by integer label.
    #[must_use]
    pub const fn int(label: i64) -> Self {
        Self::Label(MapLabel::Int(label))
    }

    /// Select by text label.
    #[must_use]
    pub const fn text(label: &'q str) -> Self {
        Self::Label(MapLabel::Text(label))
    }
}

/// Whether a tag getter requires the tag number to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRequirement {
    /// The content must carry the tag number.
    Tag,
    /// The content must not carry the tag number.
    NotATag,
    /// Either form is accepted.
    Optional,
}

/// A big number: the value is `magnitude`, or `-1 - magnitude` when `negative`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bignum<'a> {
    /// Big-endian magnitude.
    pub magnitude: Span<'a>,
    /// Tag 3 rather than tag 2.
    pub negative: bool,
}

/// A MIME message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeMessage<'a> {
    /// Message bytes.
    pub content: Span<'a>,
    /// True for byte-string content (tag 257, or tag 36 over a byte string).
    pub binary: bool,
}

struct Want {
    number: u64,
    accept: fn(ItemType) -> bool,
}

impl<'a> Decoder<'a> {
    fn select(&mut self, select: Select<'_>) -> Result<DecodedItem<'a>, CborError> {
        match select {
            Select::Next => self.next_item(),
            Select::Label(label) => self.get_item_in_map(label, Expect::Any),
        }
    }

    fn unexpected(&self) -> CborError {
        CborError::new(ErrorCode::UnexpectedType, self.cursor.tell())
    }

    /// Read a tagged item, converting untagged content with the built-in decoder if allowed.
    fn select_tagged(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
        want: &Want,
    ) -> Result<DecodedItem<'a>, CborError> {
        match select {
            // Exponent and mantissa follow the array header, so convert at the entry itself.
            Select::Label(label)
                if matches!(want.number, tag::DECIMAL_FRACTION | tag::BIGFLOAT) =>
            {
                let snapshot = self.snapshot();
                let result = self.seek_to_label(label).and_then(|()| {
                    let item = self.next_item()?;
                    self.convert_tagged(item, requirement, want)
                });
                self.restore(snapshot);
                result
            }
            _ => {
                let item = self.select(select)?;
                self.convert_tagged(item, requirement, want)
            }
        }
    }

    fn convert_tagged(
        &mut self,
        mut item: DecodedItem<'a>,
        requirement: TagRequirement,
        want: &Want,
    ) -> Result<DecodedItem<'a>, CborError> {
        if (want.accept)(item.item_type()) {
            return match requirement {
                TagRequirement::NotATag => Err(self.unexpected()),
                TagRequirement::Tag | TagRequirement::Optional => Ok(item),
            };
        }
        if requirement == TagRequirement::Tag || !item.tags.is_empty() {
            return Err(self.unexpected());
        }
        let decoder = builtin_decoder(want.number).ok_or_else(|| self.unexpected())?;
        decoder.decode(self, want.number, &mut item)?;
        if (want.accept)(item.item_type()) {
            Ok(item)
        } else {
            Err(self.unexpected())
        }
    }

    fn tagged_span(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
        number: u64,
    ) -> Result<Span<'a>, CborError> {
        let accept: fn(ItemType) -> bool = match number {
            tag::DATE_STRING => |t| t == ItemType::DateString,
            tag::DAYS_STRING => |t| t == ItemType::DaysString,
            tag::URI => |t| t == ItemType::Uri,
            tag::B64 => |t| t == ItemType::Base64,
            tag::B64URL => |t| t == ItemType::Base64Url,
            tag::REGEX => |t| t == ItemType::Regex,
            tag::UUID => |t| t == ItemType::Uuid,
            _ => |_| false,
        };
        let item = self.select_tagged(select, requirement, &Want { number, accept })?;
        item.value.span().ok_or_else(|| self.unexpected())
    }

    /// Read a signed integer.
    ///
    /// # Errors
    ///
    /// Returns `ConversionOverflow` for integers outside `i64`, `UnexpectedType` for other
    /// types, and the errors of the selected read.
    pub fn get_i64(&mut self, select: Select<'_>) -> Result<i64, CborError> {
        let item = self.select(select)?;
        match item.value {
            Value::Int(v) => Ok(v),
            Value::UInt(_) | Value::NegativeBig(_) => Err(CborError::new(
                ErrorCode::ConversionOverflow,
                self.cursor.tell(),
            )),
            _ => Err(self.unexpected()),
        }
    }

    /// Read an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns `NumberSignConversion` for negative integers, `UnexpectedType` for other types,
    /// and the errors of the selected read.
    pub fn get_u64(&mut self, select: Select<'_>) -> Result<u64, CborError> {
        let item = self.select(select)?;
        match item.value {
            Value::UInt(v) => Ok(v),
            Value::Int(v) => u64::try_from(v).map_err(|_| {
                CborError::new(ErrorCode::NumberSignConversion, self.cursor.tell())
            }),
            Value::NegativeBig(_) => Err(CborError::new(
                ErrorCode::NumberSignConversion,
                self.cursor.tell(),
            )),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a float of any width as `f64`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for non-float items.
    pub fn get_f64(&mut self, select: Select<'_>) -> Result<f64, CborError> {
        let item = self.select(select)?;
        match item.value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            _ => Err(self.unexpected()),
        }
    }

    /// Read `true` or `false`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for other items.
    pub fn get_bool(&mut self, select: Select<'_>) -> Result<bool, CborError> {
        match self.select(select)?.value {
            Value::Bool(v) => Ok(v),
            _ => Err(self.unexpected()),
        }
    }

    /// Read `null`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for other items.
    pub fn get_null(&mut self, select: Select<'_>) -> Result<(), CborError> {
        match self.select(select)?.value {
            Value::Null => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    /// Read `undefined`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for other items.
    pub fn get_undefined(&mut self, select: Select<'_>) -> Result<(), CborError> {
        match self.select(select)?.value {
            Value::Undefined => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    /// Read any simple value, including `false` (20), `true` (21), `null` (22) and
    /// `undefined` (23).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for other items.
    pub fn get_simple(&mut self, select: Select<'_>) -> Result<u8, CborError> {
        match self.select(select)?.value {
            Value::Bool(false) => Ok(20),
            Value::Bool(true) => Ok(21),
            Value::Null => Ok(22),
            Value::Undefined => Ok(23),
            Value::Simple(v) => Ok(v),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a byte string.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for other items.
    pub fn get_bytes(&mut self, select: Select<'_>) -> Result<Span<'a>, CborError> {
        match self.select(select)?.value {
            Value::Bytes(s) => Ok(s),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a text string. Resolve it with [`Decoder::text`] to validate UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` for other items.
    pub fn get_text(&mut self, select: Select<'_>) -> Result<Span<'a>, CborError> {
        match self.select(select)?.value {
            Value::Text(s) => Ok(s),
            _ => Err(self.unexpected()),
        }
    }

    /// Read an RFC 3339 date string (tag 0).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_date_string(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::DATE_STRING)
    }

    /// Read an RFC 8943 full-date string (tag 1004).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_days_string(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::DAYS_STRING)
    }

    /// Read an epoch date (tag 1).
    ///
    /// # Errors
    ///
    /// Returns `DateOverflow` for out-of-range or non-finite content and `UnexpectedType` if
    /// the item does not satisfy `requirement`.
    pub fn get_epoch_date(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<EpochDate, CborError> {
        let want = Want {
            number: tag::DATE_EPOCH,
            accept: |t| t == ItemType::DateEpoch,
        };
        match self.select_tagged(select, requirement, &want)?.value {
            Value::DateEpoch(date) => Ok(date),
            _ => Err(self.unexpected()),
        }
    }

    /// Read days since the epoch (tag 100).
    ///
    /// # Errors
    ///
    /// Returns `DateOverflow` for days outside `i64` and `UnexpectedType` if the item does not
    /// satisfy `requirement`.
    pub fn get_epoch_days(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<i64, CborError> {
        let want = Want {
            number: tag::DAYS_EPOCH,
            accept: |t| t == ItemType::DaysEpoch,
        };
        match self.select_tagged(select, requirement, &want)?.value {
            Value::DaysEpoch(days) => Ok(days),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a URI (tag 32).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_uri(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::URI)
    }

    /// Read base64 text (tag 34). The text is not decoded.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_base64(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::B64)
    }

    /// Read base64url text (tag 33). The text is not decoded.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_base64url(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::B64URL)
    }

    /// Read a regular expression (tag 35).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_regex(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::REGEX)
    }

    /// Read a binary UUID (tag 37).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_uuid(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Span<'a>, CborError> {
        self.tagged_span(select, requirement, tag::UUID)
    }

    /// Read a MIME message (tag 36 or 257).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_mime(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<MimeMessage<'a>, CborError> {
        let want = Want {
            number: tag::MIME,
            accept: |t| matches!(t, ItemType::Mime | ItemType::BinaryMime),
        };
        match self.select_tagged(select, requirement, &want)?.value {
            Value::Mime(content) => Ok(MimeMessage {
                content,
                binary: false,
            }),
            Value::BinaryMime(content) => Ok(MimeMessage {
                content,
                binary: true,
            }),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a big number (tag 2 or 3). Untagged content is a positive big number.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`, and
    /// `PreferredConformance` for non-preferred big numbers when that mode is set.
    pub fn get_bignum(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<Bignum<'a>, CborError> {
        let want = Want {
            number: tag::POS_BIGNUM,
            accept: |t| matches!(t, ItemType::PosBignum | ItemType::NegBignum),
        };
        match self.select_tagged(select, requirement, &want)?.value {
            Value::PosBignum(magnitude) => Ok(Bignum {
                magnitude,
                negative: false,
            }),
            Value::NegBignum(magnitude) => Ok(Bignum {
                magnitude,
                negative: true,
            }),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a decimal fraction (tag 4): `mantissa * 10^exponent`.
    ///
    /// # Errors
    ///
    /// Returns `BadExpAndMantissa` for a malformed `[exponent, mantissa]` array and
    /// `UnexpectedType` if the item does not satisfy `requirement`.
    pub fn get_decimal_fraction(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<ExpMantissa<'a>, CborError> {
        let want = Want {
            number: tag::DECIMAL_FRACTION,
            accept: |t| t == ItemType::DecimalFraction,
        };
        match self.select_tagged(select, requirement, &want)?.value {
            Value::DecimalFraction(value) => Ok(value),
            _ => Err(self.unexpected()),
        }
    }

    /// Read a bigfloat (tag 5): `mantissa * 2^exponent`.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::get_decimal_fraction`].
    pub fn get_bigfloat(
        &mut self,
        select: Select<'_>,
        requirement: TagRequirement,
    ) -> Result<ExpMantissa<'a>, CborError> {
        let want = Want {
            number: tag::BIGFLOAT,
            accept: |t| t == ItemType::BigFloat,
        };
        match self.select_tagged(select, requirement, &want)?.value {
            Value::BigFloat(value) => Ok(value),
            _ => Err(self.unexpected()),
        }
    }
}
