use crate::allocator::AllocHandle;
use crate::limits::MAX_TAGS_PER_ITEM;

/// Bytes of a string value: borrowed from the input or owned by the string allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    /// Borrowed from the input buffer; valid as long as the input is.
    Borrowed(&'a [u8]),
    /// Produced by the string allocator; valid until it is freed or destructed.
    Allocated(AllocHandle),
}

impl<'a> Span<'a> {
    /// Length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Borrowed(b) => b.len(),
            Self::Allocated(h) => h.len(),
        }
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the borrowed bytes, or `None` for allocator-owned spans.
    #[must_use]
    pub const fn as_borrowed(&self) -> Option<&'a [u8]> {
        match self {
            Self::Borrowed(b) => Some(*b),
            Self::Allocated(_) => None,
        }
    }

    /// Returns true if the span is owned by the string allocator.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        matches!(self, Self::Allocated(_))
    }
}

/// Item count of an array or map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Definite length. Maps count pairs, maps-as-arrays count labels and values separately.
    Definite(u32),
    /// Indefinite length, terminated by a `break`.
    Indefinite,
}

/// Seconds since the POSIX epoch with an optional fractional part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochDate {
    /// Whole seconds.
    pub seconds: i64,
    /// Fraction of a second, with the sign of `seconds`; 0 for integer content.
    pub fraction: f64,
}

/// Mantissa of a decimal fraction or bigfloat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mantissa<'a> {
    /// Mantissa fits a signed 64-bit integer.
    Int(i64),
    /// Positive big-number mantissa (tag 2).
    PosBignum(Span<'a>),
    /// Negative big-number mantissa (tag 3), unmapped magnitude.
    NegBignum(Span<'a>),
}

/// Exponent and mantissa of a decimal fraction (base 10) or bigfloat (base 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpMantissa<'a> {
    /// Exponent.
    pub exponent: i64,
    /// Mantissa.
    pub mantissa: Mantissa<'a>,
}

/// The type of a decoded item, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ItemType {
    /// No item (returned after an error).
    None,
    /// Signed integer.
    Int64,
    /// Unsigned integer above `i64::MAX`.
    UInt64,
    /// Negative integer below `i64::MIN`.
    NegativeBig,
    /// Byte string.
    ByteString,
    /// Text string.
    TextString,
    /// Array.
    Array,
    /// Map.
    Map,
    /// Map decoded as an array.
    MapAsArray,
    /// Single-precision float.
    Float,
    /// Double-precision float (also half-precision, widened).
    Double,
    /// `true` or `false`.
    Bool,
    /// `null`.
    Null,
    /// `undefined`.
    Undefined,
    /// Unassigned simple value.
    Simple,
    /// Tag 0 date string.
    DateString,
    /// Tag 1004 day string.
    DaysString,
    /// Tag 1 epoch date.
    DateEpoch,
    /// Tag 100 epoch days.
    DaysEpoch,
    /// Tag 2 positive big number.
    PosBignum,
    /// Tag 3 negative big number.
    NegBignum,
    /// Tag 4 decimal fraction.
    DecimalFraction,
    /// Tag 5 bigfloat.
    BigFloat,
    /// Tag 32 URI.
    Uri,
    /// Tag 33 base64url text.
    Base64Url,
    /// Tag 34 base64 text.
    Base64,
    /// Tag 35 regular expression.
    Regex,
    /// Tag 36 MIME message as text.
    Mime,
    /// Tag 36 or 257 MIME message as bytes.
    BinaryMime,
    /// Tag 37 UUID.
    Uuid,
    /// Tag 24 embedded CBOR.
    WrappedCbor,
    /// Tag 63 embedded CBOR sequence.
    WrappedCborSequence,
}

/// Payload of a decoded item; one variant per item type.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Value<'a> {
    /// No item.
    None,
    /// Integer in `i64` range.
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    /// Negative integer below `i64::MIN`, carrying the encoded argument `n`.
    ///
    /// The value is `-1 - n`; the decoder does not perform the 65-bit arithmetic.
    NegativeBig(u64),
    /// Byte string.
    Bytes(Span<'a>),
    /// Text string (not validated; see [`crate::Decoder::text`]).
    Text(Span<'a>),
    /// Array header.
    Array(Count),
    /// Map header.
    Map(Count),
    /// Map header decoded as an array.
    MapAsArray(Count),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float; half-precision floats are widened to this.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// `null`.
    Null,
    /// `undefined`.
    Undefined,
    /// Unassigned simple value.
    Simple(u8),
    /// RFC 3339 date string.
    DateString(Span<'a>),
    /// RFC 8943 full-date string.
    DaysString(Span<'a>),
    /// Epoch date.
    DateEpoch(EpochDate),
    /// Days since the epoch.
    DaysEpoch(i64),
    /// Positive big number, big-endian magnitude.
    PosBignum(Span<'a>),
    /// Negative big number, big-endian magnitude `n` of `-1 - n`.
    NegBignum(Span<'a>),
    /// Decimal fraction.
    DecimalFraction(ExpMantissa<'a>),
    /// Bigfloat.
    BigFloat(ExpMantissa<'a>),
    /// URI.
    Uri(Span<'a>),
    /// base64url text.
    Base64Url(Span<'a>),
    /// base64 text.
    Base64(Span<'a>),
    /// Regular expression.
    Regex(Span<'a>),
    /// Text MIME message.
    Mime(Span<'a>),
    /// Binary MIME message.
    BinaryMime(Span<'a>),
    /// UUID bytes.
    Uuid(Span<'a>),
    /// Embedded CBOR.
    WrappedCbor(Span<'a>),
    /// Embedded CBOR sequence.
    WrappedCborSequence(Span<'a>),
}

impl<'a> Value<'a> {
    /// Returns the type of this value.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        match self {
            Self::None => ItemType::None,
            Self::Int(_) => ItemType::Int64,
            Self::UInt(_) => ItemType::UInt64,
            Self::NegativeBig(_) => ItemType::NegativeBig,
            Self::Bytes(_) => ItemType::ByteString,
            Self::Text(_) => ItemType::TextString,
            Self::Array(_) => ItemType::Array,
            Self::Map(_) => ItemType::Map,
            Self::MapAsArray(_) => ItemType::MapAsArray,
            Self::Float(_) => ItemType::Float,
            Self::Double(_) => ItemType::Double,
            Self::Bool(_) => ItemType::Bool,
            Self::Null => ItemType::Null,
            Self::Undefined => ItemType::Undefined,
            Self::Simple(_) => ItemType::Simple,
            Self::DateString(_) => ItemType::DateString,
            Self::DaysString(_) => ItemType::DaysString,
            Self::DateEpoch(_) => ItemType::DateEpoch,
            Self::DaysEpoch(_) => ItemType::DaysEpoch,
            Self::PosBignum(_) => ItemType::PosBignum,
            Self::NegBignum(_) => ItemType::NegBignum,
            Self::DecimalFraction(_) => ItemType::DecimalFraction,
            Self::BigFloat(_) => ItemType::BigFloat,
            Self::Uri(_) => ItemType::Uri,
            Self::Base64Url(_) => ItemType::Base64Url,
            Self::Base64(_) => ItemType::Base64,
            Self::Regex(_) => ItemType::Regex,
            Self::Mime(_) => ItemType::Mime,
            Self::BinaryMime(_) => ItemType::BinaryMime,
            Self::Uuid(_) => ItemType::Uuid,
            Self::WrappedCbor(_) => ItemType::WrappedCbor,
            Self::WrappedCborSequence(_) => ItemType::WrappedCborSequence,
        }
    }

    /// Returns the container count for arrays and maps.
    #[must_use]
    pub const fn container_count(&self) -> Option<Count> {
        match self {
            Self::Array(c) | Self::Map(c) | Self::MapAsArray(c) => Some(*c),
            _ => None,
        }
    }

    /// Returns the string span of any string-carrying value.
    #[must_use]
    pub const fn span(&self) -> Option<Span<'a>> {
        match self {
            Self::Bytes(s)
            | Self::Text(s)
            | Self::DateString(s)
            | Self::DaysString(s)
            | Self::PosBignum(s)
            | Self::NegBignum(s)
            | Self::Uri(s)
            | Self::Base64Url(s)
            | Self::Base64(s)
            | Self::Regex(s)
            | Self::Mime(s)
            | Self::BinaryMime(s)
            | Self::Uuid(s)
            | Self::WrappedCbor(s)
            | Self::WrappedCborSequence(s) => Some(*s),
            _ => None,
        }
    }
}

/// Label of a map entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Label<'a> {
    /// The item is not in a map.
    None,
    /// Integer label.
    Int(i64),
    /// Unsigned integer label above `i64::MAX`.
    UInt(u64),
    /// Byte-string label.
    Bytes(Span<'a>),
    /// Text-string label.
    Text(Span<'a>),
    /// Any other scalar label, accepted with [`crate::DecodeMode::ANY_LABEL_TYPES`].
    Other(Value<'a>),
}

impl Label<'_> {
    /// Returns true if the label is owned by the string allocator.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        match self {
            Self::Bytes(s) | Self::Text(s) => s.is_allocated(),
            _ => false,
        }
    }
}

pub(crate) const TAG_ID_NONE: u16 = u16::MAX;

/// Compact tag numbers still attached to an item, outermost first.
///
/// Entries are ids produced by the decoder's tag table; resolve them with
/// [`crate::Decoder::tag_number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagList {
    ids: [u16; MAX_TAGS_PER_ITEM],
}

impl Default for TagList {
    fn default() -> Self {
        Self::new()
    }
}

impl TagList {
    pub(crate) const fn new() -> Self {
        Self {
            ids: [TAG_ID_NONE; MAX_TAGS_PER_ITEM],
        }
    }

    /// Number of attached tag numbers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.iter().filter(|&&id| id != TAG_ID_NONE).count()
    }

    /// Returns true if no tag numbers are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push(&mut self, id: u16) -> bool {
        match self.ids.iter_mut().find(|slot| **slot == TAG_ID_NONE) {
            Some(slot) => {
                *slot = id;
                true
            }
            None => false,
        }
    }

    pub(crate) fn get(&self, n: usize) -> Option<u16> {
        self.ids.iter().copied().filter(|&id| id != TAG_ID_NONE).nth(n)
    }

    /// Innermost attached id and its slot.
    pub(crate) fn innermost(&self) -> Option<(usize, u16)> {
        self.ids
            .iter()
            .copied()
            .enumerate()
            .rev()
            .find(|&(_, id)| id != TAG_ID_NONE)
    }

    pub(crate) fn clear_slot(&mut self, slot: usize) {
        if let Some(id) = self.ids.get_mut(slot) {
            *id = TAG_ID_NONE;
        }
    }

    /// Drops the `n` outermost ids.
    pub(crate) fn drop_outer(&mut self, n: usize) {
        let mut dropped = 0;
        for id in &mut self.ids {
            if dropped == n {
                break;
            }
            if *id != TAG_ID_NONE {
                *id = TAG_ID_NONE;
                dropped += 1;
            }
        }
    }
}

/// One decoded item.
///
/// Returned by value from every traversal call. Borrowed spans live as long as the input; allocated
/// spans live until the string allocator frees them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedItem<'a> {
    /// Type-specific payload.
    pub value: Value<'a>,
    /// Map label, or [`Label::None`] outside maps.
    pub label: Label<'a>,
    /// Nesting level of this item (0 = top level).
    pub nest_level: u8,
    /// Nesting level of the next item. Smaller than `nest_level` when containers closed.
    pub next_nest_level: u8,
    /// Tag numbers not resolved by a content decoder, outermost first.
    pub tags: TagList,
}

impl<'a> DecodedItem<'a> {
    /// The "no type" item returned after an error.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: Value::None,
            label: Label::None,
            nest_level: 0,
            next_nest_level: 0,
            tags: TagList::new(),
        }
    }

    pub(crate) const fn with_value(value: Value<'a>) -> Self {
        Self {
            value,
            label: Label::None,
            nest_level: 0,
            next_nest_level: 0,
            tags: TagList::new(),
        }
    }

    /// Returns the item type.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        self.value.item_type()
    }

    /// Returns true if the value is owned by the string allocator.
    #[must_use]
    pub fn value_allocated(&self) -> bool {
        self.value.span().is_some_and(|s| s.is_allocated())
    }

    /// Returns true if the label is owned by the string allocator.
    #[must_use]
    pub const fn label_allocated(&self) -> bool {
        self.label.is_allocated()
    }

    /// Returns true for arrays and maps whose members follow this item.
    #[must_use]
    pub const fn is_open_container(&self) -> bool {
        self.value.container_count().is_some() && self.next_nest_level > self.nest_level
    }
}
