use core::fmt;

/// The high-level class of an error.
///
/// The class decides how an error propagates:
/// - **`NotWellFormed`**: malformed bytes. Always unrecoverable.
/// - **`InvalidContent`**: well-formed but semantically invalid (bad tag content, bad label type).
///   Recoverable except for container labels and container tag content.
/// - **`Conformance`**: well-formed and valid, but rejected by a conformance mode
///   (preferred serialization, CDE, dCBOR).
/// - **`ImplementationLimit`**: a fixed or configured limit was exceeded. Unrecoverable.
/// - **`Configuration`**: the decoder was not set up for the input (e.g. no string allocator).
/// - **`ResourceExhausted`**: the string allocator could not satisfy a request. Unrecoverable.
/// - **`Usage`**: an API contract was not met (label not found, exit mismatch, unconsumed input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed CBOR.
    NotWellFormed,
    /// Well-formed but invalid content.
    InvalidContent,
    /// Rejected by a conformance mode.
    Conformance,
    /// Implementation or configured limit exceeded.
    ImplementationLimit,
    /// Decoder configuration does not permit the input.
    Configuration,
    /// String allocator exhausted.
    ResourceExhausted,
    /// API contract violation by the caller.
    Usage,
}

/// A structured error code identifying the reason decoding stopped.
///
/// This enum is intentionally stable and string-free to support `no_std`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Input ended in the middle of an item.
    HitEnd,
    /// Reserved additional-info value (28..30) was used.
    Unsupported,
    /// Indefinite length (additional info 31) on an integer or tag number.
    BadInt,
    /// Simple value encoded in two bytes with a value below 32.
    BadType7,
    /// A `break` appeared outside an indefinite-length container.
    BadBreak,
    /// An indefinite-length string chunk was not a definite string of the same kind.
    IndefiniteStringChunk,
    /// Bytes remain after the top-level items were consumed.
    ExtraBytes,
    /// No more items at the current (bounded) level or in the input.
    NoMoreItems,

    /// Map label type not allowed by the decode mode.
    MapLabelType,
    /// Arrays and maps cannot be map labels.
    ContainerLabel,
    /// Tag content has the wrong type for the tag number.
    BadTagContent,
    /// Tag content is a container where a scalar was required.
    UnrecoverableTagContent,
    /// Decimal fraction or bigfloat content is not a `[exponent, mantissa]` array.
    BadExpAndMantissa,
    /// Epoch date is out of range or not a finite number.
    DateOverflow,
    /// Text string is not valid UTF-8.
    InvalidUtf8,

    /// Non-shortest encoding of a number, length or big number.
    PreferredConformance,
    /// Indefinite-length encoding rejected by the decode mode.
    IndefiniteLengthForbidden,
    /// Map labels are not in bytewise lexicographic order.
    UnsortedMap,
    /// A map label occurs twice.
    DuplicateLabel,
    /// Float is not reduced as dCBOR requires.
    DcborConformance,
    /// Simple value other than `false`, `true` or `null`.
    DisallowedSimple,

    /// Nesting depth limit exceeded.
    NestingTooDeep,
    /// Array or map has more items than allowed.
    ArrayTooLong,
    /// String is longer than allowed.
    StringTooLong,
    /// The tag-number mapping table is full.
    TooManyTags,
    /// An item carries more tag numbers than can be recorded.
    TooManyTagsPerItem,
    /// Input buffer is larger than the configured maximum.
    InputTooLarge,
    /// Invalid configured limits.
    InvalidLimits,
    /// More search labels than one map search can track.
    TooManySearchLabels,

    /// Indefinite-length string found but no string allocator is configured.
    NoStringAllocator,
    /// Bstr-wrapped CBOR can only be entered when borrowed from the input.
    CannotEnterAllocatedString,

    /// The string allocator failed.
    StringAllocateFailed,

    /// Item has a different type than requested.
    UnexpectedType,
    /// Requested label is not in the bounded map.
    LabelNotFound,
    /// Operation requires an entered map (or array).
    MapNotEntered,
    /// Exit does not match the kind of the bounded level.
    ExitMismatch,
    /// Finish was called with containers still open.
    ArrayOrMapUnconsumed,
    /// Item carries tag numbers that were neither resolved nor consumed.
    UnprocessedTagNumber,
    /// Integer cannot be represented in the requested type.
    ConversionOverflow,
    /// Negative integer requested as an unsigned integer.
    NumberSignConversion,
    /// A map-search callback rejected an item.
    CallbackFailed,
}

impl ErrorCode {
    /// Returns the propagation class of this code.
    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self {
            Self::HitEnd
            | Self::Unsupported
            | Self::BadInt
            | Self::BadType7
            | Self::BadBreak
            | Self::IndefiniteStringChunk
            | Self::ExtraBytes => ErrorClass::NotWellFormed,

            Self::MapLabelType
            | Self::ContainerLabel
            | Self::BadTagContent
            | Self::UnrecoverableTagContent
            | Self::BadExpAndMantissa
            | Self::DateOverflow
            | Self::InvalidUtf8 => ErrorClass::InvalidContent,

            Self::PreferredConformance
            | Self::IndefiniteLengthForbidden
            | Self::UnsortedMap
            | Self::DuplicateLabel
            | Self::DcborConformance
            | Self::DisallowedSimple => ErrorClass::Conformance,

            Self::NestingTooDeep
            | Self::ArrayTooLong
            | Self::StringTooLong
            | Self::TooManyTags
            | Self::TooManyTagsPerItem
            | Self::InputTooLarge
            | Self::InvalidLimits
            | Self::TooManySearchLabels => ErrorClass::ImplementationLimit,

            Self::NoStringAllocator | Self::CannotEnterAllocatedString => {
                ErrorClass::Configuration
            }

            Self::StringAllocateFailed => ErrorClass::ResourceExhausted,

            Self::NoMoreItems
            | Self::UnexpectedType
            | Self::LabelNotFound
            | Self::MapNotEntered
            | Self::ExitMismatch
            | Self::ArrayOrMapUnconsumed
            | Self::UnprocessedTagNumber
            | Self::ConversionOverflow
            | Self::NumberSignConversion
            | Self::CallbackFailed => ErrorClass::Usage,
        }
    }

    /// Returns true if traversal cannot continue after this error.
    ///
    /// Unrecoverable errors leave the nesting state untrustworthy: the map search
    /// propagates them even when they occur on items it was not asked about.
    #[must_use]
    pub const fn is_unrecoverable(self) -> bool {
        match self.class() {
            ErrorClass::NotWellFormed
            | ErrorClass::ImplementationLimit
            | ErrorClass::ResourceExhausted => true,
            ErrorClass::InvalidContent => {
                matches!(self, Self::ContainerLabel | Self::UnrecoverableTagContent)
            }
            ErrorClass::Conformance => matches!(self, Self::IndefiniteLengthForbidden),
            ErrorClass::Configuration => matches!(self, Self::NoStringAllocator),
            ErrorClass::Usage => matches!(self, Self::NoMoreItems),
        }
    }

    /// Returns true if this code reports malformed CBOR.
    #[must_use]
    pub const fn is_not_well_formed(self) -> bool {
        matches!(self.class(), ErrorClass::NotWellFormed)
    }
}

/// A decode error with a stable code and the input offset where it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CborError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset into the input where the error was detected.
    pub offset: usize,
}

impl CborError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }

    /// Returns the propagation class of this error.
    #[inline]
    #[must_use]
    pub const fn class(self) -> ErrorClass {
        self.code.class()
    }

    /// Returns true if traversal cannot continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_unrecoverable(self) -> bool {
        self.code.is_unrecoverable()
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.code {
            ErrorCode::HitEnd => "unexpected end of input",
            ErrorCode::Unsupported => "reserved additional info value",
            ErrorCode::BadInt => "indefinite length on integer or tag number",
            ErrorCode::BadType7 => "non-preferred two-byte simple value",
            ErrorCode::BadBreak => "break outside indefinite-length container",
            ErrorCode::IndefiniteStringChunk => "invalid indefinite-length string chunk",
            ErrorCode::ExtraBytes => "extra bytes after decoded items",
            ErrorCode::NoMoreItems => "no more items",

            ErrorCode::MapLabelType => "map label type not allowed",
            ErrorCode::ContainerLabel => "array or map used as map label",
            ErrorCode::BadTagContent => "tag content has wrong type",
            ErrorCode::UnrecoverableTagContent => "tag content is a container",
            ErrorCode::BadExpAndMantissa => "malformed exponent and mantissa",
            ErrorCode::DateOverflow => "epoch date out of range",
            ErrorCode::InvalidUtf8 => "text must be valid UTF-8",

            ErrorCode::PreferredConformance => "non-preferred serialization",
            ErrorCode::IndefiniteLengthForbidden => "indefinite length forbidden",
            ErrorCode::UnsortedMap => "map labels not sorted",
            ErrorCode::DuplicateLabel => "duplicate map label",
            ErrorCode::DcborConformance => "float not reduced per dCBOR",
            ErrorCode::DisallowedSimple => "simple value not allowed",

            ErrorCode::NestingTooDeep => "nesting depth limit exceeded",
            ErrorCode::ArrayTooLong => "array or map too long",
            ErrorCode::StringTooLong => "string too long",
            ErrorCode::TooManyTags => "tag number table full",
            ErrorCode::TooManyTagsPerItem => "too many tag numbers on one item",
            ErrorCode::InputTooLarge => "input too large",
            ErrorCode::InvalidLimits => "invalid decode limits",
            ErrorCode::TooManySearchLabels => "too many labels in one map search",

            ErrorCode::NoStringAllocator => "indefinite-length string needs a string allocator",
            ErrorCode::CannotEnterAllocatedString => "cannot enter an allocated byte string",

            ErrorCode::StringAllocateFailed => "string allocation failed",

            ErrorCode::UnexpectedType => "unexpected item type",
            ErrorCode::LabelNotFound => "label not found",
            ErrorCode::MapNotEntered => "no map or array entered",
            ErrorCode::ExitMismatch => "exit does not match entered level",
            ErrorCode::ArrayOrMapUnconsumed => "array or map not fully consumed",
            ErrorCode::UnprocessedTagNumber => "unprocessed tag number",
            ErrorCode::ConversionOverflow => "integer conversion overflow",
            ErrorCode::NumberSignConversion => "negative number for unsigned type",
            ErrorCode::CallbackFailed => "map search callback failed",
        };

        write!(f, "cbor decode failed at {}: {msg}", self.offset)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CborError {}
