//! Tag numbers and the per-decoder mapping table.

use crate::item::TAG_ID_NONE;
use crate::limits::NUM_MAPPED_TAGS;
use crate::{CborError, ErrorCode};

/// Standard tag numbers with built-in content decoders.
pub mod tag {
    /// RFC 3339 date/time string.
    pub const DATE_STRING: u64 = 0;
    /// Epoch-based date/time.
    pub const DATE_EPOCH: u64 = 1;
    /// Positive big number.
    pub const POS_BIGNUM: u64 = 2;
    /// Negative big number.
    pub const NEG_BIGNUM: u64 = 3;
    /// Decimal fraction.
    pub const DECIMAL_FRACTION: u64 = 4;
    /// Bigfloat.
    pub const BIGFLOAT: u64 = 5;
    /// Expected conversion to base64url (not resolved).
    pub const ENC_AS_B64URL: u64 = 21;
    /// Expected conversion to base64 (not resolved).
    pub const ENC_AS_B64: u64 = 22;
    /// Expected conversion to base16 (not resolved).
    pub const ENC_AS_B16: u64 = 23;
    /// Embedded CBOR data item.
    pub const WRAPPED_CBOR: u64 = 24;
    /// URI.
    pub const URI: u64 = 32;
    /// base64url-encoded text.
    pub const B64URL: u64 = 33;
    /// base64-encoded text.
    pub const B64: u64 = 34;
    /// Regular expression.
    pub const REGEX: u64 = 35;
    /// MIME message.
    pub const MIME: u64 = 36;
    /// Binary UUID.
    pub const UUID: u64 = 37;
    /// Embedded CBOR sequence.
    pub const WRAPPED_CBOR_SEQUENCE: u64 = 63;
    /// Days since the epoch.
    pub const DAYS_EPOCH: u64 = 100;
    /// Binary MIME message.
    pub const BINARY_MIME: u64 = 257;
    /// RFC 8943 full-date string.
    pub const DAYS_STRING: u64 = 1004;
    /// Self-described CBOR marker.
    pub const SELF_DESCRIBED: u64 = 55799;
}

/// Largest tag number stored inline in a compact id.
#[allow(clippy::cast_possible_truncation)]
pub(crate) const LAST_UNMAPPED_TAG: u16 = TAG_ID_NONE - NUM_MAPPED_TAGS as u16 - 1;

/// Maps tag numbers above [`LAST_UNMAPPED_TAG`] to compact ids.
///
/// Slots are assigned in arrival order and reused on value equality, so ids are only meaningful
/// within one decoder.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TagMap {
    mapped: [u64; NUM_MAPPED_TAGS],
    len: usize,
}

impl TagMap {
    pub const fn new() -> Self {
        Self {
            mapped: [0; NUM_MAPPED_TAGS],
            len: 0,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn map(&mut self, tag: u64, offset: usize) -> Result<u16, CborError> {
        if tag <= u64::from(LAST_UNMAPPED_TAG) {
            return Ok(tag as u16);
        }
        let slot = match self.mapped[..self.len].iter().position(|&t| t == tag) {
            Some(slot) => slot,
            None => {
                if self.len == NUM_MAPPED_TAGS {
                    return Err(CborError::new(ErrorCode::TooManyTags, offset));
                }
                self.mapped[self.len] = tag;
                self.len += 1;
                self.len - 1
            }
        };
        Ok(LAST_UNMAPPED_TAG + 1 + slot as u16)
    }

    pub fn unmap(&self, id: u16) -> Option<u64> {
        if id == TAG_ID_NONE {
            return None;
        }
        if id <= LAST_UNMAPPED_TAG {
            return Some(u64::from(id));
        }
        let slot = usize::from(id - LAST_UNMAPPED_TAG - 1);
        self.mapped[..self.len].get(slot).copied()
    }
}
