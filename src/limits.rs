use crate::{CborError, ErrorCode};

/// Maximum depth of the nesting stack, not counting the top level.
pub const MAX_NESTING: usize = 15;

/// Maximum number of tag numbers recorded for one item.
pub const MAX_TAGS_PER_ITEM: usize = 4;

/// Capacity of the per-decoder table holding tag numbers too large to store inline.
pub const NUM_MAPPED_TAGS: usize = 4;

/// Maximum item count of a definite-length array (and of a map decoded as an array).
pub const MAX_ITEMS_IN_ARRAY: usize = 65_534;

/// Maximum pair count of a definite-length map.
pub const MAX_ITEMS_IN_MAP: usize = 32_767;

/// Maximum accepted input size.
pub const MAX_DECODE_INPUT_SIZE: usize = u32::MAX as usize - 1;

/// Decode-time resource limits.
///
/// Limits are enforced deterministically. They may only tighten the compile-time maxima above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum total input length in bytes.
    pub max_input_bytes: usize,
    /// Maximum nesting depth (at most [`MAX_NESTING`]).
    pub max_depth: usize,
    /// Maximum definite array length.
    pub max_array_len: usize,
    /// Maximum definite map length (pairs).
    pub max_map_len: usize,
    /// Maximum byte- or text-string length.
    pub max_string_len: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_DECODE_INPUT_SIZE,
            max_depth: MAX_NESTING,
            max_array_len: MAX_ITEMS_IN_ARRAY,
            max_map_len: MAX_ITEMS_IN_MAP,
            max_string_len: MAX_DECODE_INPUT_SIZE,
        }
    }
}

impl DecodeLimits {
    /// Construct limits derived from a maximum message size.
    ///
    /// Container lengths are capped by the compile-time maxima; the string length cap and the
    /// input cap are both `max_message_bytes`.
    #[must_use]
    pub fn for_bytes(max_message_bytes: usize) -> Self {
        let max_message_bytes = max_message_bytes.min(MAX_DECODE_INPUT_SIZE);
        Self {
            max_input_bytes: max_message_bytes,
            max_depth: MAX_NESTING,
            max_array_len: max_message_bytes.min(MAX_ITEMS_IN_ARRAY),
            max_map_len: max_message_bytes.min(MAX_ITEMS_IN_MAP),
            max_string_len: max_message_bytes,
        }
    }

    /// Check the limits against the compile-time maxima.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLimits` if any limit exceeds its compile-time maximum.
    pub const fn validate(&self) -> Result<(), CborError> {
        if self.max_depth > MAX_NESTING
            || self.max_array_len > MAX_ITEMS_IN_ARRAY
            || self.max_map_len > MAX_ITEMS_IN_MAP
            || self.max_input_bytes > MAX_DECODE_INPUT_SIZE
        {
            return Err(CborError::new(ErrorCode::InvalidLimits, 0));
        }
        Ok(())
    }
}
