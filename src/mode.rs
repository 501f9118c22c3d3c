use core::ops::{BitOr, BitOrAssign};

/// Composable decode-mode flags.
///
/// Flags combine with `|`. The profiles [`DecodeMode::PREFERRED`], [`DecodeMode::CDE`] and
/// [`DecodeMode::DCBOR`] bundle the conformance checks of the corresponding serialization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DecodeMode(u32);

impl DecodeMode {
    /// Accept any well-formed CBOR; map labels may be integers, byte strings or text strings.
    pub const NORMAL: Self = Self(0);
    /// Only text-string map labels are accepted.
    pub const MAP_STRINGS_ONLY: Self = Self(1 << 0);
    /// Maps are returned as arrays of alternating labels and values.
    pub const MAP_AS_ARRAY: Self = Self(1 << 1);
    /// Tag numbers that are neither resolved nor consumed are not an error.
    pub const ALLOW_UNPROCESSED_TAG_NUMBERS: Self = Self(1 << 2);
    /// Reject indefinite-length strings, arrays and maps.
    pub const NO_INDEFINITE_LENGTH: Self = Self(1 << 3);
    /// Reject integers, lengths, tag numbers and floats not in shortest form.
    pub const ONLY_PREFERRED_NUMBERS: Self = Self(1 << 4);
    /// Reject big numbers that have a leading zero or fit in a major type 0/1 integer.
    pub const ONLY_PREFERRED_BIG_NUMBERS: Self = Self(1 << 5);
    /// Reject maps whose encoded labels are not strictly increasing bytewise.
    pub const ONLY_SORTED_MAPS: Self = Self(1 << 6);
    /// Reject floats with integral values and non-canonical NaNs.
    pub const ONLY_REDUCED_FLOATS: Self = Self(1 << 7);
    /// Reject `undefined` and unassigned simple values.
    pub const DISALLOW_DCBOR_SIMPLES: Self = Self(1 << 8);
    /// Accept any non-container map label type (floats, booleans, large negatives, ...).
    pub const ANY_LABEL_TYPES: Self = Self(1 << 9);

    /// Preferred serialization (RFC 8949 section 4.1).
    pub const PREFERRED: Self = Self(
        Self::NO_INDEFINITE_LENGTH.0 | Self::ONLY_PREFERRED_NUMBERS.0 | Self::ONLY_PREFERRED_BIG_NUMBERS.0,
    );
    /// Common Deterministic Encoding: preferred serialization plus sorted maps.
    pub const CDE: Self = Self(Self::PREFERRED.0 | Self::ONLY_SORTED_MAPS.0);
    /// Deterministic CBOR (dCBOR): CDE plus reduced floats and restricted simple values.
    pub const DCBOR: Self =
        Self(Self::CDE.0 | Self::ONLY_REDUCED_FLOATS.0 | Self::DISALLOW_DCBOR_SIMPLES.0);

    /// Returns true if every flag of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of both flag sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns the raw flag bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for DecodeMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for DecodeMode {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}
