//! UTF-8 checking for text spans, run lazily by [`Decoder::text`](crate::Decoder::text).
//!
//! Traversal never validates text; a span is checked only when a caller asks for `&str`.

/// `bytes` as `&str`, or `None` if they are not UTF-8.
#[cfg(feature = "simdutf8")]
#[inline]
pub fn as_text(bytes: &[u8]) -> Option<&str> {
    simdutf8::basic::from_utf8(bytes).ok()
}

/// `bytes` as `&str`, or `None` if they are not UTF-8.
#[cfg(not(feature = "simdutf8"))]
#[inline]
pub fn as_text(bytes: &[u8]) -> Option<&str> {
    core::str::from_utf8(bytes).ok()
}
